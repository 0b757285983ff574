//! DAG validation: structural checks, cycle detection, file-conflict
//! analysis, and the layered execution order the engine runs tasks in.
//!
//! Grounded on the layering approach in `other_examples/ciroque-the-dagwood`
//! (reverse-dependency map plus repeated Kahn passes), combined with the
//! three-colour DFS cycle detector that gives precise cycle membership
//! rather than just a yes/no.

use std::collections::{HashMap, HashSet};

use crate::plan::{Phase, Plan};

const MIN_DESCRIPTION_LEN: usize = 50;

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub circular_dependencies: Option<Vec<Vec<String>>>,
    pub conflicts: Option<Vec<FileConflict>>,
    pub missing_dependencies: Option<Vec<String>>,
    pub orphaned_tasks: Option<Vec<String>>,
    pub metrics: Option<ExecutionMetrics>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct FileConflict {
    pub file: String,
    pub tasks: Vec<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ExecutionMetrics {
    pub task_count: usize,
    pub execution_layers: usize,
    pub max_parallelization: usize,
    pub critical_path: Vec<String>,
    pub critical_path_weight: u32,
}

/// Run every structural check against `plan` and return a single report.
///
/// Unlike parsing, validation never stops at the first problem: every
/// category of error is collected so a plan author sees the whole picture
/// in one pass.
pub fn validate_plan(plan: &Plan) -> ValidationReport {
    let mut report = ValidationReport::default();

    if plan.tasks.is_empty() {
        report.errors.push("plan has no tasks".to_string());
        report.valid = false;
        return report;
    }

    let mut seen_ids: HashSet<&str> = HashSet::new();
    for task in &plan.tasks {
        if !seen_ids.insert(task.id.as_str()) {
            report.errors.push(format!("duplicate task id: {}", task.id));
        }
    }

    for task in &plan.tasks {
        if task.id.trim().is_empty() {
            report.errors.push("task has an empty id".to_string());
        } else if !is_kebab_case(&task.id) {
            report.errors.push(format!("task id '{}' is not kebab-case", task.id));
        }
        if task.name.trim().is_empty() {
            report.errors.push(format!("task '{}' has an empty name", task.id));
        }
        if task.description.len() < MIN_DESCRIPTION_LEN {
            report.errors.push(format!(
                "task '{}' description is {} chars, below the {}-char minimum",
                task.id,
                task.description.len(),
                MIN_DESCRIPTION_LEN
            ));
        }
        if task.files.is_empty() {
            report.errors.push(format!("task '{}' has no files", task.id));
        }
    }

    if let Some(phases) = &plan.phases {
        validate_phases(phases, &plan.tasks, &mut report);
    }

    let id_set: HashSet<&str> = plan.tasks.iter().map(|t| t.id.as_str()).collect();
    let mut missing = Vec::new();
    for task in &plan.tasks {
        for dep in &task.dependencies {
            if !id_set.contains(dep.as_str()) {
                missing.push(format!("{} -> {}", task.id, dep));
            }
        }
    }
    if !missing.is_empty() {
        report.errors.push(format!(
            "{} dependency reference(s) to unknown task ids",
            missing.len()
        ));
        report.missing_dependencies = Some(missing);
    }

    if let Some(cycles) = detect_cycles(plan) {
        report
            .errors
            .push(format!("{} circular dependency chain(s) detected", cycles.len()));
        report.circular_dependencies = Some(cycles);
    }

    let conflicts = detect_file_conflicts(plan);
    if !conflicts.is_empty() {
        report.errors.push(format!(
            "{} file(s) are touched by more than one task without a dependency edge between them",
            conflicts.len()
        ));
        report.conflicts = Some(conflicts);
    }

    let orphans = detect_orphans(plan);
    if !orphans.is_empty() {
        report.orphaned_tasks = Some(orphans);
    }

    // Layering and metrics are only meaningful once the graph is acyclic
    // and every dependency resolves; skip them otherwise rather than
    // reporting a nonsensical layer count.
    if report.errors.is_empty() {
        if let Ok(layers) = compute_execution_layers(plan) {
            report.metrics = Some(compute_metrics(plan, &layers));
        }
    }

    report.valid = report.errors.is_empty();
    report
}

/// `true` for a non-empty run of lowercase alphanumeric segments joined by
/// single hyphens (`a`, `task-a`, `phase-2`), `false` for anything else.
fn is_kebab_case(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    s.split('-').all(|segment| {
        !segment.is_empty() && segment.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    })
}

/// Structural and referential checks for `plan.phases`: id shape and
/// uniqueness, non-empty `tasks`, every referenced task id existing, every
/// `requires` entry naming a real phase, and the phase dependency graph
/// (via `requires`) being acyclic.
fn validate_phases(phases: &[Phase], tasks: &[crate::plan::Task], report: &mut ValidationReport) {
    let task_ids: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    let phase_ids: HashSet<&str> = phases.iter().map(|p| p.id.as_str()).collect();

    let mut seen_phase_ids: HashSet<&str> = HashSet::new();
    for phase in phases {
        if !seen_phase_ids.insert(phase.id.as_str()) {
            report.errors.push(format!("duplicate phase id: {}", phase.id));
        }
        if !is_kebab_case(&phase.id) {
            report.errors.push(format!("phase id '{}' is not kebab-case", phase.id));
        }
        if phase.tasks.is_empty() {
            report.errors.push(format!("phase '{}' has no tasks", phase.id));
        }
        for task_id in &phase.tasks {
            if !task_ids.contains(task_id.as_str()) {
                report
                    .errors
                    .push(format!("phase '{}' references unknown task id '{}'", phase.id, task_id));
            }
        }
        for required in &phase.requires {
            if !phase_ids.contains(required.as_str()) {
                report
                    .errors
                    .push(format!("phase '{}' requires unknown phase '{}'", phase.id, required));
            }
        }
    }

    if let Some(cycle) = detect_phase_cycle(phases) {
        report.errors.push(format!("phase dependency cycle detected: {}", cycle.join(" -> ")));
    }
}

/// Three-colour DFS over `requires` edges between phases. Returns the first
/// cycle found, or `None` if the phase graph is acyclic.
fn detect_phase_cycle(phases: &[Phase]) -> Option<Vec<String>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let requires: HashMap<&str, &HashSet<String>> =
        phases.iter().map(|p| (p.id.as_str(), &p.requires)).collect();
    let mut color: HashMap<&str, Color> =
        phases.iter().map(|p| (p.id.as_str(), Color::White)).collect();
    let mut stack: Vec<String> = Vec::new();

    fn visit<'a>(
        id: &'a str,
        requires: &HashMap<&'a str, &'a HashSet<String>>,
        color: &mut HashMap<&'a str, Color>,
        stack: &mut Vec<String>,
    ) -> Option<Vec<String>> {
        color.insert(id, Color::Gray);
        stack.push(id.to_string());

        if let Some(deps) = requires.get(id) {
            for dep in deps.iter() {
                match color.get(dep.as_str()) {
                    Some(Color::Gray) => {
                        let start = stack.iter().position(|s| s == dep).unwrap_or(0);
                        let mut cycle: Vec<String> = stack[start..].to_vec();
                        cycle.push(dep.clone());
                        return Some(cycle);
                    }
                    Some(Color::White) => {
                        if let Some(cycle) = visit(dep.as_str(), requires, color, stack) {
                            return Some(cycle);
                        }
                    }
                    _ => {}
                }
            }
        }

        stack.pop();
        color.insert(id, Color::Black);
        None
    }

    for phase in phases {
        if color.get(phase.id.as_str()) == Some(&Color::White) {
            if let Some(cycle) = visit(phase.id.as_str(), &requires, &mut color, &mut stack) {
                return Some(cycle);
            }
        }
    }

    None
}

/// Three-colour DFS cycle detection. Returns `None` if the dependency graph
/// is acyclic, otherwise one id-list per distinct cycle found.
fn detect_cycles(plan: &Plan) -> Option<Vec<Vec<String>>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let deps: HashMap<&str, &HashSet<String>> = plan
        .tasks
        .iter()
        .map(|t| (t.id.as_str(), &t.dependencies))
        .collect();

    let mut color: HashMap<&str, Color> =
        plan.tasks.iter().map(|t| (t.id.as_str(), Color::White)).collect();
    let mut stack: Vec<String> = Vec::new();
    let mut cycles: Vec<Vec<String>> = Vec::new();

    fn visit<'a>(
        id: &'a str,
        deps: &HashMap<&'a str, &'a HashSet<String>>,
        color: &mut HashMap<&'a str, Color>,
        stack: &mut Vec<String>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        color.insert(id, Color::Gray);
        stack.push(id.to_string());

        if let Some(dependencies) = deps.get(id) {
            for dep in dependencies.iter() {
                match color.get(dep.as_str()) {
                    Some(Color::Gray) => {
                        let start = stack.iter().position(|s| s == dep).unwrap_or(0);
                        let mut cycle: Vec<String> = stack[start..].to_vec();
                        cycle.push(dep.clone());
                        cycles.push(cycle);
                    }
                    Some(Color::White) => visit(dep.as_str(), deps, color, stack, cycles),
                    _ => {}
                }
            }
        }

        stack.pop();
        color.insert(id, Color::Black);
    }

    for task in &plan.tasks {
        if color.get(task.id.as_str()) == Some(&Color::White) {
            visit(task.id.as_str(), &deps, &mut color, &mut stack, &mut cycles);
        }
    }

    if cycles.is_empty() {
        None
    } else {
        Some(cycles)
    }
}

/// A file conflict exists when two tasks touch the same file and neither
/// is reachable from the other via the dependency graph (so the engine has
/// no ordering guarantee that would serialize their writes).
fn detect_file_conflicts(plan: &Plan) -> Vec<FileConflict> {
    let reachable = transitive_closure(plan);

    let mut by_file: HashMap<&str, Vec<&str>> = HashMap::new();
    for task in &plan.tasks {
        for file in &task.files {
            by_file.entry(file.as_str()).or_default().push(task.id.as_str());
        }
    }

    let mut conflicts = Vec::new();
    for (file, tasks) in by_file {
        if tasks.len() < 2 {
            continue;
        }
        let mut unresolved = Vec::new();
        for i in 0..tasks.len() {
            for j in 0..tasks.len() {
                if i == j {
                    continue;
                }
                let (a, b) = (tasks[i], tasks[j]);
                let ordered = reachable.get(a).map(|r| r.contains(b)).unwrap_or(false)
                    || reachable.get(b).map(|r| r.contains(a)).unwrap_or(false);
                if !ordered && !unresolved.contains(&a) {
                    unresolved.push(a);
                }
            }
        }
        if !unresolved.is_empty() {
            let mut tasks: Vec<String> = unresolved.into_iter().map(String::from).collect();
            tasks.sort();
            conflicts.push(FileConflict {
                file: file.to_string(),
                tasks,
            });
        }
    }
    conflicts.sort_by(|a, b| a.file.cmp(&b.file));
    conflicts
}

/// Maps each task id to the set of task ids reachable by following
/// dependency edges forward (i.e. the tasks that would run *before* it
/// transitively, since `dependencies` points at prerequisites).
fn transitive_closure<'a>(plan: &'a Plan) -> HashMap<&'a str, HashSet<&'a str>> {
    let direct: HashMap<&str, &HashSet<String>> = plan
        .tasks
        .iter()
        .map(|t| (t.id.as_str(), &t.dependencies))
        .collect();

    let mut closure: HashMap<&str, HashSet<&str>> = HashMap::new();

    fn resolve<'a>(
        id: &'a str,
        direct: &HashMap<&'a str, &'a HashSet<String>>,
        closure: &mut HashMap<&'a str, HashSet<&'a str>>,
        visiting: &mut HashSet<&'a str>,
    ) {
        if closure.contains_key(id) || visiting.contains(id) {
            return;
        }
        visiting.insert(id);
        let mut set = HashSet::new();
        if let Some(deps) = direct.get(id) {
            for dep in deps.iter() {
                set.insert(dep.as_str());
                resolve(dep.as_str(), direct, closure, visiting);
                if let Some(grand) = closure.get(dep.as_str()) {
                    set.extend(grand.iter().copied());
                }
            }
        }
        visiting.remove(id);
        closure.insert(id, set);
    }

    let mut visiting = HashSet::new();
    for task in &plan.tasks {
        resolve(task.id.as_str(), &direct, &mut closure, &mut visiting);
    }
    closure
}

/// A task is orphaned when it has no dependencies, nothing depends on it,
/// and it is not the plan's sole task — i.e. it's disconnected from the
/// rest of the graph rather than a legitimate independent root.
fn detect_orphans(plan: &Plan) -> Vec<String> {
    if plan.tasks.len() <= 1 {
        return Vec::new();
    }
    let depended_on: HashSet<&str> = plan
        .tasks
        .iter()
        .flat_map(|t| t.dependencies.iter().map(|d| d.as_str()))
        .collect();

    plan.tasks
        .iter()
        .filter(|t| t.dependencies.is_empty() && !depended_on.contains(t.id.as_str()))
        .map(|t| t.id.clone())
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum LayeringError {
    #[error("cannot compute execution layers: dependency graph contains a cycle")]
    Cyclic,
}

/// Kahn's algorithm, grouping every task whose dependencies are satisfied
/// by the previous layers into one layer. Within a layer, ids are sorted
/// so the order is deterministic run to run.
pub fn compute_execution_layers(plan: &Plan) -> Result<Vec<Vec<String>>, LayeringError> {
    let mut indegree: HashMap<&str, usize> =
        plan.tasks.iter().map(|t| (t.id.as_str(), 0)).collect();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

    for task in &plan.tasks {
        *indegree.entry(task.id.as_str()).or_insert(0) = task.dependencies.len();
        for dep in &task.dependencies {
            dependents.entry(dep.as_str()).or_default().push(task.id.as_str());
        }
    }

    let mut layers = Vec::new();
    let mut remaining = plan.tasks.len();
    let mut frontier: Vec<&str> = indegree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(id, _)| *id)
        .collect();
    frontier.sort();

    while !frontier.is_empty() {
        remaining -= frontier.len();
        layers.push(frontier.iter().map(|s| s.to_string()).collect::<Vec<_>>());

        let mut next = Vec::new();
        for id in &frontier {
            if let Some(deps) = dependents.get(id) {
                for dependent in deps {
                    let entry = indegree.get_mut(dependent).expect("known task id");
                    *entry -= 1;
                    if *entry == 0 {
                        next.push(*dependent);
                    }
                }
            }
        }
        next.sort();
        next.dedup();
        frontier = next;
    }

    if remaining != 0 {
        return Err(LayeringError::Cyclic);
    }

    Ok(layers)
}

fn compute_metrics(plan: &Plan, layers: &[Vec<String>]) -> ExecutionMetrics {
    let weights: HashMap<&str, u32> = plan
        .tasks
        .iter()
        .map(|t| (t.id.as_str(), t.complexity.weight()))
        .collect();
    let deps: HashMap<&str, &HashSet<String>> = plan
        .tasks
        .iter()
        .map(|t| (t.id.as_str(), &t.dependencies))
        .collect();

    // Longest weighted path through the DAG, memoized bottom-up by layer
    // order (a task's longest path depends only on tasks in earlier layers).
    let mut longest: HashMap<&str, (u32, Vec<String>)> = HashMap::new();
    for layer in layers {
        for id in layer {
            let own_weight = *weights.get(id.as_str()).unwrap_or(&0);
            let best = deps
                .get(id.as_str())
                .into_iter()
                .flat_map(|d| d.iter())
                .filter_map(|dep| longest.get(dep.as_str()))
                .max_by_key(|(w, _)| *w)
                .cloned();

            match best {
                Some((w, mut path)) => {
                    path.push(id.clone());
                    longest.insert(id.as_str(), (w + own_weight, path));
                }
                None => {
                    longest.insert(id.as_str(), (own_weight, vec![id.clone()]));
                }
            }
        }
    }

    let (critical_path_weight, critical_path) = longest
        .values()
        .max_by_key(|(w, _)| *w)
        .cloned()
        .unwrap_or((0, Vec::new()));

    ExecutionMetrics {
        task_count: plan.tasks.len(),
        execution_layers: layers.len(),
        max_parallelization: layers.iter().map(|l| l.len()).max().unwrap_or(0),
        critical_path,
        critical_path_weight,
    }
}
