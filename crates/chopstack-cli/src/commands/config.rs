use std::path::Path;

use chopstack_core::config::{Config, SettingsManager};

/// Print the effective configuration for `project_root` (project-local file
/// if present, built-in defaults otherwise).
pub fn show(project_root: &Path, json: bool) -> anyhow::Result<()> {
    let manager = SettingsManager::project_local(project_root);
    let cfg = manager.load_or_default();
    if json {
        println!("{}", serde_json::to_string_pretty(&cfg)?);
    } else {
        println!("{}", cfg.to_toml()?);
    }
    Ok(())
}

/// Write a default `.chopstack/config.toml` under `project_root`, refusing
/// to clobber an existing one.
pub fn init(project_root: &Path) -> anyhow::Result<()> {
    let manager = SettingsManager::project_local(project_root);
    if manager.path().exists() {
        anyhow::bail!("{} already exists", manager.path().display());
    }
    manager.save(&Config::default())?;
    println!("wrote {}", manager.path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_then_show_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        init(dir.path()).unwrap();
        assert!(show(dir.path(), true).is_ok());
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        init(dir.path()).unwrap();
        assert!(init(dir.path()).is_err());
    }
}
