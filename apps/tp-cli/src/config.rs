// config.rs — Planner configuration.
//
// PlannerConfig determines where the planner keeps its state: the plan
// document, the event log, and the three rule tables. `for_project()` gives
// the standard `.tp/` layout; an optional `.tp/planner.toml` overrides any
// path and the cascade/report settings:
//
//   [paths]
//   triggers = "rules/triggers.yaml"
//
//   [cascade]
//   max_rounds = 8
//
//   [report]
//   project = "Japan, autumn 2026"

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

fn default_max_rounds() -> usize {
    8
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeSettings {
    /// Rounds `tp cascade apply` runs before giving up on convergence.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
}

impl Default for CascadeSettings {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSettings {
    /// Display name used in status reports instead of the document's project.
    #[serde(default)]
    pub project: Option<String>,
}

/// Path overrides, relative to the project root.
#[derive(Debug, Clone, Default, Deserialize)]
struct PathOverrides {
    plan: Option<PathBuf>,
    events: Option<PathBuf>,
    schema: Option<PathBuf>,
    triggers: Option<PathBuf>,
    readiness: Option<PathBuf>,
}

/// The on-disk shape of `.tp/planner.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
struct PlannerFile {
    #[serde(default)]
    paths: PathOverrides,
    #[serde(default)]
    cascade: CascadeSettings,
    #[serde(default)]
    report: ReportSettings,
}

/// Resolved planner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub project_root: PathBuf,

    /// The `.tp/` state directory.
    pub state_dir: PathBuf,

    /// The plan document (JSON).
    pub plan_file: PathBuf,

    /// Append-only JSONL event log.
    pub events_log: PathBuf,

    pub schema_file: PathBuf,
    pub triggers_file: PathBuf,
    pub readiness_file: PathBuf,

    #[serde(default)]
    pub cascade: CascadeSettings,

    #[serde(default)]
    pub report: ReportSettings,
}

impl PlannerConfig {
    /// Standard `.tp/` layout for a project.
    pub fn for_project(project_root: impl AsRef<Path>) -> Self {
        let root = project_root.as_ref().to_path_buf();
        let tp_dir = root.join(".tp");
        Self {
            project_root: root,
            plan_file: tp_dir.join("plan.json"),
            events_log: tp_dir.join("events.jsonl"),
            schema_file: tp_dir.join("schema.json"),
            triggers_file: tp_dir.join("triggers.yaml"),
            readiness_file: tp_dir.join("readiness.json"),
            state_dir: tp_dir,
            cascade: CascadeSettings::default(),
            report: ReportSettings::default(),
        }
    }

    pub fn settings_file(&self) -> PathBuf {
        self.state_dir.join("planner.toml")
    }

    /// The standard layout with `.tp/planner.toml` applied, if it exists.
    pub fn load_or_default(project_root: impl AsRef<Path>) -> anyhow::Result<Self> {
        let mut config = Self::for_project(project_root);
        let path = config.settings_file();
        if !path.exists() {
            return Ok(config);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let file: PlannerFile = toml::from_str(&content)
            .with_context(|| format!("invalid planner settings in {}", path.display()))?;
        config.apply(file);
        Ok(config)
    }

    fn apply(&mut self, file: PlannerFile) {
        let root = self.project_root.clone();
        let resolve = |p: PathBuf| if p.is_absolute() { p } else { root.join(p) };
        if let Some(p) = file.paths.plan {
            self.plan_file = resolve(p);
        }
        if let Some(p) = file.paths.events {
            self.events_log = resolve(p);
        }
        if let Some(p) = file.paths.schema {
            self.schema_file = resolve(p);
        }
        if let Some(p) = file.paths.triggers {
            self.triggers_file = resolve(p);
        }
        if let Some(p) = file.paths.readiness {
            self.readiness_file = resolve(p);
        }
        self.cascade = file.cascade;
        self.report = file.report;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn for_project_uses_tp_layout() {
        let config = PlannerConfig::for_project("/trips/japan");
        assert_eq!(config.plan_file, PathBuf::from("/trips/japan/.tp/plan.json"));
        assert_eq!(config.events_log, PathBuf::from("/trips/japan/.tp/events.jsonl"));
        assert_eq!(config.triggers_file, PathBuf::from("/trips/japan/.tp/triggers.yaml"));
        assert_eq!(config.cascade.max_rounds, 8);
        assert!(config.report.project.is_none());
    }

    #[test]
    fn missing_settings_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = PlannerConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config, PlannerConfig::for_project(dir.path()));
    }

    #[test]
    fn settings_file_overrides_paths_and_settings() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".tp")).unwrap();
        fs::write(
            dir.path().join(".tp/planner.toml"),
            r#"
[paths]
triggers = "rules/triggers.yaml"
readiness = "/etc/tp/readiness.json"

[cascade]
max_rounds = 3

[report]
project = "Japan, autumn 2026"
"#,
        )
        .unwrap();

        let config = PlannerConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.triggers_file, dir.path().join("rules/triggers.yaml"));
        assert_eq!(config.readiness_file, PathBuf::from("/etc/tp/readiness.json"));
        assert_eq!(config.plan_file, dir.path().join(".tp/plan.json"));
        assert_eq!(config.cascade.max_rounds, 3);
        assert_eq!(config.report.project.as_deref(), Some("Japan, autumn 2026"));
    }

    #[test]
    fn invalid_settings_file_is_an_error() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".tp")).unwrap();
        fs::write(dir.path().join(".tp/planner.toml"), "[cascade]\nmax_rounds = \"many\"\n")
            .unwrap();
        let err = PlannerConfig::load_or_default(dir.path()).unwrap_err();
        assert!(err.to_string().contains("invalid planner settings"));
    }
}
