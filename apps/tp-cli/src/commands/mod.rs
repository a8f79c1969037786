pub mod cascade;
pub mod check;
pub mod destination;
pub mod events;
pub mod field;
pub mod init;
pub mod process;
pub mod status;

use anyhow::Context;
use tp_cascade::{CascadeEngine, TriggerTable};
use tp_plan::{DocumentStore, EventLog, PlanDocument, PlanError, PlanEvent, SchemaContract};
use tp_readiness::{ReadinessReporter, ReadinessRules};

use crate::config::PlannerConfig;

/// An initialized plan: schema, document store, and event log.
///
/// Every mutating command is one load / mutate / `commit` cycle.
pub struct Planner<'a> {
    pub config: &'a PlannerConfig,
    pub schema: SchemaContract,
    pub store: DocumentStore,
    pub log: EventLog,
}

impl<'a> Planner<'a> {
    pub fn open(config: &'a PlannerConfig) -> anyhow::Result<Self> {
        let store = DocumentStore::new(&config.plan_file);
        if !store.exists() {
            anyhow::bail!(
                "No plan found at {}. Run `tp init <project>` first.",
                config.plan_file.display()
            );
        }
        let schema = SchemaContract::load(&config.schema_file)
            .with_context(|| format!("failed to load schema {}", config.schema_file.display()))?;
        Ok(Self {
            config,
            schema,
            store,
            log: EventLog::new(&config.events_log),
        })
    }

    /// Load the document together with its version (the save base).
    pub fn load(&self) -> anyhow::Result<(PlanDocument, u64)> {
        let doc = self.store.load()?;
        let base = doc.version;
        Ok((doc, base))
    }

    /// Save the document (compare-and-swap against `base`), then log events.
    pub fn commit(
        &self,
        doc: &PlanDocument,
        base: u64,
        events: &[PlanEvent],
    ) -> anyhow::Result<()> {
        match self.store.save(doc, base) {
            Err(PlanError::VersionConflict { expected, found }) => anyhow::bail!(
                "plan changed on disk while this command ran (loaded version {}, now {}); re-run it",
                expected,
                found
            ),
            other => other?,
        }
        self.log.append(events)?;
        Ok(())
    }

    pub fn engine(&self) -> anyhow::Result<CascadeEngine> {
        let table = TriggerTable::load(&self.config.triggers_file).with_context(|| {
            format!(
                "failed to load trigger table {}",
                self.config.triggers_file.display()
            )
        })?;
        Ok(CascadeEngine::try_new(table, self.schema.clone())?)
    }

    pub fn reporter(&self) -> anyhow::Result<ReadinessReporter> {
        let path = &self.config.readiness_file;
        let rules = if path.exists() {
            ReadinessRules::load(path)
                .with_context(|| format!("failed to load readiness rules {}", path.display()))?
        } else {
            tracing::debug!("no readiness rules at {}; every process reports blocked", path.display());
            ReadinessRules::default()
        };
        Ok(ReadinessReporter::new(rules, self.schema.clone()))
    }
}
