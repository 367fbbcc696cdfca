//! Wiring of the pure resolution stages.
//!
//! Built once at startup and shared by the scheduler and the HTTP
//! handlers. Holds no per-cycle state.

use std::path::Path;
use std::sync::Arc;

use nanodc_core::classify::Classifier;
use nanodc_core::dashboard::Dashboard;
use nanodc_core::error::CoreError;
use nanodc_core::facility::{FacilityConfiguration, FacilityRegistry};
use nanodc_core::mapper::overrides::OverrideTable;
use nanodc_core::mapper::NodeMapper;
use nanodc_core::snapshot::Snapshot;

pub struct Pipeline {
    registry: Arc<FacilityRegistry>,
    mapper: NodeMapper,
    classifier: Classifier,
}

impl Pipeline {
    pub fn new(registry: Arc<FacilityRegistry>, mapper: NodeMapper, classifier: Classifier) -> Self {
        Self {
            registry,
            mapper,
            classifier,
        }
    }

    /// Built-in facilities, override tables and keyword groups.
    pub fn builtin() -> Self {
        Self::new(
            Arc::new(FacilityRegistry::new()),
            NodeMapper::builtin(),
            Classifier::builtin(),
        )
    }

    /// Built-in pipeline whose override tables come from `path` when given.
    pub fn with_overrides_file(path: Option<&Path>) -> Result<Self, CoreError> {
        let mapper = match path {
            Some(path) => NodeMapper::new(OverrideTable::load(path)?),
            None => NodeMapper::builtin(),
        };
        Ok(Self::new(
            Arc::new(FacilityRegistry::new()),
            mapper,
            Classifier::builtin(),
        ))
    }

    pub fn registry(&self) -> &Arc<FacilityRegistry> {
        &self.registry
    }

    /// Resolve every slot of `config` against one snapshot.
    pub fn assemble(&self, config: &FacilityConfiguration, snapshot: &Snapshot) -> Dashboard {
        Dashboard::build(config, snapshot, &self.mapper, &self.classifier)
    }

    /// Every slot of `facility_id` listed empty, for use before any fetch
    /// has succeeded.
    pub fn placeholder(&self, facility_id: &str) -> Dashboard {
        let config = self.registry.configuration(facility_id);
        self.assemble(&config, &Snapshot::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanodc_core::facility::FACILITY_BC02;

    #[test]
    fn placeholder_lists_every_slot_empty() {
        let pipeline = Pipeline::builtin();
        let dashboard = pipeline.placeholder(FACILITY_BC02);

        assert_eq!(dashboard.facility_id, FACILITY_BC02);
        assert_eq!(
            dashboard.entries.len(),
            pipeline.registry().slot_order(FACILITY_BC02).len()
        );
        assert_eq!(dashboard.filled(), 0);
    }

    #[test]
    fn missing_overrides_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Pipeline::with_overrides_file(Some(&dir.path().join("absent.json")));
        assert!(result.is_err());
    }
}
