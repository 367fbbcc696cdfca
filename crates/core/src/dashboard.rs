//! Assembly of the per-cycle dashboard.
//!
//! Runs mapping, normalization and classification over one snapshot and
//! produces the ordered tuples the rendering layer consumes.

use serde::Serialize;

use crate::classify::{Classifier, LayoutCategory};
use crate::facility::FacilityConfiguration;
use crate::mapper::{MappingAmbiguity, NodeMapper, ResolvedSlot};
use crate::normalize::{normalize_with_hardware, ExtendedMetrics};
use crate::snapshot::{LedgerSummary, ScoreRecord, Snapshot};
use crate::types::FacilityId;

/// One rendered tile: the slot binding plus what rendering needs to draw it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardEntry {
    #[serde(flatten)]
    pub resolved: ResolvedSlot,
    /// Present when the bound node has a usage sample.
    pub metrics: Option<ExtendedMetrics>,
    /// Present when a node is bound.
    pub layout: Option<LayoutCategory>,
    /// Present when the bound node has ledger transactions.
    pub ledger: Option<LedgerSummary>,
}

/// Everything derived from one snapshot for one facility.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub facility_id: FacilityId,
    pub entries: Vec<DashboardEntry>,
    pub ambiguities: Vec<MappingAmbiguity>,
    /// Facility-level score for summary tiles.
    pub summary_score: ScoreRecord,
}

impl Dashboard {
    /// Resolve, normalize and classify every slot of `config`.
    pub fn build(
        config: &FacilityConfiguration,
        snapshot: &Snapshot,
        mapper: &NodeMapper,
        classifier: &Classifier,
    ) -> Self {
        let resolution = mapper.resolve_all(config, snapshot);

        let entries = resolution
            .slots
            .into_iter()
            .map(|resolved| {
                let metrics = resolved
                    .usage
                    .as_ref()
                    .map(|usage| normalize_with_hardware(usage, resolved.hardware.as_ref()));
                let (layout, ledger) = match resolved.node.as_ref() {
                    Some(node) => {
                        let layout = classifier.classify(
                            &config.facility_id,
                            &node.node_name,
                            resolved.slot.ordinal as usize,
                        );
                        let ledger = snapshot.ledger_summary(&node.node_id);
                        (Some(layout), (ledger.transaction_count > 0).then_some(ledger))
                    }
                    None => (None, None),
                };
                DashboardEntry {
                    resolved,
                    metrics,
                    layout,
                    ledger,
                }
            })
            .collect();

        Self {
            facility_id: config.facility_id.clone(),
            entries,
            ambiguities: resolution.ambiguities,
            summary_score: snapshot.facility_score(),
        }
    }

    pub fn filled(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| !e.resolved.is_empty())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facility::{bc02_order, default_order, FACILITY_BC02, FACILITY_GY01};
    use crate::normalize::Percentage;
    use crate::snapshot::{LedgerTransaction, NodeRecord, UsageSample};

    fn bc02_snapshot() -> Snapshot {
        let node = |id: &str, name: &str| NodeRecord {
            node_id: id.into(),
            node_name: name.into(),
            ..Default::default()
        };
        Snapshot {
            nodes: vec![node("p", "BC02 Post Worker"), node("n", "BC02 NAS3")],
            node_usage: vec![UsageSample {
                node_id: "p".into(),
                cpu_usage_percent: Some("57.3".into()),
                gpu_temp: None,
                ..Default::default()
            }],
            ledger: vec![LedgerTransaction {
                node_id: "p".into(),
                amount: "2.5".into(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn builds_tuples_for_bound_slots() {
        let config = FacilityConfiguration::new(FACILITY_BC02, bc02_order());
        let dashboard = Dashboard::build(
            &config,
            &bc02_snapshot(),
            &NodeMapper::builtin(),
            &Classifier::builtin(),
        );

        let post = dashboard
            .entries
            .iter()
            .find(|e| e.resolved.slot.ordinal == 6)
            .unwrap();
        assert_eq!(post.layout, Some(LayoutCategory::ProcessingFocus));
        let metrics = post.metrics.as_ref().unwrap();
        assert_eq!(metrics.cpu.percentage.map(Percentage::value), Some(57.3));
        assert!(metrics.gpu_temperature.is_none());
        assert_eq!(post.ledger.unwrap().transaction_count, 1);

        let nas3 = dashboard
            .entries
            .iter()
            .find(|e| e.resolved.slot.ordinal == 11)
            .unwrap();
        assert_eq!(nas3.layout, Some(LayoutCategory::NetworkStorageFocus));
        assert!(nas3.metrics.is_none());
        assert!(nas3.ledger.is_none());

        assert_eq!(dashboard.filled(), 2);
        assert_eq!(dashboard.entries.len(), bc02_order().len());
    }

    #[test]
    fn empty_snapshot_keeps_override_names() {
        let config = FacilityConfiguration::new(FACILITY_BC02, bc02_order());
        let dashboard = Dashboard::build(
            &config,
            &Snapshot::default(),
            &NodeMapper::builtin(),
            &Classifier::builtin(),
        );
        let nas1 = &dashboard.entries[9];

        assert!(nas1.resolved.is_empty());
        assert_eq!(nas1.resolved.title(), Some("BC02 NAS1"));
    }

    #[test]
    fn empty_slots_have_no_layout() {
        let config = FacilityConfiguration::new(FACILITY_GY01, default_order());
        let dashboard = Dashboard::build(
            &config,
            &Snapshot::default(),
            &NodeMapper::builtin(),
            &Classifier::builtin(),
        );

        assert_eq!(dashboard.filled(), 0);
        assert_eq!(dashboard.entries.len(), default_order().len());
        assert!(dashboard.entries.iter().all(|e| e.layout.is_none()));
        assert_eq!(dashboard.summary_score, ScoreRecord::placeholder());
    }
}
