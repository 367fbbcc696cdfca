//! Node-to-slot mapping.
//!
//! Decides which node from a snapshot populates each slot of a facility
//! layout. A slot is matched either by a facility override rule (see
//! [`overrides`]) or, when the facility has no rule for that ordinal, by the
//! generic keyword its [`SlotKind`](crate::slot::SlotKind) declares.
//!
//! Mapping is a pure function of its inputs. Ties go to the first matching
//! node in snapshot order and are reported as [`MappingAmbiguity`].

pub mod overrides;

use std::collections::HashSet;

use serde::Serialize;

use crate::facility::FacilityConfiguration;
use crate::snapshot::{HardwareSpec, NodeRecord, ScoreRecord, Snapshot, UsageSample};
use crate::slot::SlotDescriptor;

pub use overrides::{KeywordMatch, OverrideRule, OverrideTable};

/// How a slot selects its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion<'a> {
    /// A facility override rule. The generic rule is not consulted.
    Override(&'a OverrideRule),
    /// The slot kind's generic node-name keyword.
    Generic(&'static str),
    /// The slot never binds a node.
    Unbound,
}

impl Criterion<'_> {
    fn matches(&self, node: &NodeRecord) -> bool {
        match self {
            Criterion::Override(rule) => rule.matcher.matches(&node.node_name),
            Criterion::Generic(keyword) => node
                .node_name
                .to_lowercase()
                .contains(&keyword.to_lowercase()),
            Criterion::Unbound => false,
        }
    }

    fn display_name(&self) -> Option<String> {
        match self {
            Criterion::Override(rule) => rule.display_name.clone(),
            _ => None,
        }
    }
}

/// One slot bound to zero or one node, with that node's records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSlot {
    pub slot: SlotDescriptor,
    pub node: Option<NodeRecord>,
    pub hardware: Option<HardwareSpec>,
    pub usage: Option<UsageSample>,
    pub score: Option<ScoreRecord>,
    /// Facility-defined tile name, when the facility sets one.
    pub display_name: Option<String>,
}

impl ResolvedSlot {
    pub fn empty(slot: SlotDescriptor) -> Self {
        Self {
            slot,
            node: None,
            hardware: None,
            usage: None,
            score: None,
            display_name: None,
        }
    }

    fn bind(slot: SlotDescriptor, node: Option<&NodeRecord>, snapshot: &Snapshot) -> Self {
        match node {
            Some(node) => Self {
                slot,
                hardware: snapshot.hardware_for(&node.node_id).cloned(),
                usage: snapshot.latest_usage_for(&node.node_id).cloned(),
                score: snapshot.score_for(&node.node_id).cloned(),
                node: Some(node.clone()),
                display_name: None,
            },
            None => Self::empty(slot),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.node.is_none()
    }

    /// Name to show on the tile: the facility override, else the node name.
    pub fn title(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .or_else(|| self.node.as_ref().map(|n| n.node_name.as_str()))
    }
}

/// More than one node satisfied a slot's criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingAmbiguity {
    pub facility_id: String,
    pub ordinal: u32,
    /// Node names of every candidate, in snapshot order. The first won.
    pub candidates: Vec<String>,
}

/// Outcome of resolving every slot of one facility.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Resolution {
    /// Slots in display order.
    pub slots: Vec<ResolvedSlot>,
    pub ambiguities: Vec<MappingAmbiguity>,
}

/// Resolves slots to nodes using the generic rule plus an override table.
#[derive(Debug, Clone, Default)]
pub struct NodeMapper {
    overrides: OverrideTable,
}

impl NodeMapper {
    pub fn new(overrides: OverrideTable) -> Self {
        Self { overrides }
    }

    /// Mapper using the built-in override tables.
    pub fn builtin() -> Self {
        Self::new(OverrideTable::builtin())
    }

    pub fn overrides(&self) -> &OverrideTable {
        &self.overrides
    }

    /// The criterion `slot` is matched by in `facility_id`.
    pub fn criterion(&self, facility_id: &str, slot: &SlotDescriptor) -> Criterion<'_> {
        if let Some(rule) = self.overrides.rule(facility_id, slot.ordinal) {
            return Criterion::Override(rule);
        }
        match slot.kind.node_keyword() {
            Some(keyword) => Criterion::Generic(keyword),
            None => Criterion::Unbound,
        }
    }

    /// Node that populates `slot`, considering that slot in isolation.
    ///
    /// Returns the first match in snapshot order and logs a warning when
    /// several nodes qualify.
    pub fn resolve<'s>(
        &self,
        facility_id: &str,
        slot: &SlotDescriptor,
        snapshot: &'s Snapshot,
    ) -> Option<&'s NodeRecord> {
        let criterion = self.criterion(facility_id, slot);
        let candidates: Vec<&NodeRecord> = snapshot
            .nodes
            .iter()
            .filter(|n| criterion.matches(n))
            .collect();
        if candidates.len() > 1 {
            warn_ambiguous(&ambiguity(facility_id, slot, &candidates));
        }
        candidates.first().copied()
    }

    /// Resolve every slot of `config` against one snapshot.
    ///
    /// Slots are visited in display order. Unless the configuration allows
    /// aliasing, a node bound to an earlier slot is not a candidate for
    /// later ones.
    pub fn resolve_all(&self, config: &FacilityConfiguration, snapshot: &Snapshot) -> Resolution {
        let mut bound: HashSet<&str> = HashSet::new();
        let mut resolution = Resolution::default();

        for slot in &config.slots {
            let criterion = self.criterion(&config.facility_id, slot);
            let candidates: Vec<&NodeRecord> = snapshot
                .nodes
                .iter()
                .filter(|n| config.allow_aliasing || !bound.contains(n.node_id.as_str()))
                .filter(|n| criterion.matches(n))
                .collect();

            if candidates.len() > 1 {
                let found = ambiguity(&config.facility_id, slot, &candidates);
                warn_ambiguous(&found);
                resolution.ambiguities.push(found);
            }

            let chosen = candidates.first().copied();
            if let Some(node) = chosen {
                bound.insert(node.node_id.as_str());
            }

            let mut resolved = ResolvedSlot::bind(*slot, chosen, snapshot);
            resolved.display_name = criterion.display_name();
            resolution.slots.push(resolved);
        }

        let filled = resolution.slots.iter().filter(|s| !s.is_empty()).count();
        tracing::debug!(
            facility_id = %config.facility_id,
            slots = resolution.slots.len(),
            filled,
            "Resolved facility slots"
        );
        resolution
    }
}

fn ambiguity(facility_id: &str, slot: &SlotDescriptor, candidates: &[&NodeRecord]) -> MappingAmbiguity {
    MappingAmbiguity {
        facility_id: facility_id.to_string(),
        ordinal: slot.ordinal,
        candidates: candidates.iter().map(|n| n.node_name.clone()).collect(),
    }
}

fn warn_ambiguous(found: &MappingAmbiguity) {
    tracing::warn!(
        facility_id = %found.facility_id,
        ordinal = found.ordinal,
        candidates = ?found.candidates,
        "Several nodes match slot, using the first"
    );
}
