//! Facility configuration registry.
//!
//! Maps a facility identifier to its ordered list of dashboard slots. The
//! registry holds one immutable [`FacilityConfiguration`] per facility
//! behind an `Arc`; updates build a new configuration and swap the pointer,
//! so a resolution pass that already holds an `Arc` keeps reading the
//! configuration it started with.
//!
//! Ordinals are append-consistent. Updates may add slots or move them in
//! display order, but an ordinal that already exists can never be
//! reassigned to a different slot kind.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::slot::{numbered, SlotDescriptor, SlotKind};
use crate::types::FacilityId;

// ---------------------------------------------------------------------------
// Known facilities
// ---------------------------------------------------------------------------

pub const FACILITY_BC01: &str = "BC01";
pub const FACILITY_BC02: &str = "BC02";
pub const FACILITY_GY01: &str = "GY01";

/// Facility selected when nothing else has been configured.
pub const DEFAULT_FACILITY: &str = FACILITY_GY01;

/// Built-in facilities and their remote `nanodc_id`.
pub const KNOWN_FACILITIES: [(&str, &str); 3] = [
    (FACILITY_BC01, "dcf1bb07-f621-4b4d-9d61-45fc3cf5ac20"),
    (FACILITY_BC02, "5e807a27-7c3a-4a22-8df2-20c392186ed3"),
    (FACILITY_GY01, "c236ea9c-3d7e-430b-98b8-1e22d0d6cf01"),
];

/// Remote id of a built-in facility.
pub fn known_nanodc_id(facility_id: &str) -> Option<&'static str> {
    KNOWN_FACILITIES
        .iter()
        .find(|(id, _)| id.eq_ignore_ascii_case(facility_id))
        .map(|(_, nanodc_id)| *nanodc_id)
}

/// Slot order used by GY01 and by any facility without its own layout.
pub fn default_order() -> Vec<SlotDescriptor> {
    use SlotKind::*;
    numbered(&[
        NdpInfo,
        NodeInfo,
        NodeInfoAethir,
        Switch100G,
        NodeMiner,
        PostWorker,
        Supra,
        SupraNone1,
        SupraNone2,
        SupraNone3,
        SystemToAi,
        SystemToAiNone,
        Aethir,
        AethirNone,
        Filecoin,
        FilecoinNone1,
        FilecoinNone2,
        NotStorage,
        UpsController,
        LogoZetacube,
    ])
}

pub fn bc01_order() -> Vec<SlotDescriptor> {
    use SlotKind::*;
    numbered(&[
        NdpInfo,
        NodeInfo,
        NodeInfoAethir,
        Switch100G,
        SystemToAi,
        Aethir,
        Filecoin,
        Storage1,
        Storage2,
        NodeMiner,
        Storage3,
        Storage4,
        Storage5,
        Storage6,
        UpsController,
        LogoZetacube,
    ])
}

/// BC02 racks three Lenovo post workers (ordinals 4-6) and five NAS units
/// (ordinals 9-13) that share one tile kind each.
pub fn bc02_order() -> Vec<SlotDescriptor> {
    use SlotKind::*;
    numbered(&[
        NdpInfo,
        NodeInfo,
        NodeInfoAethir,
        Switch100G,
        LonovoPost,
        LonovoPost,
        LonovoPost,
        FilecoinNone1,
        Storage2None,
        Storage1,
        Storage1,
        Storage1,
        Storage1,
        Storage1,
        UpsController,
        LogoZetacube,
    ])
}

// ---------------------------------------------------------------------------
// FacilityConfiguration
// ---------------------------------------------------------------------------

/// The slot layout of one facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityConfiguration {
    pub facility_id: FacilityId,
    /// Remote id used to scope snapshot requests, when known.
    #[serde(default)]
    pub nanodc_id: Option<String>,
    /// Slots in display order.
    pub slots: Vec<SlotDescriptor>,
    /// Permit one node to populate several slots in the same pass.
    #[serde(default)]
    pub allow_aliasing: bool,
}

impl FacilityConfiguration {
    /// Build a configuration, attaching the remote id of built-in facilities.
    pub fn new(facility_id: impl Into<FacilityId>, slots: Vec<SlotDescriptor>) -> Self {
        let facility_id = facility_id.into();
        let nanodc_id = known_nanodc_id(&facility_id).map(str::to_string);
        Self {
            facility_id,
            nanodc_id,
            slots,
            allow_aliasing: false,
        }
    }

    pub fn with_aliasing(mut self, allow: bool) -> Self {
        self.allow_aliasing = allow;
        self
    }

    pub fn is(&self, facility_id: &str) -> bool {
        self.facility_id.eq_ignore_ascii_case(facility_id)
    }

    pub fn slot(&self, ordinal: u32) -> Option<&SlotDescriptor> {
        self.slots.iter().find(|s| s.ordinal == ordinal)
    }

    /// Ordinal for the next appended slot: one past the highest in use.
    pub fn next_ordinal(&self) -> u32 {
        self.slots
            .iter()
            .map(|s| s.ordinal + 1)
            .max()
            .unwrap_or(0)
    }

    /// Check the configuration is internally consistent.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.facility_id.trim().is_empty() {
            return Err(CoreError::Validation("facility_id must not be empty".into()));
        }
        let mut seen = HashSet::new();
        for slot in &self.slots {
            if !seen.insert(slot.ordinal) {
                return Err(CoreError::Validation(format!(
                    "duplicate ordinal {} in facility {}",
                    slot.ordinal, self.facility_id
                )));
            }
        }
        Ok(())
    }

    /// Reject a replacement that reassigns an ordinal to another kind.
    fn check_stable_against(&self, previous: &FacilityConfiguration) -> Result<(), CoreError> {
        for slot in &self.slots {
            if let Some(old) = previous.slot(slot.ordinal) {
                if old.kind != slot.kind {
                    return Err(CoreError::Conflict(format!(
                        "ordinal {} of facility {} is {:?}, cannot become {:?}",
                        slot.ordinal, self.facility_id, old.kind, slot.kind
                    )));
                }
            }
        }
        Ok(())
    }
}

/// The configurations shipped with the binary.
pub fn builtin_configurations() -> Vec<FacilityConfiguration> {
    vec![
        FacilityConfiguration::new(FACILITY_BC01, bc01_order()),
        FacilityConfiguration::new(FACILITY_BC02, bc02_order()),
        FacilityConfiguration::new(FACILITY_GY01, default_order()),
    ]
}

// ---------------------------------------------------------------------------
// FacilityRegistry
// ---------------------------------------------------------------------------

/// Registry of facility layouts plus the currently active facility.
///
/// Constructed once at startup and shared behind an `Arc`. Reads never
/// block on the active pointer; configuration updates take a short write
/// lock on the map and then swap pointers.
pub struct FacilityRegistry {
    configs: RwLock<HashMap<String, Arc<FacilityConfiguration>>>,
    active: ArcSwap<FacilityConfiguration>,
}

fn key(facility_id: &str) -> String {
    facility_id.trim().to_ascii_uppercase()
}

impl FacilityRegistry {
    /// Registry holding the built-in configurations with the default
    /// facility active.
    pub fn new() -> Self {
        let configs = Self::builtin_map();
        let active = configs
            .get(&key(DEFAULT_FACILITY))
            .cloned()
            .unwrap_or_else(|| Arc::new(Self::fallback(DEFAULT_FACILITY)));
        Self {
            configs: RwLock::new(configs),
            active: ArcSwap::new(active),
        }
    }

    fn builtin_map() -> HashMap<String, Arc<FacilityConfiguration>> {
        builtin_configurations()
            .into_iter()
            .map(|c| (key(&c.facility_id), Arc::new(c)))
            .collect()
    }

    fn fallback(facility_id: &str) -> FacilityConfiguration {
        FacilityConfiguration::new(facility_id.trim(), default_order())
    }

    /// Configuration for `facility_id`.
    ///
    /// Unknown facilities get the default order under their own id. The
    /// returned `Arc` is never mutated; hold it for the whole pass.
    pub fn configuration(&self, facility_id: &str) -> Arc<FacilityConfiguration> {
        let configs = self.configs.read().unwrap_or_else(PoisonError::into_inner);
        match configs.get(&key(facility_id)) {
            Some(config) => Arc::clone(config),
            None => {
                tracing::debug!(facility_id, "Unknown facility, using default slot order");
                Arc::new(Self::fallback(facility_id))
            }
        }
    }

    /// Ordered slots of `facility_id`, or the default order when unknown.
    pub fn slot_order(&self, facility_id: &str) -> Vec<SlotDescriptor> {
        self.configuration(facility_id).slots.clone()
    }

    /// Replace the slot order of a facility, creating it if needed.
    pub fn set_slot_order(
        &self,
        facility_id: &str,
        order: Vec<SlotDescriptor>,
    ) -> Result<Arc<FacilityConfiguration>, CoreError> {
        let mut next = (*self.configuration(facility_id)).clone();
        next.slots = order;
        self.install(next)
    }

    /// Add a configuration, or update the one with the same facility id.
    pub fn add_configuration(
        &self,
        config: FacilityConfiguration,
    ) -> Result<Arc<FacilityConfiguration>, CoreError> {
        self.install(config)
    }

    /// Append a slot of `kind` at the end of the display order.
    pub fn append_slot(&self, facility_id: &str, kind: SlotKind) -> Result<SlotDescriptor, CoreError> {
        let position = self.configuration(facility_id).slots.len();
        self.insert_slot(facility_id, position, kind)
    }

    /// Insert a slot of `kind` at display `position`.
    ///
    /// The new slot receives a fresh ordinal; every existing slot keeps its
    /// ordinal even though its display position may shift.
    pub fn insert_slot(
        &self,
        facility_id: &str,
        position: usize,
        kind: SlotKind,
    ) -> Result<SlotDescriptor, CoreError> {
        let mut next = (*self.configuration(facility_id)).clone();
        let slot = SlotDescriptor::new(kind, next.next_ordinal());
        let position = position.min(next.slots.len());
        next.slots.insert(position, slot);
        self.install(next)?;
        Ok(slot)
    }

    /// Restore the built-in configurations. The active facility id is kept.
    pub fn reset_to_default(&self) {
        let active_id = self.active.load().facility_id.clone();
        {
            let mut configs = self.configs.write().unwrap_or_else(PoisonError::into_inner);
            *configs = Self::builtin_map();
        }
        self.active.store(self.configuration(&active_id));
        tracing::info!(active = %active_id, "Facility configurations reset to defaults");
    }

    /// Make `facility_id` the active facility and return its configuration.
    pub fn set_active(&self, facility_id: &str) -> Arc<FacilityConfiguration> {
        let config = self.configuration(facility_id);
        let previous = self.active.swap(Arc::clone(&config));
        if !previous.is(&config.facility_id) {
            tracing::info!(
                from = %previous.facility_id,
                to = %config.facility_id,
                "Active facility switched"
            );
        }
        config
    }

    /// Configuration of the active facility.
    pub fn active(&self) -> Arc<FacilityConfiguration> {
        self.active.load_full()
    }

    /// Look a facility up by its remote id.
    pub fn find_by_nanodc_id(&self, nanodc_id: &str) -> Option<Arc<FacilityConfiguration>> {
        let configs = self.configs.read().unwrap_or_else(PoisonError::into_inner);
        configs
            .values()
            .find(|c| {
                c.nanodc_id
                    .as_deref()
                    .is_some_and(|id| id.eq_ignore_ascii_case(nanodc_id))
            })
            .cloned()
    }

    /// Registered facility ids, sorted.
    pub fn facility_ids(&self) -> Vec<FacilityId> {
        let configs = self.configs.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<_> = configs.values().map(|c| c.facility_id.clone()).collect();
        ids.sort();
        ids
    }

    fn install(&self, config: FacilityConfiguration) -> Result<Arc<FacilityConfiguration>, CoreError> {
        config.validate()?;
        let config = Arc::new(config);
        {
            let mut configs = self.configs.write().unwrap_or_else(PoisonError::into_inner);
            let k = key(&config.facility_id);
            if let Some(previous) = configs.get(&k) {
                config.check_stable_against(previous)?;
            }
            configs.insert(k, Arc::clone(&config));
        }
        if self.active.load().is(&config.facility_id) {
            self.active.store(Arc::clone(&config));
        }
        tracing::debug!(
            facility_id = %config.facility_id,
            slots = config.slots.len(),
            "Facility configuration installed"
        );
        Ok(config)
    }
}

impl Default for FacilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
