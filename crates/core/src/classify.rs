//! Presentation classification.
//!
//! Picks the [`LayoutCategory`] the rendering layer uses for a resolved
//! node. Facilities with keyword groups classify by node name, first group
//! wins; everything else rotates through [`ROTATION`] by a stable per-node
//! index.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::facility::FACILITY_BC02;
use crate::mapper::KeywordMatch;

/// Visual arrangement of a node's metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutCategory {
    GridBalanced,
    VerticalEmphasis,
    HorizontalEmphasis,
    Mixed,
    Dashboard,
    StorageFocus,
    ProcessingFocus,
    NetworkStorageFocus,
}

/// Categories used for round-robin classification.
pub const ROTATION: [LayoutCategory; 6] = [
    LayoutCategory::GridBalanced,
    LayoutCategory::VerticalEmphasis,
    LayoutCategory::HorizontalEmphasis,
    LayoutCategory::Mixed,
    LayoutCategory::Dashboard,
    LayoutCategory::StorageFocus,
];

/// Round-robin category for a stable node index.
pub fn rotate(index: usize) -> LayoutCategory {
    ROTATION[index % ROTATION.len()]
}

/// Node names matching `matcher` get `category`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordGroup {
    #[serde(rename = "match")]
    pub matcher: KeywordMatch,
    pub category: LayoutCategory,
}

impl KeywordGroup {
    pub fn new(matcher: KeywordMatch, category: LayoutCategory) -> Self {
        Self { matcher, category }
    }
}

/// Table-driven classifier.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    groups: HashMap<String, Vec<KeywordGroup>>,
}

impl Classifier {
    /// Classifier with no keyword groups: everything rotates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifier with the BC02 keyword groups.
    pub fn builtin() -> Self {
        let mut classifier = Self::new();
        for group in bc02_groups() {
            classifier.add_group(FACILITY_BC02, group);
        }
        classifier
    }

    /// Append a keyword group for `facility_id`. Earlier groups take
    /// precedence.
    pub fn add_group(&mut self, facility_id: &str, group: KeywordGroup) {
        self.groups
            .entry(facility_id.trim().to_ascii_uppercase())
            .or_default()
            .push(group);
    }

    pub fn has_groups(&self, facility_id: &str) -> bool {
        self.groups
            .contains_key(&facility_id.trim().to_ascii_uppercase())
    }

    /// Layout category for a node.
    ///
    /// `node_index` must be stable for the node across cycles; the slot
    /// ordinal is the usual choice. It is only consulted when no keyword
    /// group matches.
    pub fn classify(&self, facility_id: &str, node_name: &str, node_index: usize) -> LayoutCategory {
        self.groups
            .get(&facility_id.trim().to_ascii_uppercase())
            .and_then(|groups| groups.iter().find(|g| g.matcher.matches(node_name)))
            .map(|g| g.category)
            .unwrap_or_else(|| rotate(node_index))
    }
}

fn bc02_groups() -> Vec<KeywordGroup> {
    vec![
        KeywordGroup::new(
            KeywordMatch::all_of(&["Post Worker"]),
            LayoutCategory::ProcessingFocus,
        ),
        KeywordGroup::new(
            KeywordMatch::all_of(&["Filecoin", "Miner"]),
            LayoutCategory::Mixed,
        ),
        KeywordGroup::new(
            KeywordMatch::any_of(&["3080Ti", "GPU Worker"]),
            LayoutCategory::Mixed,
        ),
        KeywordGroup::new(
            KeywordMatch::all_of(&["NAS"]),
            LayoutCategory::NetworkStorageFocus,
        ),
    ]
}
