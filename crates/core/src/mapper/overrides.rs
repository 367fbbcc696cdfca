//! Facility-specific slot override tables.
//!
//! An override rule binds one slot ordinal of one facility to a keyword
//! match on node names. When a rule exists for a slot the generic keyword
//! rule is not consulted. Tables are plain data: they ship built in for
//! BC01 and BC02 and can be replaced from a JSON file.
//!
//! File format:
//!
//! ```json
//! {
//!   "facilities": {
//!     "BC02": [
//!       { "ordinal": 4, "match": { "all_of": ["Filecoin", "Miner"] },
//!         "display_name": "BC02 Filecoin Miner" }
//!     ]
//!   }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::facility::{FACILITY_BC01, FACILITY_BC02};

/// Case-insensitive substring match against a node name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordMatch {
    /// Every keyword must appear.
    AllOf(Vec<String>),
    /// At least one keyword must appear.
    AnyOf(Vec<String>),
}

impl KeywordMatch {
    pub fn all_of(keywords: &[&str]) -> Self {
        KeywordMatch::AllOf(keywords.iter().map(|k| k.to_string()).collect())
    }

    pub fn any_of(keywords: &[&str]) -> Self {
        KeywordMatch::AnyOf(keywords.iter().map(|k| k.to_string()).collect())
    }

    pub fn keywords(&self) -> &[String] {
        match self {
            KeywordMatch::AllOf(k) | KeywordMatch::AnyOf(k) => k,
        }
    }

    pub fn matches(&self, node_name: &str) -> bool {
        let name = node_name.to_lowercase();
        let contains = |k: &String| name.contains(&k.to_lowercase());
        match self {
            KeywordMatch::AllOf(keywords) => keywords.iter().all(contains),
            KeywordMatch::AnyOf(keywords) => keywords.iter().any(contains),
        }
    }
}

/// Binds one slot ordinal to a node-name match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRule {
    pub ordinal: u32,
    #[serde(rename = "match")]
    pub matcher: KeywordMatch,
    /// Name shown on the tile instead of the node's own name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl OverrideRule {
    pub fn new(ordinal: u32, matcher: KeywordMatch) -> Self {
        Self {
            ordinal,
            matcher,
            display_name: None,
        }
    }

    pub fn named(mut self, display_name: &str) -> Self {
        self.display_name = Some(display_name.to_string());
        self
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TableFile {
    #[serde(default)]
    facilities: BTreeMap<String, Vec<OverrideRule>>,
}

/// Override rules grouped by facility, keyed by `(facility, ordinal)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideTable {
    facilities: HashMap<String, BTreeMap<u32, OverrideRule>>,
}

impl OverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The rules shipped with the binary for BC01 and BC02.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        for rule in bc02_rules() {
            table.insert_unchecked(FACILITY_BC02, rule);
        }
        for rule in bc01_rules() {
            table.insert_unchecked(FACILITY_BC01, rule);
        }
        table
    }

    /// Parse a table from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let file: TableFile =
            serde_json::from_str(json).map_err(|e| CoreError::OverrideTable(e.to_string()))?;
        let mut table = Self::new();
        for (facility, rules) in file.facilities {
            for rule in rules {
                table.insert(&facility, rule)?;
            }
        }
        Ok(table)
    }

    /// Load a table from a JSON file.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let json = std::fs::read_to_string(path)?;
        let table = Self::from_json(&json)?;
        tracing::info!(
            path = %path.display(),
            facilities = table.facilities.len(),
            "Loaded slot override table"
        );
        Ok(table)
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        let file = TableFile {
            facilities: self
                .facilities
                .iter()
                .map(|(facility, rules)| (facility.clone(), rules.values().cloned().collect()))
                .collect(),
        };
        serde_json::to_string_pretty(&file).map_err(|e| CoreError::OverrideTable(e.to_string()))
    }

    /// Add a rule. Each `(facility, ordinal)` pair may carry one rule and
    /// every rule needs at least one non-blank keyword.
    pub fn insert(&mut self, facility_id: &str, rule: OverrideRule) -> Result<(), CoreError> {
        if rule.matcher.keywords().iter().all(|k| k.trim().is_empty()) {
            return Err(CoreError::OverrideTable(format!(
                "rule for {facility_id} ordinal {} has no keywords",
                rule.ordinal
            )));
        }
        if self.rule(facility_id, rule.ordinal).is_some() {
            return Err(CoreError::OverrideTable(format!(
                "duplicate rule for {facility_id} ordinal {}",
                rule.ordinal
            )));
        }
        self.insert_unchecked(facility_id, rule);
        Ok(())
    }

    fn insert_unchecked(&mut self, facility_id: &str, rule: OverrideRule) {
        self.facilities
            .entry(facility_id.trim().to_ascii_uppercase())
            .or_default()
            .insert(rule.ordinal, rule);
    }

    pub fn rule(&self, facility_id: &str, ordinal: u32) -> Option<&OverrideRule> {
        self.facilities
            .get(&facility_id.trim().to_ascii_uppercase())
            .and_then(|rules| rules.get(&ordinal))
    }

    /// Whether `facility_id` has any overrides at all.
    pub fn covers(&self, facility_id: &str) -> bool {
        self.facilities
            .contains_key(&facility_id.trim().to_ascii_uppercase())
    }
}

fn bc02_rules() -> Vec<OverrideRule> {
    let mut rules = vec![
        OverrideRule::new(4, KeywordMatch::all_of(&["Filecoin", "Miner"]))
            .named("BC02 Filecoin Miner"),
        OverrideRule::new(5, KeywordMatch::any_of(&["3080Ti", "GPU Worker"]))
            .named("BC02 3080Ti GPU Worker"),
        OverrideRule::new(6, KeywordMatch::all_of(&["Post Worker"])).named("BC02 Post Worker"),
    ];
    for (n, ordinal) in (9..=13).enumerate() {
        let nas = format!("NAS{}", n + 1);
        rules.push(
            OverrideRule::new(ordinal, KeywordMatch::AllOf(vec![nas.clone()]))
                .named(&format!("BC02 {nas}")),
        );
    }
    rules
}

fn bc01_rules() -> Vec<OverrideRule> {
    vec![
        OverrideRule::new(7, KeywordMatch::all_of(&["NAS5"])).named("BC01 Storage 1"),
        OverrideRule::new(8, KeywordMatch::any_of(&["NAS3", "NAS4"])).named("BC01 Storage 2"),
        OverrideRule::new(9, KeywordMatch::all_of(&["Filecoin-Miner"])).named("BC01 Filecoin Miner"),
        OverrideRule::new(10, KeywordMatch::all_of(&["NAS2"])).named("BC01 Storage 3"),
        OverrideRule::new(11, KeywordMatch::all_of(&["NAS1"])).named("BC01 Storage 4"),
        OverrideRule::new(12, KeywordMatch::all_of(&["SAI Server"])).named("BC01 Storage 5"),
        OverrideRule::new(13, KeywordMatch::all_of(&["Filecoin"])),
    ]
}
