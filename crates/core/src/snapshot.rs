//! Records returned by the remote telemetry service.
//!
//! A [`Snapshot`] is one consistent fetch result. The pipeline treats it as
//! immutable: it is wrapped in an `Arc` after decoding and only ever read.
//!
//! The service is loose about JSON types (numbers sometimes arrive as
//! strings and vice versa, absent metrics arrive as `null`), so every
//! scalar field goes through the lenient helpers in [`de`].

use serde::{Deserialize, Serialize};

use crate::types::NodeId;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// One consolidated response from the data endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub hardware_specs: Vec<HardwareSpec>,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default, alias = "all_scores")]
    pub scores: Vec<ScoreRecord>,
    #[serde(default, rename = "ndpListFiltered", alias = "ndp_list")]
    pub ledger: Vec<LedgerTransaction>,
    #[serde(default, rename = "nanodc")]
    pub facilities: Vec<FacilityRecord>,
    #[serde(default)]
    pub node_usage: Vec<UsageSample>,
}

impl Snapshot {
    /// Decode a response body. An empty or whitespace-only body is `None`.
    pub fn from_json(body: &str) -> Result<Option<Self>, serde_json::Error> {
        if body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(body).map(Some)
    }

    /// `true` when every record array is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
            && self.hardware_specs.is_empty()
            && self.node_usage.is_empty()
            && self.scores.is_empty()
            && self.facilities.is_empty()
            && self.ledger.is_empty()
    }

    pub fn node(&self, node_id: &str) -> Option<&NodeRecord> {
        self.nodes.iter().find(|n| n.node_id == node_id)
    }

    pub fn hardware_for(&self, node_id: &str) -> Option<&HardwareSpec> {
        self.hardware_specs.iter().find(|h| h.node_id == node_id)
    }

    pub fn score_for(&self, node_id: &str) -> Option<&ScoreRecord> {
        self.scores.iter().find(|s| s.node_id == node_id)
    }

    /// Most recent usage sample for a node.
    ///
    /// Samples are ordered by their timestamp string (the service emits
    /// ISO-8601, which sorts lexically). Equal timestamps resolve to the
    /// sample that appears later in the array.
    pub fn latest_usage_for(&self, node_id: &str) -> Option<&UsageSample> {
        self.node_usage
            .iter()
            .filter(|u| u.node_id == node_id)
            .fold(None, |best: Option<&UsageSample>, sample| match best {
                Some(b) if b.timestamp > sample.timestamp => Some(b),
                _ => Some(sample),
            })
    }

    /// Ledger transactions attributed to a node, in snapshot order.
    pub fn ledger_for<'a>(
        &'a self,
        node_id: &'a str,
    ) -> impl Iterator<Item = &'a LedgerTransaction> + 'a {
        self.ledger.iter().filter(move |t| t.node_id == node_id)
    }

    /// Count and summed amount of a node's ledger transactions.
    ///
    /// Amounts that do not parse as numbers are counted but not summed.
    pub fn ledger_summary(&self, node_id: &str) -> LedgerSummary {
        self.ledger_for(node_id)
            .fold(LedgerSummary::default(), |mut acc, tx| {
                acc.transaction_count += 1;
                if let Some(amount) = de::parse_number(&tx.amount) {
                    acc.total_amount += amount;
                }
                acc
            })
    }

    /// Score shown on facility-level summary tiles.
    ///
    /// Uses the first score record in the snapshot, falling back to the
    /// placeholder score when the service returned none.
    pub fn facility_score(&self) -> ScoreRecord {
        self.scores
            .first()
            .cloned()
            .unwrap_or_else(ScoreRecord::placeholder)
    }

    /// Facility record whose remote id matches `nanodc_id`.
    pub fn facility_record(&self, nanodc_id: &str) -> Option<&FacilityRecord> {
        self.facilities
            .iter()
            .find(|f| f.nanodc_id.eq_ignore_ascii_case(nanodc_id))
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Lifecycle state of a node as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeStatus {
    Active,
    Pre,
    Other(String),
}

impl Default for NodeStatus {
    fn default() -> Self {
        NodeStatus::Other(String::new())
    }
}

impl From<String> for NodeStatus {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => NodeStatus::Active,
            "pre" => NodeStatus::Pre,
            _ => NodeStatus::Other(raw),
        }
    }
}

impl From<NodeStatus> for String {
    fn from(status: NodeStatus) -> Self {
        match status {
            NodeStatus::Active => "active".to_string(),
            NodeStatus::Pre => "pre".to_string(),
            NodeStatus::Other(raw) => raw,
        }
    }
}

/// Identity and lifecycle of one compute node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(default, deserialize_with = "de::int")]
    pub id: i64,
    #[serde(deserialize_with = "de::string")]
    pub node_id: NodeId,
    #[serde(default, deserialize_with = "de::string")]
    pub user_uuid: String,
    #[serde(default)]
    pub status: NodeStatus,
    #[serde(default, rename = "create_at", deserialize_with = "de::string")]
    pub created_at: String,
    #[serde(default, rename = "update_at", deserialize_with = "de::string")]
    pub updated_at: String,
    #[serde(default, deserialize_with = "de::string")]
    pub node_name: String,
    /// Remote id of the facility the node is installed in.
    #[serde(default, deserialize_with = "de::string")]
    pub nanodc_id: String,
}

/// Static capability description of a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HardwareSpec {
    #[serde(default, deserialize_with = "de::int")]
    pub id: i64,
    #[serde(deserialize_with = "de::string")]
    pub node_id: NodeId,
    #[serde(default, deserialize_with = "de::string")]
    pub cpu_model: String,
    #[serde(default, rename = "cpucores", deserialize_with = "de::string")]
    pub cpu_cores: String,
    #[serde(default, deserialize_with = "de::string")]
    pub cpu_count: String,
    #[serde(default, deserialize_with = "de::string")]
    pub gpu_model: String,
    #[serde(default, deserialize_with = "de::string")]
    pub gpu_vram_gb: String,
    #[serde(default, deserialize_with = "de::string")]
    pub gpu_count: String,
    #[serde(default, deserialize_with = "de::string")]
    pub total_ram_gb: String,
    #[serde(default, deserialize_with = "de::string")]
    pub storage_type: String,
    #[serde(default, deserialize_with = "de::string")]
    pub storage_total_gb: String,
    #[serde(default, deserialize_with = "de::string")]
    pub nvme_count: String,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub total_harddisk_gb: Option<String>,
    #[serde(default, deserialize_with = "de::string")]
    pub nanodc_id: String,
}

impl HardwareSpec {
    /// Total addressable storage in GB: the hard-disk total when reported,
    /// otherwise the primary storage total.
    pub fn total_storage_gb(&self) -> Option<f64> {
        self.total_harddisk_gb
            .as_deref()
            .and_then(de::parse_number)
            .filter(|v| *v > 0.0)
            .or_else(|| de::parse_number(&self.storage_total_gb).filter(|v| *v > 0.0))
    }
}

/// Time-stamped dynamic metrics of a node.
///
/// Every metric is optional. Absence means the node type does not report
/// the metric; it is never the same as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSample {
    #[serde(default, deserialize_with = "de::int")]
    pub id: i64,
    #[serde(deserialize_with = "de::string")]
    pub node_id: NodeId,
    #[serde(default, deserialize_with = "de::string")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub cpu_usage_percent: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub mem_usage_percent: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub cpu_temp: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub gpu_usage_percent: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub gpu_temp: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub gpu_vram_percent: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub used_storage_gb: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub harddisk_used_percent: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub ssd_health_percent: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub stage_used: Option<String>,
}

/// Per-node quality scores. Values are decimal strings from the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    #[serde(default, deserialize_with = "de::int")]
    pub id: i64,
    #[serde(deserialize_with = "de::string")]
    pub node_id: NodeId,
    #[serde(default, deserialize_with = "de::string")]
    pub cpu_score: String,
    #[serde(default, deserialize_with = "de::string")]
    pub gpu_score: String,
    #[serde(default, deserialize_with = "de::string")]
    pub ssd_score: String,
    #[serde(default, deserialize_with = "de::string")]
    pub ram_score: String,
    #[serde(default, deserialize_with = "de::string")]
    pub network_score: String,
    #[serde(default, deserialize_with = "de::string")]
    pub hardware_health_score: String,
    #[serde(default, deserialize_with = "de::string")]
    pub total_score: String,
    #[serde(default, deserialize_with = "de::string")]
    pub average_score: String,
}

/// Component value used by [`ScoreRecord::placeholder`].
pub const PLACEHOLDER_SCORE: &str = "80.00";

/// Total used by [`ScoreRecord::placeholder`] (six components of 80).
pub const PLACEHOLDER_TOTAL_SCORE: &str = "480.00";

impl ScoreRecord {
    /// Neutral score shown before the service has scored any node.
    pub fn placeholder() -> Self {
        Self {
            id: 0,
            node_id: "default".to_string(),
            cpu_score: PLACEHOLDER_SCORE.to_string(),
            gpu_score: PLACEHOLDER_SCORE.to_string(),
            ssd_score: PLACEHOLDER_SCORE.to_string(),
            ram_score: PLACEHOLDER_SCORE.to_string(),
            network_score: PLACEHOLDER_SCORE.to_string(),
            hardware_health_score: PLACEHOLDER_SCORE.to_string(),
            total_score: PLACEHOLDER_TOTAL_SCORE.to_string(),
            average_score: PLACEHOLDER_SCORE.to_string(),
        }
    }

    pub fn average(&self) -> Option<f64> {
        de::parse_number(&self.average_score)
    }
}

/// A physical facility as the service describes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacilityRecord {
    #[serde(default, deserialize_with = "de::int")]
    pub id: i64,
    #[serde(default, deserialize_with = "de::string")]
    pub nanodc_id: String,
    #[serde(default, deserialize_with = "de::string")]
    pub name: String,
    #[serde(default, deserialize_with = "de::string")]
    pub country: String,
    #[serde(default, deserialize_with = "de::string")]
    pub address: String,
    #[serde(default, deserialize_with = "de::string")]
    pub ip: String,
    #[serde(default, deserialize_with = "de::string")]
    pub latitude: String,
    /// The service spells this key `longtitude`.
    #[serde(default, rename = "longtitude", alias = "longitude", deserialize_with = "de::string")]
    pub longitude: String,
}

/// One token transfer credited to a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    #[serde(default, deserialize_with = "de::int")]
    pub id: i64,
    #[serde(deserialize_with = "de::string")]
    pub node_id: NodeId,
    #[serde(default, deserialize_with = "de::string")]
    pub from: String,
    #[serde(default, deserialize_with = "de::string")]
    pub to: String,
    #[serde(default, deserialize_with = "de::string")]
    pub amount: String,
    #[serde(default, deserialize_with = "de::string")]
    pub tx_hash: String,
    #[serde(default, deserialize_with = "de::string")]
    pub date: String,
}

/// Aggregate of a node's ledger transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LedgerSummary {
    pub transaction_count: usize,
    pub total_amount: f64,
}

// ---------------------------------------------------------------------------
// Lenient decoding
// ---------------------------------------------------------------------------

/// Deserializers that accept strings, numbers, or `null` for scalar fields.
pub mod de {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Parse a decimal string, rejecting NaN and infinities.
    pub fn parse_number(raw: &str) -> Option<f64> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
            return None;
        }
        trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
    }

    fn value_to_string(value: Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => Some(other.to_string()),
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(value_to_string(Value::deserialize(deserializer)?).unwrap_or_default())
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        Ok(Option::<Value>::deserialize(deserializer)?.and_then(value_to_string))
    }

    pub fn int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Number(n) => n.as_i64().unwrap_or_default(),
            Value::String(s) => s.trim().parse().unwrap_or_default(),
            _ => 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "hardware_specs": [
            {"id": 1, "node_id": "n1", "cpu_model": "EPYC", "cpucores": "64",
             "storage_total_gb": "2000", "total_harddisk_gb": null, "nanodc_id": "dc"}
        ],
        "nodes": [
            {"id": 1, "node_id": "n1", "user_uuid": "u", "status": "active",
             "create_at": "2024-01-01", "update_at": "2024-01-02",
             "node_name": "BC02 NAS1", "nanodc_id": "dc"},
            {"id": 2, "node_id": "n2", "status": "PRE", "node_name": "BC02 Post Worker"}
        ],
        "scores": [{"id": 1, "node_id": "n1", "average_score": 71.5}],
        "ndpListFiltered": [
            {"id": 1, "node_id": "n1", "amount": "1.5", "tx_hash": "0x1"},
            {"id": 2, "node_id": "n1", "amount": "oops", "tx_hash": "0x2"}
        ],
        "nanodc": [{"id": 1, "nanodc_id": "dc", "name": "Busan", "longtitude": "129.0"}],
        "node_usage": [
            {"id": 1, "node_id": "n1", "timestamp": "2024-01-01T00:00:00", "cpu_usage_percent": "10"},
            {"id": 2, "node_id": "n1", "timestamp": "2024-01-01T00:05:00", "cpu_usage_percent": 57.3,
             "mem_usage_percent": null}
        ]
    }"#;

    #[test]
    fn decodes_service_payload() {
        let snapshot = Snapshot::from_json(BODY).unwrap().unwrap();

        assert_eq!(snapshot.nodes.len(), 2);
        assert_eq!(snapshot.nodes[0].status, NodeStatus::Active);
        assert_eq!(snapshot.nodes[1].status, NodeStatus::Pre);
        assert_eq!(snapshot.hardware_specs[0].cpu_cores, "64");
        assert_eq!(snapshot.scores[0].average_score, "71.5");
        assert_eq!(snapshot.facilities[0].longitude, "129.0");
        assert_eq!(snapshot.ledger.len(), 2);
    }

    #[test]
    fn decodes_unfiltered_score_and_ledger_keys() {
        let body = r#"{
            "nodes": [{"node_id": "n1", "node_name": "BC02 NAS1"}],
            "all_scores": [{"node_id": "n1", "total_score": "412.5"}],
            "ndp_list": [{"node_id": "n1", "amount": "3.25", "tx_hash": "0xa"}]
        }"#;
        let snapshot = Snapshot::from_json(body).unwrap().unwrap();

        assert_eq!(snapshot.scores.len(), 1);
        assert_eq!(snapshot.facility_score().total_score, "412.5");
        assert_eq!(snapshot.ledger_summary("n1").transaction_count, 1);
    }

    #[test]
    fn empty_body_is_none() {
        assert!(Snapshot::from_json("  \n").unwrap().is_none());
    }

    #[test]
    fn latest_usage_prefers_newest_timestamp() {
        let snapshot = Snapshot::from_json(BODY).unwrap().unwrap();
        let usage = snapshot.latest_usage_for("n1").unwrap();

        assert_eq!(usage.id, 2);
        assert_eq!(usage.cpu_usage_percent.as_deref(), Some("57.3"));
        assert_eq!(usage.mem_usage_percent, None);
        assert!(snapshot.latest_usage_for("n2").is_none());
    }

    #[test]
    fn ledger_summary_skips_unparseable_amounts() {
        let snapshot = Snapshot::from_json(BODY).unwrap().unwrap();
        let summary = snapshot.ledger_summary("n1");

        assert_eq!(summary.transaction_count, 2);
        assert!((summary.total_amount - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn facility_score_falls_back_to_placeholder() {
        let score = Snapshot::default().facility_score();

        assert_eq!(score.cpu_score, PLACEHOLDER_SCORE);
        assert_eq!(score.total_score, PLACEHOLDER_TOTAL_SCORE);
    }

    #[test]
    fn total_storage_falls_back_to_storage_total() {
        let snapshot = Snapshot::from_json(BODY).unwrap().unwrap();
        let spec = snapshot.hardware_for("n1").unwrap();

        assert_eq!(spec.total_storage_gb(), Some(2000.0));
    }

    #[test]
    fn unknown_status_is_preserved() {
        let status = NodeStatus::from("maintenance".to_string());
        assert_eq!(status, NodeStatus::Other("maintenance".to_string()));
        assert_eq!(String::from(status), "maintenance");
    }
}
