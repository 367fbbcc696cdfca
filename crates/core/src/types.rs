/// Node identifiers are opaque strings assigned by the remote service.
pub type NodeId = String;

/// Facility identifiers such as `BC01`. Compared case-insensitively.
pub type FacilityId = String;

/// All locally produced timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
