//! Dashboard slot kinds and descriptors.
//!
//! A slot is one fixed tile in a facility's dashboard. Its [`SlotKind`]
//! says what the tile depicts; its ordinal says where it sits. Ordinals are
//! the stable identity that override tables and the rendering layer key on,
//! so they never change once a slot is published.

use serde::{Deserialize, Serialize};

/// What a dashboard tile depicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotKind {
    NdpInfo,
    NodeInfo,
    NodeInfoAethir,
    #[serde(rename = "SWITCH_100G")]
    Switch100G,
    NodeMiner,
    PostWorker,
    LonovoPost,
    Supra,
    #[serde(rename = "SUPRA_NONE_1")]
    SupraNone1,
    #[serde(rename = "SUPRA_NONE_2")]
    SupraNone2,
    #[serde(rename = "SUPRA_NONE_3")]
    SupraNone3,
    #[serde(rename = "SYSTEMTOAI")]
    SystemToAi,
    #[serde(rename = "SYSTEMTOAI_NONE")]
    SystemToAiNone,
    Aethir,
    AethirNone,
    Filecoin,
    #[serde(rename = "FILECOIN_NONE_1")]
    FilecoinNone1,
    #[serde(rename = "FILECOIN_NONE_2")]
    FilecoinNone2,
    NotStorage,
    #[serde(rename = "STORAGE_1")]
    Storage1,
    #[serde(rename = "STORAGE_2")]
    Storage2,
    #[serde(rename = "STORAGE_3")]
    Storage3,
    #[serde(rename = "STORAGE_4")]
    Storage4,
    #[serde(rename = "STORAGE_5")]
    Storage5,
    #[serde(rename = "STORAGE_6")]
    Storage6,
    #[serde(rename = "STORAGE2_NONE")]
    Storage2None,
    UpsController,
    LogoZetacube,
}

impl SlotKind {
    /// Human-readable tile label.
    pub fn label(self) -> &'static str {
        match self {
            SlotKind::NdpInfo => "NDP Info",
            SlotKind::NodeInfo => "Node Info",
            SlotKind::NodeInfoAethir => "Aethir Node Info",
            SlotKind::Switch100G => "100G Switch",
            SlotKind::NodeMiner => "Node Miner",
            SlotKind::PostWorker => "Post Worker",
            SlotKind::LonovoPost => "Lenovo Post Worker",
            SlotKind::Supra => "Supra",
            SlotKind::SupraNone1 | SlotKind::SupraNone2 | SlotKind::SupraNone3 => {
                "Supra (inactive)"
            }
            SlotKind::SystemToAi => "SystemToAI",
            SlotKind::SystemToAiNone => "SystemToAI (inactive)",
            SlotKind::Aethir => "Aethir",
            SlotKind::AethirNone => "Aethir (inactive)",
            SlotKind::Filecoin => "Filecoin",
            SlotKind::FilecoinNone1 | SlotKind::FilecoinNone2 => "Filecoin (inactive)",
            SlotKind::NotStorage => "Filecoin Node",
            SlotKind::Storage1 => "Storage 1",
            SlotKind::Storage2 => "Storage 2",
            SlotKind::Storage3 => "Storage 3",
            SlotKind::Storage4 => "Storage 4",
            SlotKind::Storage5 => "Storage 5",
            SlotKind::Storage6 => "Storage 6",
            SlotKind::Storage2None => "Storage 2 (inactive)",
            SlotKind::UpsController => "UPS Controller",
            SlotKind::LogoZetacube => "ZetaCube",
        }
    }

    /// Node-name substring the generic mapping rule looks for.
    ///
    /// `None` for summary, decorative and inactive tiles; those never bind
    /// a node.
    pub fn node_keyword(self) -> Option<&'static str> {
        match self {
            SlotKind::NodeMiner | SlotKind::Filecoin | SlotKind::NotStorage => Some("Filecoin"),
            SlotKind::PostWorker => Some("PostWorker"),
            SlotKind::LonovoPost => Some("Post"),
            SlotKind::Supra => Some("Supra"),
            SlotKind::SystemToAi => Some("SystemToAI"),
            SlotKind::Aethir => Some("Aethir"),
            SlotKind::Storage1
            | SlotKind::Storage2
            | SlotKind::Storage3
            | SlotKind::Storage4
            | SlotKind::Storage5
            | SlotKind::Storage6 => Some("NAS"),
            _ => None,
        }
    }

    /// Whether the tile opens a detail view when selected.
    pub fn is_interactive(self) -> bool {
        !matches!(
            self,
            SlotKind::SupraNone1
                | SlotKind::SupraNone2
                | SlotKind::SupraNone3
                | SlotKind::SystemToAiNone
                | SlotKind::AethirNone
                | SlotKind::FilecoinNone1
                | SlotKind::FilecoinNone2
                | SlotKind::Storage2None
                | SlotKind::Switch100G
                | SlotKind::UpsController
        )
    }

    /// The logo tile doubles as the entry point to operator settings.
    pub fn is_admin(self) -> bool {
        self == SlotKind::LogoZetacube
    }
}

/// One positioned tile in a facility layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotDescriptor {
    pub kind: SlotKind,
    pub ordinal: u32,
}

impl SlotDescriptor {
    pub fn new(kind: SlotKind, ordinal: u32) -> Self {
        Self { kind, ordinal }
    }
}

/// Build descriptors numbered by position.
pub fn numbered(kinds: &[SlotKind]) -> Vec<SlotDescriptor> {
    kinds
        .iter()
        .zip(0u32..)
        .map(|(kind, ordinal)| SlotDescriptor::new(*kind, ordinal))
        .collect()
}
