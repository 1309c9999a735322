use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelStatus {
    Free,
    InInterview,
    Break,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelistType {
    PanelMember,
    Manager,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub skill_set: Vec<String>,
    pub current_status: PanelStatus,
    pub panelist_type: PanelistType,
}

impl Panel {
    pub fn is_free_manager(&self) -> bool {
        self.panelist_type == PanelistType::Manager && self.current_status == PanelStatus::Free
    }
}
