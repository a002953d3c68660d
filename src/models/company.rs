use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompanyStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub name: String,
    #[serde(default)]
    pub website: Option<String>,
    pub status: CompanyStatus,
    pub is_public: bool,
    #[serde(default)]
    pub assigned_user_id: Option<String>,
}

impl Company {
    /// Jobs of this company may appear in the public feed.
    pub fn is_publishable(&self) -> bool {
        self.is_public && self.status == CompanyStatus::Active
    }
}
