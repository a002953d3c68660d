use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub assigned_user_id: Option<String>,
}

impl Candidate {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name).trim().to_string()
    }
}
