use serde::{Deserialize, Serialize};

/// Internal staff member who can own candidates and companies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    /// Slack member id used as the direct-message channel.
    #[serde(default)]
    pub slack_id: Option<String>,
}

impl User {
    pub fn notification_channel(&self) -> Option<&str> {
        self.slack_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }
}
