//! User profile domain types

use serde::{Deserialize, Serialize};

/// Signed-in user's profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Ids of the units this user manages
    #[serde(default)]
    pub units: Vec<String>,
}

/// Request DTO for updating the profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}
