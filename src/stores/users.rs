use parking_lot::RwLock;
use tracing::info;

use crate::domain::{UpdateProfileRequest, UserProfile};
use crate::error::ApiResult;
use crate::services::ApiClient;

/// Signed-in user's profile.
pub struct UserStore {
    client: ApiClient,
    profile: RwLock<Option<UserProfile>>,
}

impl UserStore {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            profile: RwLock::new(None),
        }
    }

    pub async fn load(&self) -> ApiResult<UserProfile> {
        let profile = self.client.current_user().await?;
        info!(user_id = %profile.id, "User profile loaded");
        *self.profile.write() = Some(profile.clone());
        Ok(profile)
    }

    pub async fn update(&self, update: &UpdateProfileRequest) -> ApiResult<UserProfile> {
        let profile = self.client.update_profile(update).await?;
        *self.profile.write() = Some(profile.clone());
        Ok(profile)
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.profile.read().clone()
    }

    pub fn user_id(&self) -> Option<String> {
        self.profile.read().as_ref().map(|p| p.id.clone())
    }

    /// Forget the profile, e.g. on sign-out.
    pub fn clear(&self) {
        *self.profile.write() = None;
    }
}
