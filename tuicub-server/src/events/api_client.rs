//! The HTTP client notifying the API about disconnected users.

use uuid::Uuid;

/// Posts disconnect callbacks to the API process, authenticated with the
/// events secret.
pub struct EventsApiClient {
    api_url: String,
    token: String,
    client: reqwest::Client,
}

impl EventsApiClient {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            token: token.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Sends `POST /gamerooms/disconnect` for the user.
    pub async fn notify_user_disconnected(&self, user_id: Uuid) -> Result<(), reqwest::Error> {
        self.client
            .post(format!("{}/gamerooms/disconnect", self.api_url))
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&serde_json::json!({ "user_id": user_id }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
