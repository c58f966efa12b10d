// REST collaborators: contact snapshot, message history and message sends.
// All calls carry the session's bearer token. Failures surface as errors for
// the caller to recover from; nothing here retries.

use anyhow::{anyhow, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

use super::events::ChatError;
use crate::models::{Contact, Message};

/// User record as the auth service returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile_photo: Option<String>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_message_read: Option<bool>,
}

impl UserRecord {
    pub fn into_contact(self) -> Contact {
        let display_name = format!("{} {}", self.first_name, self.last_name);
        let mut contact = Contact::new(self.id, display_name.trim(), self.profile_photo);
        contact.last_message_preview = self.last_message;
        contact.unread = matches!(self.last_message_read, Some(false));
        contact
    }
}

#[derive(Debug, Serialize)]
struct SendMessageBody<'a> {
    sender_id: i64,
    receiver_id: i64,
    content: &'a str,
}

#[derive(Clone)]
pub struct RestApi {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

impl RestApi {
    pub fn new(base_url: &str, token: &str) -> Self {
        RestApi {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Fetch the full contact snapshot, excluding the signed-in user's own
    /// record.
    pub async fn fetch_contacts(&self, own_user_id: i64) -> Result<Vec<Contact>> {
        let url = format!("{}/auth/users", self.base_url);
        let res = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ChatError::TransportFailure(e.to_string()))?;
        if !res.status().is_success() {
            return Err(anyhow!("contact list request failed: {}", res.status()));
        }
        let users: Vec<UserRecord> = res.json().await?;
        debug!("Fetched {} user records", users.len());
        Ok(users
            .into_iter()
            .filter(|u| u.id != own_user_id)
            .map(UserRecord::into_contact)
            .collect())
    }

    /// Fetch the message history shared with one peer.
    pub async fn fetch_history(&self, peer_id: i64) -> Result<Vec<Message>> {
        let url = format!("{}/chat/history/{}", self.base_url, peer_id);
        let res = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ChatError::TransportFailure(e.to_string()))?;
        if !res.status().is_success() {
            return Err(anyhow!("history request failed: {}", res.status()));
        }
        let history: Vec<Message> = res.json().await?;
        Ok(history)
    }

    /// Submit a new message and return the server-confirmed record, carrying
    /// the server-assigned id and timestamp.
    pub async fn send_message(
        &self,
        sender_id: i64,
        receiver_id: i64,
        content: &str,
    ) -> Result<Message> {
        let url = format!("{}/chat/send", self.base_url);
        let body = SendMessageBody {
            sender_id,
            receiver_id,
            content,
        };
        let res = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::TransportFailure(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let detail = res.text().await.unwrap_or_default();
            error!("Message send rejected with {}: {}", status, detail);
            return Err(anyhow!("send request failed: {}", status));
        }
        let message: Message = res.json().await?;
        Ok(message)
    }
}
