use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dialogue::{CompletedRecord, RecordType};
use crate::errors::BackendError;

use super::{Backend, BackendResult, Credentials, Identity};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Hosted backend speaking the Supabase auth and REST endpoints.
#[derive(Clone)]
pub struct RemoteBackend {
    client: Client,
    base_url: String,
    anon_key: String,
}

#[derive(Debug, Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: String,
    email: Option<String>,
}

/// Sign-up answers either with a session wrapping `user` or with the user itself.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    User(UserPayload),
    Session { user: Option<UserPayload> },
}

#[derive(Debug, Serialize)]
struct InsertRow<'a> {
    user_id: &'a str,
    amount: f64,
    category: &'a str,
    created_at: String,
}

impl RemoteBackend {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        }
    }

    pub fn table_for(record_type: RecordType) -> &'static str {
        match record_type {
            RecordType::Expense => "expenses",
            RecordType::Goal => "goals",
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
            .timeout(REQUEST_TIMEOUT)
    }

    async fn check(response: Response) -> BackendResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        warn!(status = status.as_u16(), %message, "backend rejected request");
        Err(BackendError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl Backend for RemoteBackend {
    async fn authenticate(&self, credentials: &Credentials) -> BackendResult<Identity> {
        let url = format!("{}/auth/v1/signup", self.base_url);
        let request = self.authorized(self.client.post(&url)).json(&SignUpRequest {
            email: &credentials.email,
            password: &credentials.password,
        });
        let response = Self::check(request.send().await?).await?;
        let user = match response.json::<SignUpResponse>().await? {
            SignUpResponse::User(user) => user,
            SignUpResponse::Session { user } => user.ok_or(BackendError::MissingIdentity)?,
        };
        info!(user = %user.id, "sign-up succeeded");
        Ok(Identity {
            id: user.id,
            email: user.email.unwrap_or_else(|| credentials.email.clone()),
        })
    }

    async fn persist(&self, owner: &Identity, record: &CompletedRecord) -> BackendResult<()> {
        let table = Self::table_for(record.record_type);
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        let rows = [InsertRow {
            user_id: &owner.id,
            amount: record.amount,
            category: &record.category,
            created_at: Utc::now().to_rfc3339(),
        }];
        let request = self
            .authorized(self.client.post(&url))
            .header("Prefer", "return=minimal")
            .json(&rows);
        Self::check(request.send().await?).await?;
        info!(user = %owner.id, table, "record stored");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
