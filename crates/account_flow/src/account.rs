use reqwest::Client;
use shared::{
    domain::{AccountFields, AccountKind},
    error::AccountFailure,
    protocol::CSRF_HEADER,
};
use tokio::sync::broadcast;
use tracing::{info, warn};
use url::Url;

use crate::csrf::CsrfToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountEvent {
    Synced { kind: AccountKind },
    Error {
        kind: AccountKind,
        failure: AccountFailure,
    },
}

/// One login or registration form, bound to the endpoint it posts to.
pub struct AccountActionModel {
    http: Client,
    kind: AccountKind,
    endpoint: Url,
    csrf_token: CsrfToken,
    events: broadcast::Sender<AccountEvent>,
}

impl AccountActionModel {
    pub fn new(http: Client, kind: AccountKind, endpoint: Url, csrf_token: CsrfToken) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            http,
            kind,
            endpoint,
            csrf_token,
            events,
        }
    }

    pub fn login(http: Client, endpoint: Url, csrf_token: CsrfToken) -> Self {
        Self::new(http, AccountKind::Login, endpoint, csrf_token)
    }

    pub fn register(http: Client, endpoint: Url, csrf_token: CsrfToken) -> Self {
        Self::new(http, AccountKind::Register, endpoint, csrf_token)
    }

    pub fn kind(&self) -> AccountKind {
        self.kind
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<AccountEvent> {
        self.events.subscribe()
    }

    /// Posts the form once. `fields` are laid over the form defaults for this
    /// kind of account action and sent form-encoded.
    pub async fn submit(&self, fields: &AccountFields) -> Result<(), AccountFailure> {
        let payload = self.kind.default_fields().merged(fields.clone());
        let result = self.post(&payload).await;

        match &result {
            Ok(()) => {
                info!(kind = self.kind.as_str(), endpoint = %self.endpoint, "account action succeeded");
                let _ = self.events.send(AccountEvent::Synced { kind: self.kind });
            }
            Err(failure) => {
                warn!(
                    kind = self.kind.as_str(),
                    endpoint = %self.endpoint,
                    status = ?failure.status,
                    error = %failure,
                    "account action failed"
                );
                let _ = self.events.send(AccountEvent::Error {
                    kind: self.kind,
                    failure: failure.clone(),
                });
            }
        }

        result
    }

    async fn post(&self, payload: &AccountFields) -> Result<(), AccountFailure> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CSRF_HEADER, self.csrf_token.as_str())
            .form(&payload.to_form_pairs())
            .send()
            .await
            .map_err(|err| AccountFailure::transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                warn!(
                    kind = self.kind.as_str(),
                    status = status.as_u16(),
                    error = %err,
                    "failed to read account rejection body"
                );
                String::new()
            }
        };
        Err(AccountFailure::rejected(status.as_u16(), body))
    }
}

#[cfg(test)]
#[path = "tests/account_tests.rs"]
mod tests;
