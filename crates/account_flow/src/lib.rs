use std::time::Duration;

use reqwest::Client;

pub mod account;
pub mod csrf;
pub mod enrollment;
pub mod orchestrator;
pub mod query;
pub mod redirect;

pub use account::{AccountActionModel, AccountEvent};
pub use csrf::{CsrfToken, CsrfTokenError};
pub use enrollment::{EnrollmentClient, EnrollmentOutcome};
pub use orchestrator::{
    Navigator, Orchestrator, SubmissionError, SubmissionReport, SubmissionState,
};
pub use query::{EnrollmentRequest, QueryContext, QueryError};
pub use redirect::{PortalRoutes, RedirectDecision, RedirectResolver};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client shared by the account and enrollment calls. A request that
/// outlives `timeout` fails like any other transport error.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder().timeout(timeout).build()
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
