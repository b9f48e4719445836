//! In-process stand-in for the LMS account and enrollment endpoints.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode, Uri},
    routing::post,
    Router,
};
use shared::domain::AccountKind;
use tokio::{net::TcpListener, sync::Mutex};
use url::Url;

use crate::{
    AccountActionModel, CsrfToken, EnrollmentClient, Navigator, Orchestrator, PortalRoutes,
    QueryContext, RedirectDecision, RedirectResolver,
};

pub(crate) const TEST_TOKEN: &str = "test-csrf-token";
pub(crate) const PAGE_ORIGIN: &str = "https://lms.example.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedRequest {
    pub path: String,
    pub csrf_token: Option<String>,
    pub form: Vec<(String, String)>,
    pub raw_body: String,
}

impl RecordedRequest {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PortalBehavior {
    pub account_status: StatusCode,
    pub account_body: String,
    pub enrollment_status: StatusCode,
    pub enrollment_body: String,
    pub enrollment_delay: Duration,
}

impl Default for PortalBehavior {
    fn default() -> Self {
        Self {
            account_status: StatusCode::OK,
            account_body: "{}".into(),
            enrollment_status: StatusCode::OK,
            enrollment_body: "{}".into(),
            enrollment_delay: Duration::ZERO,
        }
    }
}

impl PortalBehavior {
    pub fn account(mut self, status: StatusCode, body: &str) -> Self {
        self.account_status = status;
        self.account_body = body.to_string();
        self
    }

    pub fn enrollment(mut self, status: StatusCode, body: &str) -> Self {
        self.enrollment_status = status;
        self.enrollment_body = body.to_string();
        self
    }

    pub fn enrollment_delay(mut self, delay: Duration) -> Self {
        self.enrollment_delay = delay;
        self
    }
}

#[derive(Clone)]
struct PortalState {
    behavior: Arc<PortalBehavior>,
    timeline: Arc<Mutex<Vec<String>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl PortalState {
    async fn record(&self, uri: &Uri, headers: &HeaderMap, body: String) {
        let path = uri.path().to_string();
        self.timeline.lock().await.push(format!("POST {path}"));
        self.requests.lock().await.push(RecordedRequest {
            path,
            csrf_token: headers
                .get("x-csrftoken")
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
            form: url::form_urlencoded::parse(body.as_bytes())
                .into_owned()
                .collect(),
            raw_body: body,
        });
    }
}

#[derive(Clone)]
pub(crate) struct MockPortal {
    pub base_url: Url,
    pub timeline: Arc<Mutex<Vec<String>>>,
    pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockPortal {
    pub fn endpoint(&self, path: &str) -> Url {
        self.base_url.join(path).expect("endpoint url")
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn timeline(&self) -> Vec<String> {
        self.timeline.lock().await.clone()
    }
}

async fn handle_account(
    State(state): State<PortalState>,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    state.record(&uri, &headers, body).await;
    (
        state.behavior.account_status,
        state.behavior.account_body.clone(),
    )
}

async fn handle_enrollment(
    State(state): State<PortalState>,
    Path(_course_key): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    state.record(&uri, &headers, body).await;
    if !state.behavior.enrollment_delay.is_zero() {
        tokio::time::sleep(state.behavior.enrollment_delay).await;
        state
            .timeline
            .lock()
            .await
            .push(format!("answered {}", uri.path()));
    }
    (
        state.behavior.enrollment_status,
        state.behavior.enrollment_body.clone(),
    )
}

pub(crate) async fn spawn_portal(behavior: PortalBehavior) -> MockPortal {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = PortalState {
        behavior: Arc::new(behavior),
        timeline: Arc::new(Mutex::new(Vec::new())),
        requests: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route("/login", post(handle_account))
        .route("/register", post(handle_account))
        .route("/enrollment/v0/course/:course_key", post(handle_enrollment))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockPortal {
        base_url: Url::parse(&format!("http://{addr}/")).expect("base url"),
        timeline: state.timeline,
        requests: state.requests,
    }
}

pub(crate) struct RecordingNavigator {
    timeline: Arc<Mutex<Vec<String>>>,
    pub destinations: Arc<Mutex<Vec<String>>>,
}

impl RecordingNavigator {
    pub fn new(portal: &MockPortal) -> Self {
        Self {
            timeline: portal.timeline.clone(),
            destinations: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Navigator for RecordingNavigator {
    async fn navigate(&self, destination: &RedirectDecision) -> anyhow::Result<()> {
        self.timeline
            .lock()
            .await
            .push(format!("navigate {destination}"));
        self.destinations
            .lock()
            .await
            .push(destination.to_string());
        Ok(())
    }
}

pub(crate) struct FailingNavigator;

#[async_trait]
impl Navigator for FailingNavigator {
    async fn navigate(&self, _destination: &RedirectDecision) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("window already closed"))
    }
}

pub(crate) fn csrf() -> CsrfToken {
    CsrfToken::new(TEST_TOKEN).expect("token")
}

pub(crate) fn page(query: &str) -> QueryContext {
    QueryContext::from_page_url(&format!("{PAGE_ORIGIN}/login{query}")).expect("page url")
}

pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    crate::build_http_client(timeout).expect("http client")
}

pub(crate) fn account_model(portal: &MockPortal, kind: AccountKind) -> AccountActionModel {
    let path = match kind {
        AccountKind::Login => "/login",
        AccountKind::Register => "/register",
    };
    AccountActionModel::new(
        http_client(crate::DEFAULT_REQUEST_TIMEOUT),
        kind,
        portal.endpoint(path),
        csrf(),
    )
}

pub(crate) fn enrollment_client(portal: &MockPortal, timeout: Duration) -> EnrollmentClient {
    EnrollmentClient::new(
        http_client(timeout),
        portal.base_url.clone(),
        PortalRoutes::default(),
        csrf(),
    )
}

pub(crate) fn orchestrator(
    portal: &MockPortal,
    kind: AccountKind,
    navigator: Arc<dyn Navigator>,
) -> Orchestrator {
    Orchestrator::new(
        account_model(portal, kind),
        enrollment_client(portal, crate::DEFAULT_REQUEST_TIMEOUT),
        RedirectResolver::default(),
        navigator,
    )
}
