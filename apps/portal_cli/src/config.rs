use std::{fs, path::Path, time::Duration};

use account_flow::PortalRoutes;
use anyhow::Context;
use shared::protocol::{DEFAULT_CSRF_COOKIE, DEFAULT_DASHBOARD_PATH};
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "portal.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub login_path: String,
    pub registration_path: String,
    pub dashboard_path: String,
    pub request_timeout_seconds: u64,
    pub csrf_cookie_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            login_path: "/user_api/v1/account/login_session/".into(),
            registration_path: "/user_api/v1/account/registration/".into(),
            dashboard_path: DEFAULT_DASHBOARD_PATH.into(),
            request_timeout_seconds: 10,
            csrf_cookie_name: DEFAULT_CSRF_COOKIE.into(),
        }
    }
}

impl Settings {
    pub fn base_url(&self) -> anyhow::Result<Url> {
        Url::parse(&self.base_url).with_context(|| format!("invalid base url '{}'", self.base_url))
    }

    pub fn endpoint(&self, path: &str) -> anyhow::Result<Url> {
        self.base_url()?
            .join(path)
            .with_context(|| format!("invalid endpoint path '{path}'"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn routes(&self) -> PortalRoutes {
        PortalRoutes {
            dashboard_path: self.dashboard_path.clone(),
            ..PortalRoutes::default()
        }
    }
}

pub fn load_settings(config_file: &Path) -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string(config_file) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

pub(crate) fn apply_file(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = raw.parse::<toml::Table>() else {
        return;
    };
    let text = |key: &str| file_cfg.get(key).and_then(toml::Value::as_str);

    if let Some(v) = text("base_url") {
        settings.base_url = v.to_string();
    }
    if let Some(v) = text("login_path") {
        settings.login_path = v.to_string();
    }
    if let Some(v) = text("registration_path") {
        settings.registration_path = v.to_string();
    }
    if let Some(v) = text("dashboard_path") {
        settings.dashboard_path = v.to_string();
    }
    let timeout = match file_cfg.get("request_timeout_seconds") {
        Some(toml::Value::Integer(secs)) => u64::try_from(*secs).ok().filter(|secs| *secs > 0),
        Some(toml::Value::String(raw)) => parse_timeout(raw),
        _ => None,
    };
    if let Some(parsed) = timeout {
        settings.request_timeout_seconds = parsed;
    }
    if let Some(v) = text("csrf_cookie_name") {
        settings.csrf_cookie_name = v.to_string();
    }
}

pub(crate) fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("PORTAL_BASE_URL") {
        settings.base_url = v;
    }
    if let Some(v) = lookup("APP__BASE_URL") {
        settings.base_url = v;
    }

    if let Some(v) = lookup("APP__LOGIN_PATH") {
        settings.login_path = v;
    }
    if let Some(v) = lookup("APP__REGISTRATION_PATH") {
        settings.registration_path = v;
    }
    if let Some(v) = lookup("APP__DASHBOARD_PATH") {
        settings.dashboard_path = v;
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECONDS") {
        if let Some(parsed) = parse_timeout(&v) {
            settings.request_timeout_seconds = parsed;
        }
    }

    if let Some(v) = lookup("APP__CSRF_COOKIE_NAME") {
        settings.csrf_cookie_name = v;
    }
}

fn parse_timeout(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|secs| *secs > 0)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
