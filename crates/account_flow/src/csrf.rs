use std::fmt;

use reqwest::header::HeaderValue;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CsrfTokenError {
    #[error("cookie '{0}' not present")]
    MissingCookie(String),
    #[error("anti-forgery token is empty")]
    Empty,
    #[error("anti-forgery token is not a valid header value")]
    InvalidHeaderValue,
}

/// Per-session anti-forgery token sent as `X-CSRFToken` on every mutation.
#[derive(Clone, PartialEq, Eq)]
pub struct CsrfToken(String);

impl CsrfToken {
    pub fn new(token: impl Into<String>) -> Result<Self, CsrfTokenError> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(CsrfTokenError::Empty);
        }
        HeaderValue::from_str(&token).map_err(|_| CsrfTokenError::InvalidHeaderValue)?;
        Ok(Self(token))
    }

    /// Pulls the token out of a raw `Cookie` header such as `a=1; csrftoken=abc`.
    pub fn from_cookie_header(header: &str, cookie_name: &str) -> Result<Self, CsrfTokenError> {
        let value = header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| name.trim() == cookie_name)
            .map(|(_, value)| value.trim().trim_matches('"'))
            .ok_or_else(|| CsrfTokenError::MissingCookie(cookie_name.to_string()))?;
        Self::new(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keep the token out of logs.
impl fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CsrfToken(..)")
    }
}
