use std::fmt;

use shared::{
    domain::CourseKey,
    protocol::{DEFAULT_DASHBOARD_PATH, ENROLLMENT_COURSE_PATH, TRACK_SELECTION_PATH},
};
use url::Url;

use crate::{enrollment::EnrollmentOutcome, query::QueryContext};

/// Site paths the account flow talks to or sends the browser to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalRoutes {
    pub dashboard_path: String,
    pub enrollment_course_path: String,
    pub track_selection_path: String,
}

impl Default for PortalRoutes {
    fn default() -> Self {
        Self {
            dashboard_path: DEFAULT_DASHBOARD_PATH.into(),
            enrollment_course_path: ENROLLMENT_COURSE_PATH.into(),
            track_selection_path: TRACK_SELECTION_PATH.into(),
        }
    }
}

impl PortalRoutes {
    /// Track-selection path for `course_key`, with the key encoded as a single
    /// path segment.
    pub fn track_selection(&self, page: &Url, course_key: &CourseKey) -> String {
        match url_with_segment(page, &self.track_selection_path, course_key.as_str()) {
            Some(url) => url.path().to_string(),
            None => format!("{}{}", self.track_selection_path, course_key),
        }
    }
}

/// Joins `path` onto `base` and appends `segment` percent-encoded as one path
/// segment.
pub(crate) fn url_with_segment(base: &Url, path: &str, segment: &str) -> Option<Url> {
    let mut url = base.join(path).ok()?;
    url.path_segments_mut().ok()?.pop_if_empty().push(segment);
    Some(url)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectDecision(String);

impl RedirectDecision {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RedirectDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RedirectResolver {
    routes: PortalRoutes,
}

impl RedirectResolver {
    pub fn new(routes: PortalRoutes) -> Self {
        Self { routes }
    }

    /// Picks where the browser goes once the account action succeeded.
    ///
    /// A denied enrollment always goes through track selection, even when the
    /// page carries a `next` target. Otherwise an internal `next` wins over the
    /// dashboard. Enrollment success never changes the destination.
    pub fn resolve(
        &self,
        query: &QueryContext,
        enrollment: Option<&EnrollmentOutcome>,
    ) -> RedirectDecision {
        if let Some(EnrollmentOutcome::Denied { course_key, .. }) = enrollment {
            return RedirectDecision(self.routes.track_selection(query.page(), course_key));
        }

        match query.next().map(str::trim) {
            Some(next) if !next.is_empty() && is_internal(query.page(), next) => {
                RedirectDecision(next.to_string())
            }
            _ => RedirectDecision(self.routes.dashboard_path.clone()),
        }
    }
}

/// True when `target`, resolved against the current page, stays on the
/// page's origin.
pub fn is_internal(page: &Url, target: &str) -> bool {
    match page.join(target) {
        Ok(resolved) => resolved.origin() == page.origin(),
        Err(_) => false,
    }
}

#[cfg(test)]
#[path = "tests/redirect_tests.rs"]
mod tests;
