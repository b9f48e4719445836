use reqwest::{Client, StatusCode};
use shared::{
    domain::{has_mode, CourseKey, CourseMode},
    protocol::{EnrollmentErrorBody, CSRF_HEADER, PROFESSIONAL_MODE_SLUG},
};
use tracing::{info, warn};
use url::Url;

use crate::{
    csrf::CsrfToken,
    redirect::{url_with_segment, PortalRoutes},
};

#[derive(Debug, Clone, PartialEq)]
pub enum EnrollmentOutcome {
    Enrolled,
    /// No free enrollment path; the learner has to pick a paid track.
    Denied {
        course_key: CourseKey,
        course_modes: Vec<CourseMode>,
    },
    OtherFailure,
}

pub struct EnrollmentClient {
    http: Client,
    base_url: Url,
    routes: PortalRoutes,
    csrf_token: CsrfToken,
}

impl EnrollmentClient {
    pub fn new(http: Client, base_url: Url, routes: PortalRoutes, csrf_token: CsrfToken) -> Self {
        Self {
            http,
            base_url,
            routes,
            csrf_token,
        }
    }

    pub fn enrollment_url(&self, course_key: &CourseKey) -> Option<Url> {
        url_with_segment(
            &self.base_url,
            &self.routes.enrollment_course_path,
            course_key.as_str(),
        )
    }

    /// Makes one enrollment attempt. Every failure comes back as an outcome
    /// value; nothing here is retried.
    pub async fn enroll(&self, course_key: &CourseKey) -> EnrollmentOutcome {
        let Some(url) = self.enrollment_url(course_key) else {
            warn!(%course_key, base_url = %self.base_url, "cannot build enrollment url");
            return EnrollmentOutcome::OtherFailure;
        };

        info!(%course_key, endpoint = %url, "enrolling student in course");
        let response = match self
            .http
            .post(url)
            .header(CSRF_HEADER, self.csrf_token.as_str())
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(%course_key, error = %err, "enrollment request failed");
                return EnrollmentOutcome::OtherFailure;
            }
        };

        let status = response.status();
        if status.is_success() {
            info!(%course_key, status = status.as_u16(), "enrolled");
            return EnrollmentOutcome::Enrolled;
        }
        if status != StatusCode::BAD_REQUEST {
            warn!(%course_key, status = status.as_u16(), "enrollment rejected");
            return EnrollmentOutcome::OtherFailure;
        }

        match response.text().await {
            Ok(body) => classify_rejection(course_key, &body),
            Err(err) => {
                warn!(%course_key, error = %err, "failed to read enrollment rejection body");
                EnrollmentOutcome::OtherFailure
            }
        }
    }
}

/// Interprets the body of a 400 from the enrollment API.
pub fn classify_rejection(course_key: &CourseKey, body: &str) -> EnrollmentOutcome {
    let parsed = match serde_json::from_str::<EnrollmentErrorBody>(body) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(%course_key, error = %err, "unparsable enrollment rejection body");
            return EnrollmentOutcome::OtherFailure;
        }
    };

    let Some(raw_modes) = parsed.course_modes else {
        warn!(%course_key, "enrollment rejected without a mode list");
        return EnrollmentOutcome::OtherFailure;
    };

    let course_modes: Vec<CourseMode> = raw_modes
        .into_iter()
        .filter_map(|raw| serde_json::from_value::<CourseMode>(raw).ok())
        .collect();

    if has_mode(PROFESSIONAL_MODE_SLUG, &course_modes) {
        info!(%course_key, "free enrollment denied, track selection required");
        EnrollmentOutcome::Denied {
            course_key: course_key.clone(),
            course_modes,
        }
    } else {
        warn!(%course_key, "enrollment rejected without a professional mode");
        EnrollmentOutcome::OtherFailure
    }
}

#[cfg(test)]
#[path = "tests/enrollment_tests.rs"]
mod tests;
