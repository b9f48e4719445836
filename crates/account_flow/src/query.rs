use std::collections::BTreeMap;

use shared::{
    domain::CourseKey,
    protocol::{COURSE_ID_PARAM, ENROLLMENT_ACTION_PARAM, ENROLL_ACTION, NEXT_PARAM},
};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("invalid page url: {0}")]
    InvalidPageUrl(#[from] url::ParseError),
    #[error("enrollment_action=enroll without a course_id")]
    MissingCourseId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentRequest {
    pub course_key: CourseKey,
}

/// Snapshot of the account page URL and its query string, taken when a
/// submission starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryContext {
    page: Url,
    params: BTreeMap<String, String>,
}

impl QueryContext {
    pub fn new(page: Url) -> Self {
        let mut params = BTreeMap::new();
        for (key, value) in page.query_pairs() {
            params
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }
        Self { page, params }
    }

    pub fn from_page_url(page: &str) -> Result<Self, QueryError> {
        Ok(Self::new(Url::parse(page)?))
    }

    /// Builds the snapshot from a raw query string (with or without the
    /// leading `?`) read on `page`. Any query already on `page` is replaced.
    pub fn from_query(page: &Url, query: &str) -> Self {
        let mut page = page.clone();
        let query = query.trim_start_matches('?');
        page.set_query((!query.is_empty()).then_some(query));
        Self::new(page)
    }

    pub fn page(&self) -> &Url {
        &self.page
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn next(&self) -> Option<&str> {
        self.get(NEXT_PARAM)
    }

    pub fn enrollment_requested(&self) -> bool {
        self.get(ENROLLMENT_ACTION_PARAM) == Some(ENROLL_ACTION)
    }

    pub fn enrollment_request(&self) -> Result<Option<EnrollmentRequest>, QueryError> {
        if !self.enrollment_requested() {
            return Ok(None);
        }
        match self.get(COURSE_ID_PARAM).map(str::trim) {
            Some(course_id) if !course_id.is_empty() => Ok(Some(EnrollmentRequest {
                course_key: CourseKey::new(course_id),
            })),
            _ => Err(QueryError::MissingCourseId),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_known_parameters() {
        let query = QueryContext::from_page_url(
            "https://lms.example.com/login?next=%2Fcourses%2Fabc&enrollment_action=enroll&course_id=course-v1%3AedX%2BDemoX%2B2014",
        )
        .expect("query");
        assert_eq!(query.next(), Some("/courses/abc"));
        assert_eq!(
            query.enrollment_request().expect("request"),
            Some(EnrollmentRequest {
                course_key: CourseKey::new("course-v1:edX+DemoX+2014"),
            })
        );
    }

    #[test]
    fn first_occurrence_of_repeated_key_wins() {
        let query =
            QueryContext::from_page_url("https://lms.example.com/login?next=/a&next=/b").expect("query");
        assert_eq!(query.next(), Some("/a"));
    }

    #[test]
    fn other_enrollment_actions_are_not_enrollment_requests() {
        let query = QueryContext::from_page_url(
            "https://lms.example.com/login?enrollment_action=add_to_cart&course_id=course-1",
        )
        .expect("query");
        assert_eq!(query.enrollment_request().expect("request"), None);
    }

    #[test]
    fn enroll_without_course_id_is_an_error() {
        let query = QueryContext::from_page_url(
            "https://lms.example.com/register?enrollment_action=enroll&course_id=",
        )
        .expect("query");
        assert_eq!(
            query.enrollment_request().expect_err("missing"),
            QueryError::MissingCourseId
        );
    }

    #[test]
    fn raw_query_string_is_read_against_page() {
        let page = Url::parse("https://lms.example.com/register?stale=1").expect("page");
        let query = QueryContext::from_query(
            &page,
            "?next=%2Fcourses%2Fabc&enrollment_action=enroll&course_id=course-1",
        );
        assert_eq!(query.next(), Some("/courses/abc"));
        assert_eq!(query.get("stale"), None);
        assert_eq!(query.page().host_str(), Some("lms.example.com"));
        assert_eq!(
            query.enrollment_request().expect("request"),
            Some(EnrollmentRequest {
                course_key: CourseKey::new("course-1"),
            })
        );

        let bare = QueryContext::from_query(&page, "next=/dashboard");
        assert_eq!(bare.next(), Some("/dashboard"));

        let empty = QueryContext::from_query(&page, "");
        assert_eq!(empty.next(), None);
        assert_eq!(empty.page().query(), None);
    }

    #[test]
    fn relative_page_url_is_rejected() {
        assert!(matches!(
            QueryContext::from_page_url("/login?next=/x"),
            Err(QueryError::InvalidPageUrl(_))
        ));
    }
}
