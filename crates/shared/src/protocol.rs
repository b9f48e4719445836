use serde::{Deserialize, Serialize};

pub const CSRF_HEADER: &str = "X-CSRFToken";
pub const DEFAULT_CSRF_COOKIE: &str = "csrftoken";

pub const DEFAULT_DASHBOARD_PATH: &str = "/dashboard";
pub const ENROLLMENT_COURSE_PATH: &str = "/enrollment/v0/course/";
pub const TRACK_SELECTION_PATH: &str = "/course_modes/choose/";

pub const NEXT_PARAM: &str = "next";
pub const ENROLLMENT_ACTION_PARAM: &str = "enrollment_action";
pub const COURSE_ID_PARAM: &str = "course_id";
pub const ENROLL_ACTION: &str = "enroll";

pub const PROFESSIONAL_MODE_SLUG: &str = "professional";

/// Body the enrollment API returns alongside a 400.
///
/// Mode entries stay raw JSON so one malformed entry cannot hide the others.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrollmentErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_modes: Option<Vec<serde_json::Value>>,
}
