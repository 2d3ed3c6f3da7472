use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct InstructorRecordingsParams {
    /// Vendor user id, email address or login of the instructor
    pub(crate) instructor_id: String,
    /// Only return recordings whose course tracking field equals this value exactly
    pub(crate) course_id: Option<String>,
}
