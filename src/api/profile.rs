use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::decode_result;
use crate::error::ClientResult;
use crate::gateway::ApiGateway;

const PROFILE_ENDPOINT: &str = "/profile/me";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentInfo {
    pub department_id: i64,
    pub name: String,
    pub office_location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterInfo {
    pub semester_id: i64,
    pub name: String,
    pub year: i32,
    pub display_name: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub student_id: String,
    pub student_code: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub dob: Option<String>,
    pub gender: Option<String>,
    pub major: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub gpa: Option<f64>,
    pub department: Option<DepartmentInfo>,
    pub current_semester: Option<SemesterInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherProfile {
    pub teacher_id: String,
    pub teacher_code: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    pub academic_rank: Option<String>,
    pub office_room: Option<String>,
    pub department: Option<DepartmentInfo>,
}

/// Account data plus whichever role-specific profile applies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedProfile {
    pub user_id: String,
    pub email: String,
    pub profile_picture_url: Option<String>,
    pub role: String,
    pub status: String,
    pub email_verified: bool,
    pub last_login_at: Option<String>,
    pub login_count: i64,
    pub created_at: String,
    /// Present only for students
    pub student_profile: Option<StudentProfile>,
    /// Present only for teachers
    pub teacher_profile: Option<TeacherProfile>,
}

impl CombinedProfile {
    pub fn display_name(&self) -> String {
        let names = self
            .student_profile
            .as_ref()
            .map(|s| (&s.first_name, &s.last_name))
            .or_else(|| {
                self.teacher_profile
                    .as_ref()
                    .map(|t| (&t.first_name, &t.last_name))
            });

        match names {
            Some((first, last)) => format!("{} {}", last, first),
            None => self.email.clone(),
        }
    }
}

/// Fetch the signed-in user's profile
pub async fn get_my_profile(gateway: &ApiGateway) -> ClientResult<CombinedProfile> {
    debug!("Fetching own profile");
    let response = gateway.get(PROFILE_ENDPOINT).await?;
    decode_result(&response)
}
