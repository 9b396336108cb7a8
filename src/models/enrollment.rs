use serde::{Deserialize, Serialize};

use crate::models::person::Person;

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Enrollment {
    pub enrollment_id: i32,
    pub course_id: i32,
    pub student_id: i32,
    pub grade: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct EnrollmentDetail {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub student: Option<Person>,
}
