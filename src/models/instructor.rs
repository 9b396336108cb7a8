use serde::Serialize;

use crate::models::course::CourseSummary;
use crate::models::enrollment::EnrollmentDetail;
use crate::models::office_assignment::OfficeAssignment;
use crate::models::person::Person;

/// An instructor with the office and assigned courses eagerly loaded.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct InstructorDetail {
    #[serde(flatten)]
    pub person: Person,
    pub office_assignment: Option<OfficeAssignment>,
    pub courses: Vec<CourseSummary>,
}

#[derive(Serialize, Debug, Default)]
pub struct InstructorIndexData {
    pub instructors: Vec<InstructorDetail>,
    pub selected_instructor_id: Option<i32>,
    pub selected_course_id: Option<i32>,
    pub courses: Option<Vec<CourseSummary>>,
    pub enrollments: Option<Vec<EnrollmentDetail>>,
}
