use serde::Serialize;

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct Course {
    pub course_id: i32,
    pub title: String,
    pub credits: i32,
    pub department_id: i32,
}

/// A course with its owning department's name joined in.
#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct CourseSummary {
    pub course_id: i32,
    pub title: String,
    pub credits: i32,
    pub department_id: i32,
    pub department_name: String,
}

/// One entry of the course checklist shown when creating or editing an instructor.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AssignedCourseData {
    pub course_id: i32,
    pub title: String,
    pub assigned: bool,
}
