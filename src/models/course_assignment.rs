use crate::models::course::CourseSummary;

/// One (instructor, course) pair; the pair is the primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourseAssignment {
    pub instructor_id: i32,
    pub course_id: i32,
}

#[derive(sqlx::FromRow, Debug)]
pub struct AssignedCourseRow {
    pub instructor_id: i32,
    #[sqlx(flatten)]
    pub course: CourseSummary,
}
