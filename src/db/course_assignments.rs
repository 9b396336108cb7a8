use std::collections::BTreeSet;

use sqlx::PgConnection;

use crate::models::course::CourseSummary;
use crate::models::course_assignment::{AssignedCourseRow, CourseAssignment};

const SELECT_ASSIGNED_COURSES: &str = "SELECT ca.instructor_id, c.course_id, c.title, c.credits, c.department_id, \
            d.name AS department_name \
     FROM course_assignment ca \
     JOIN course c ON c.course_id = ca.course_id \
     JOIN department d ON d.department_id = c.department_id";

/// Every assignment with its course and the course's department, for eager loading.
pub async fn list_with_courses(
    conn: &mut PgConnection,
) -> Result<Vec<AssignedCourseRow>, sqlx::Error> {
    let sql = format!("{} ORDER BY ca.instructor_id, c.course_id", SELECT_ASSIGNED_COURSES);
    sqlx::query_as::<_, AssignedCourseRow>(&sql)
        .fetch_all(&mut *conn)
        .await
}

pub async fn courses_for(
    conn: &mut PgConnection,
    instructor_id: i32,
) -> Result<Vec<CourseSummary>, sqlx::Error> {
    let sql = format!(
        "{} WHERE ca.instructor_id = $1 ORDER BY c.course_id",
        SELECT_ASSIGNED_COURSES
    );
    let rows = sqlx::query_as::<_, AssignedCourseRow>(&sql)
        .bind(instructor_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows.into_iter().map(|row| row.course).collect())
}

pub async fn course_ids_for(
    conn: &mut PgConnection,
    instructor_id: i32,
) -> Result<BTreeSet<i32>, sqlx::Error> {
    let ids = sqlx::query_scalar::<_, i32>(
        "SELECT course_id FROM course_assignment WHERE instructor_id = $1",
    )
    .bind(instructor_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(ids.into_iter().collect())
}

pub async fn add(conn: &mut PgConnection, assignment: CourseAssignment) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO course_assignment (instructor_id, course_id) VALUES ($1, $2) \
         ON CONFLICT (course_id, instructor_id) DO NOTHING",
    )
    .bind(assignment.instructor_id)
    .bind(assignment.course_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn remove(conn: &mut PgConnection, assignment: CourseAssignment) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM course_assignment WHERE instructor_id = $1 AND course_id = $2")
        .bind(assignment.instructor_id)
        .bind(assignment.course_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn remove_all_for(conn: &mut PgConnection, instructor_id: i32) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM course_assignment WHERE instructor_id = $1")
        .bind(instructor_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}
