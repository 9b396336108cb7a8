use sqlx::PgConnection;

use crate::models::enrollment::Enrollment;

pub async fn for_course(
    conn: &mut PgConnection,
    course_id: i32,
) -> Result<Vec<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(
        "SELECT enrollment_id, course_id, student_id, grade FROM enrollment \
         WHERE course_id = $1 ORDER BY enrollment_id",
    )
    .bind(course_id)
    .fetch_all(&mut *conn)
    .await
}
