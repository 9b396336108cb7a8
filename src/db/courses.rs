use std::collections::BTreeSet;

use sqlx::PgConnection;

use crate::models::course::Course;

pub async fn list(conn: &mut PgConnection) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(
        "SELECT course_id, title, credits, department_id FROM course ORDER BY course_id",
    )
    .fetch_all(&mut *conn)
    .await
}

pub async fn all_ids(conn: &mut PgConnection) -> Result<BTreeSet<i32>, sqlx::Error> {
    let ids = sqlx::query_scalar::<_, i32>("SELECT course_id FROM course")
        .fetch_all(&mut *conn)
        .await?;

    Ok(ids.into_iter().collect())
}

/// Returns the subset of `course_ids` that exist.
pub async fn existing_ids(
    conn: &mut PgConnection,
    course_ids: &BTreeSet<i32>,
) -> Result<BTreeSet<i32>, sqlx::Error> {
    if course_ids.is_empty() {
        return Ok(BTreeSet::new());
    }

    let wanted: Vec<i32> = course_ids.iter().copied().collect();
    let ids = sqlx::query_scalar::<_, i32>("SELECT course_id FROM course WHERE course_id = ANY($1)")
        .bind(&wanted)
        .fetch_all(&mut *conn)
        .await?;

    Ok(ids.into_iter().collect())
}
