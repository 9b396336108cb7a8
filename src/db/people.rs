use chrono::NaiveDate;
use sqlx::PgConnection;

use crate::errors::AppError;
use crate::models::office_assignment::OfficeAssignment;
use crate::models::person::{Person, PersonRow, INSTRUCTOR_DISCRIMINATOR, STUDENT_DISCRIMINATOR};

const SELECT_PERSON: &str = "SELECT id, last_name, first_mid_name, discriminator, hire_date, enrollment_date, row_version \
     FROM person";

/// Values an instructor form may write to the `person` row.
#[derive(Debug, Clone, PartialEq)]
pub struct InstructorFields {
    pub last_name: String,
    pub first_mid_name: String,
    pub hire_date: NaiveDate,
}

fn into_people(rows: Vec<PersonRow>) -> Result<Vec<Person>, AppError> {
    rows.into_iter()
        .map(|row| Person::try_from(row).map_err(AppError::from))
        .collect()
}

pub async fn list_instructors(conn: &mut PgConnection) -> Result<Vec<Person>, AppError> {
    let sql = format!(
        "{} WHERE discriminator = $1 ORDER BY last_name, first_mid_name, id",
        SELECT_PERSON
    );
    let rows = sqlx::query_as::<_, PersonRow>(&sql)
        .bind(INSTRUCTOR_DISCRIMINATOR)
        .fetch_all(&mut *conn)
        .await?;

    into_people(rows)
}

pub async fn find_instructor(
    conn: &mut PgConnection,
    instructor_id: i32,
) -> Result<Option<Person>, AppError> {
    let sql = format!("{} WHERE id = $1 AND discriminator = $2", SELECT_PERSON);
    let row = sqlx::query_as::<_, PersonRow>(&sql)
        .bind(instructor_id)
        .bind(INSTRUCTOR_DISCRIMINATOR)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(Person::try_from).transpose().map_err(AppError::from)
}

pub async fn find_students(
    conn: &mut PgConnection,
    student_ids: &[i32],
) -> Result<Vec<Person>, AppError> {
    if student_ids.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!("{} WHERE id = ANY($1) AND discriminator = $2", SELECT_PERSON);
    let rows = sqlx::query_as::<_, PersonRow>(&sql)
        .bind(student_ids)
        .bind(STUDENT_DISCRIMINATOR)
        .fetch_all(&mut *conn)
        .await?;

    into_people(rows)
}

pub async fn insert_instructor(
    conn: &mut PgConnection,
    fields: &InstructorFields,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        "INSERT INTO person (last_name, first_mid_name, hire_date, discriminator) \
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(&fields.last_name)
    .bind(&fields.first_mid_name)
    .bind(fields.hire_date)
    .bind(INSTRUCTOR_DISCRIMINATOR)
    .fetch_one(&mut *conn)
    .await
}

/// Writes the instructor's own columns and bumps its version. When
/// `expected_version` is given the write only happens if it still matches;
/// the return value is whether a row was written.
pub async fn update_instructor(
    conn: &mut PgConnection,
    instructor_id: i32,
    fields: &InstructorFields,
    expected_version: Option<i64>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE person \
         SET last_name = $1, first_mid_name = $2, hire_date = $3, row_version = row_version + 1 \
         WHERE id = $4 AND discriminator = $5 AND ($6::BIGINT IS NULL OR row_version = $6)",
    )
    .bind(&fields.last_name)
    .bind(&fields.first_mid_name)
    .bind(fields.hire_date)
    .bind(instructor_id)
    .bind(INSTRUCTOR_DISCRIMINATOR)
    .bind(expected_version)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn delete_person(conn: &mut PgConnection, person_id: i32) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM person WHERE id = $1")
        .bind(person_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

pub async fn list_office_assignments(
    conn: &mut PgConnection,
) -> Result<Vec<OfficeAssignment>, sqlx::Error> {
    sqlx::query_as::<_, OfficeAssignment>("SELECT instructor_id, location FROM office_assignment")
        .fetch_all(&mut *conn)
        .await
}

pub async fn find_office_assignment(
    conn: &mut PgConnection,
    instructor_id: i32,
) -> Result<Option<OfficeAssignment>, sqlx::Error> {
    sqlx::query_as::<_, OfficeAssignment>(
        "SELECT instructor_id, location FROM office_assignment WHERE instructor_id = $1",
    )
    .bind(instructor_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn upsert_office_assignment(
    conn: &mut PgConnection,
    instructor_id: i32,
    location: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO office_assignment (instructor_id, location) VALUES ($1, $2) \
         ON CONFLICT (instructor_id) DO UPDATE SET location = EXCLUDED.location",
    )
    .bind(instructor_id)
    .bind(location)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn delete_office_assignment(
    conn: &mut PgConnection,
    instructor_id: i32,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM office_assignment WHERE instructor_id = $1")
        .bind(instructor_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}
