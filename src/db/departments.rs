use sqlx::PgConnection;

use crate::models::department::{
    Department, DepartmentAdministratorRow, DepartmentFields, DepartmentWithAdministrator,
};

const SELECT_WITH_ADMINISTRATOR: &str = "SELECT d.department_id, d.name, d.budget, d.start_date, d.instructor_id, d.row_version, \
            p.last_name AS administrator_last_name, p.first_mid_name AS administrator_first_mid_name \
     FROM department d \
     LEFT JOIN person p ON p.id = d.instructor_id";

pub async fn list_with_administrator(
    conn: &mut PgConnection,
) -> Result<Vec<DepartmentWithAdministrator>, sqlx::Error> {
    let sql = format!("{} ORDER BY d.name", SELECT_WITH_ADMINISTRATOR);
    let rows = sqlx::query_as::<_, DepartmentAdministratorRow>(&sql)
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows.into_iter().map(DepartmentWithAdministrator::from).collect())
}

pub async fn find_with_administrator(
    conn: &mut PgConnection,
    department_id: i32,
) -> Result<Option<DepartmentWithAdministrator>, sqlx::Error> {
    let sql = format!("{} WHERE d.department_id = $1", SELECT_WITH_ADMINISTRATOR);
    let row = sqlx::query_as::<_, DepartmentAdministratorRow>(&sql)
        .bind(department_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(DepartmentWithAdministrator::from))
}

pub async fn find(
    conn: &mut PgConnection,
    department_id: i32,
) -> Result<Option<Department>, sqlx::Error> {
    sqlx::query_as::<_, Department>(
        "SELECT department_id, name, budget, start_date, instructor_id, row_version \
         FROM department WHERE department_id = $1",
    )
    .bind(department_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn exists(conn: &mut PgConnection, department_id: i32) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM department WHERE department_id = $1)")
        .bind(department_id)
        .fetch_one(&mut *conn)
        .await
}

pub async fn insert(conn: &mut PgConnection, fields: &DepartmentFields) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        "INSERT INTO department (name, budget, start_date, instructor_id) \
         VALUES ($1, $2, $3, $4) RETURNING department_id",
    )
    .bind(&fields.name)
    .bind(fields.budget)
    .bind(fields.start_date)
    .bind(fields.instructor_id)
    .fetch_one(&mut *conn)
    .await
}

/// Compare-and-swap update: the row is written only while its `row_version`
/// still equals `expected_version`. `None` means nothing matched, either
/// because the row is gone or because someone else saved first.
pub async fn update_if_version(
    conn: &mut PgConnection,
    department_id: i32,
    fields: &DepartmentFields,
    expected_version: i64,
) -> Result<Option<Department>, sqlx::Error> {
    sqlx::query_as::<_, Department>(
        "UPDATE department \
         SET name = $1, budget = $2, start_date = $3, instructor_id = $4, row_version = row_version + 1 \
         WHERE department_id = $5 AND row_version = $6 \
         RETURNING department_id, name, budget, start_date, instructor_id, row_version",
    )
    .bind(&fields.name)
    .bind(fields.budget)
    .bind(fields.start_date)
    .bind(fields.instructor_id)
    .bind(department_id)
    .bind(expected_version)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn delete_if_version(
    conn: &mut PgConnection,
    department_id: i32,
    expected_version: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM department WHERE department_id = $1 AND row_version = $2")
        .bind(department_id)
        .bind(expected_version)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

/// Drops `instructor_id` from every department it administers. Each touched
/// row gets a new version so pending edits of those departments conflict.
pub async fn clear_administrator(
    conn: &mut PgConnection,
    instructor_id: i32,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE department SET instructor_id = NULL, row_version = row_version + 1 \
         WHERE instructor_id = $1",
    )
    .bind(instructor_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}
