use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use log::{info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use validator::{Validate, ValidationError};

use crate::db::{departments, people};
use crate::errors::AppError;
use crate::handlers::{redisplay, see_other};
use crate::models::department::{Department, DepartmentFields, DepartmentWithAdministrator};
use crate::models::person::InstructorSummary;
use crate::utils::format::{format_currency, format_short_date};
use crate::utils::validation::{validate_payload, FormErrors, FORM_LEVEL};

const LIST_LOCATION: &str = "/departments";

const DELETED_BY_ANOTHER_USER: &str =
    "Unable to save changes. The department was deleted by another user.";

const EDIT_CONFLICT: &str = "The record you attempted to edit was modified by another user \
     after you got the original value. The edit operation was canceled and the current values \
     in the database have been displayed. If you still want to edit this record, click the Save \
     button again. Otherwise click the Back to List hyperlink.";

const DELETE_CONFLICT: &str = "The record you attempted to delete was modified by another user \
     after you got the original values. The delete operation was canceled and the current values \
     in the database have been displayed. If you still want to delete this record, click the \
     Delete button again. Otherwise click the Back to List hyperlink.";

/// Fields a client may bind when creating or editing a department.
#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
pub struct DepartmentForm {
    #[validate(length(min = 3, max = 50, message = "Name must be between 3 and 50 characters."))]
    name: String,
    #[validate(custom = "validate_budget")]
    budget: Decimal,
    start_date: NaiveDate,
    #[serde(default)]
    instructor_id: Option<i32>,
    #[serde(default)]
    row_version: Option<i64>,
}

impl DepartmentForm {
    fn fields(&self) -> DepartmentFields {
        DepartmentFields {
            name: self.name.clone(),
            budget: self.budget,
            start_date: self.start_date,
            instructor_id: self.instructor_id,
        }
    }
}

/// Body of a delete request; only the version token matters, other fields are ignored.
#[derive(Deserialize, Debug)]
pub struct DepartmentDelete {
    #[serde(default)]
    row_version: Option<i64>,
}

#[derive(Deserialize, Debug)]
pub struct DeleteQuery {
    concurrency_error: Option<bool>,
}

#[derive(Serialize)]
struct DepartmentFormData {
    department: Option<Department>,
    instructors: Vec<InstructorSummary>,
}

#[derive(Serialize)]
struct DeleteConfirmation {
    department: DepartmentWithAdministrator,
    concurrency_error_message: Option<&'static str>,
}

/// Exclusive upper bound of the `NUMERIC(19, 4)` budget column.
const BUDGET_LIMIT: i64 = 1_000_000_000_000_000;

fn validate_budget(budget: &Decimal) -> Result<(), ValidationError> {
    let message = if budget.is_sign_negative() && !budget.is_zero() {
        "Budget cannot be negative."
    } else if budget.round_dp(4) >= Decimal::from(BUDGET_LIMIT) {
        "Budget must be less than $1,000,000,000,000,000.00."
    } else {
        return Ok(());
    };

    let mut err = ValidationError::new("range");
    err.message = Some(message.into());
    Err(err)
}

/// Adds a field error when `instructor_id` does not name an existing instructor.
async fn check_administrator(
    conn: &mut PgConnection,
    instructor_id: Option<i32>,
    errors: &mut FormErrors,
) -> Result<(), AppError> {
    if let Some(id) = instructor_id {
        if people::find_instructor(conn, id).await?.is_none() {
            errors.add("instructor_id", format!("Instructor {} does not exist.", id));
        }
    }
    Ok(())
}

async fn instructor_choices(conn: &mut PgConnection) -> Result<Vec<InstructorSummary>, AppError> {
    let instructors = people::list_instructors(conn).await?;
    Ok(instructors.iter().map(InstructorSummary::from).collect())
}

/// Builds the per-field messages shown when an edit lost the race: one entry
/// for every column whose stored value differs from what the client sent,
/// plus the form-level explanation.
fn concurrency_errors(
    submitted: &DepartmentFields,
    current: &Department,
    current_administrator: Option<&str>,
) -> FormErrors {
    let mut errors = FormErrors::new();

    if current.name != submitted.name {
        errors.add("name", format!("Current value: {}", current.name));
    }
    if current.budget != submitted.budget {
        errors.add(
            "budget",
            format!("Current value: {}", format_currency(current.budget)),
        );
    }
    if current.start_date != submitted.start_date {
        errors.add(
            "start_date",
            format!("Current value: {}", format_short_date(current.start_date)),
        );
    }
    if current.instructor_id != submitted.instructor_id {
        errors.add(
            "instructor_id",
            format!("Current value: {}", current_administrator.unwrap_or_default()),
        );
    }

    errors.add(FORM_LEVEL, EDIT_CONFLICT);
    errors
}

fn deleted_by_another_user(form: DepartmentForm) -> HttpResponse {
    let mut errors = FormErrors::new();
    errors.add(FORM_LEVEL, DELETED_BY_ANOTHER_USER);
    redisplay(StatusCode::CONFLICT, form, errors)
}

pub async fn list_departments(pool: web::Data<PgPool>) -> Result<HttpResponse, AppError> {
    let mut conn = pool.acquire().await?;
    let departments = departments::list_with_administrator(&mut conn).await?;

    Ok(HttpResponse::Ok().json(departments))
}

pub async fn department_details(
    pool: web::Data<PgPool>,
    department_id: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let department_id = department_id.into_inner();
    let mut conn = pool.acquire().await?;

    let department = departments::find_with_administrator(&mut conn, department_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Department not found".to_string()))?;

    Ok(HttpResponse::Ok().json(department))
}

pub async fn create_department_form(pool: web::Data<PgPool>) -> Result<HttpResponse, AppError> {
    let mut conn = pool.acquire().await?;
    let instructors = instructor_choices(&mut conn).await?;

    Ok(HttpResponse::Ok().json(DepartmentFormData {
        department: None,
        instructors,
    }))
}

pub async fn create_department(
    pool: web::Data<PgPool>,
    new_department: web::Json<DepartmentForm>,
) -> Result<HttpResponse, AppError> {
    let form = new_department.into_inner();

    if let Err(errors) = validate_payload(&form) {
        return Ok(redisplay(StatusCode::UNPROCESSABLE_ENTITY, form, errors));
    }

    let mut tx = pool.begin().await?;

    let mut errors = FormErrors::new();
    check_administrator(&mut tx, form.instructor_id, &mut errors).await?;
    if !errors.is_empty() {
        return Ok(redisplay(StatusCode::UNPROCESSABLE_ENTITY, form, errors));
    }

    // The client's row_version is bound but ignored; the database assigns it.
    let department_id = departments::insert(&mut tx, &form.fields()).await?;
    tx.commit().await?;

    info!("Created department {} ({})", department_id, form.name);
    Ok(see_other(LIST_LOCATION))
}

pub async fn edit_department_form(
    pool: web::Data<PgPool>,
    department_id: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let department_id = department_id.into_inner();
    let mut conn = pool.acquire().await?;

    let department = departments::find(&mut conn, department_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Department not found".to_string()))?;
    let instructors = instructor_choices(&mut conn).await?;

    Ok(HttpResponse::Ok().json(DepartmentFormData {
        department: Some(department),
        instructors,
    }))
}

pub async fn edit_department(
    pool: web::Data<PgPool>,
    department_id: web::Path<i32>,
    updates: web::Json<DepartmentForm>,
) -> Result<HttpResponse, AppError> {
    let department_id = department_id.into_inner();
    let mut form = updates.into_inner();
    let mut tx = pool.begin().await?;

    if departments::find(&mut tx, department_id).await?.is_none() {
        warn!("Edit of department {} failed: it no longer exists", department_id);
        return Ok(deleted_by_another_user(form));
    }

    let mut errors = validate_payload(&form).err().unwrap_or_default();
    check_administrator(&mut tx, form.instructor_id, &mut errors).await?;
    if !errors.is_empty() {
        return Ok(redisplay(StatusCode::UNPROCESSABLE_ENTITY, form, errors));
    }

    let submitted = form.fields();
    // Versions start at 1, so a missing token always conflicts.
    let expected_version = form.row_version.unwrap_or_default();

    if let Some(updated) =
        departments::update_if_version(&mut tx, department_id, &submitted, expected_version).await?
    {
        tx.commit().await?;
        info!(
            "Updated department {} to version {}",
            department_id, updated.row_version
        );
        return Ok(see_other(LIST_LOCATION));
    }

    let Some(current) = departments::find(&mut tx, department_id).await? else {
        warn!("Edit of department {} lost to a concurrent delete", department_id);
        return Ok(deleted_by_another_user(form));
    };

    let administrator = match current.instructor_id {
        Some(id) if current.instructor_id != submitted.instructor_id => {
            people::find_instructor(&mut tx, id).await?.map(|p| p.full_name())
        }
        _ => None,
    };

    warn!(
        "Edit of department {} conflicted: submitted version {}, current version {}",
        department_id, expected_version, current.row_version
    );

    let errors = concurrency_errors(&submitted, &current, administrator.as_deref());
    form.row_version = Some(current.row_version);
    Ok(redisplay(StatusCode::CONFLICT, form, errors))
}

pub async fn delete_department_confirm(
    pool: web::Data<PgPool>,
    department_id: web::Path<i32>,
    query: web::Query<DeleteQuery>,
) -> Result<HttpResponse, AppError> {
    let department_id = department_id.into_inner();
    let concurrency_error = query.concurrency_error.unwrap_or(false);
    let mut conn = pool.acquire().await?;

    let Some(department) = departments::find_with_administrator(&mut conn, department_id).await?
    else {
        if concurrency_error {
            return Ok(see_other(LIST_LOCATION));
        }
        return Err(AppError::NotFound("Department not found".to_string()));
    };

    Ok(HttpResponse::Ok().json(DeleteConfirmation {
        department,
        concurrency_error_message: concurrency_error.then_some(DELETE_CONFLICT),
    }))
}

pub async fn delete_department(
    pool: web::Data<PgPool>,
    department_id: web::Path<i32>,
    department: web::Json<DepartmentDelete>,
) -> Result<HttpResponse, AppError> {
    let department_id = department_id.into_inner();
    let expected_version = department.row_version.unwrap_or_default();
    let mut tx = pool.begin().await?;

    if departments::exists(&mut tx, department_id).await? {
        let removed = departments::delete_if_version(&mut tx, department_id, expected_version).await?;
        if removed == 0 {
            warn!(
                "Delete of department {} conflicted at version {}",
                department_id, expected_version
            );
            return Ok(see_other(&format!(
                "/departments/{}/delete?concurrency_error=true",
                department_id
            )));
        }
        tx.commit().await?;
        info!("Deleted department {}", department_id);
    }

    Ok(see_other(LIST_LOCATION))
}
