use std::collections::{BTreeSet, HashMap};

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use validator::Validate;

use crate::db::people::{self, InstructorFields};
use crate::db::{course_assignments, courses, departments, enrollments};
use crate::errors::AppError;
use crate::handlers::{redisplay, see_other};
use crate::models::course::{AssignedCourseData, Course};
use crate::models::course_assignment::CourseAssignment;
use crate::models::enrollment::EnrollmentDetail;
use crate::models::instructor::{InstructorDetail, InstructorIndexData};
use crate::models::office_assignment::OfficeAssignment;
use crate::utils::validation::{validate_payload, FormErrors, FORM_LEVEL};

const LIST_LOCATION: &str = "/instructors";

const SAVE_FAILED: &str = "Unable to save changes. Try again, and if the problem persists, \
     see your system administrator.";

#[derive(Deserialize, Serialize, Validate, Debug, Clone, Default)]
pub struct OfficeAssignmentForm {
    #[serde(default)]
    #[validate(length(max = 50, message = "Office location cannot be longer than 50 characters."))]
    location: Option<String>,
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
pub struct InstructorForm {
    #[validate(length(min = 1, max = 50, message = "Last name must be between 1 and 50 characters."))]
    last_name: String,
    #[validate(length(min = 1, max = 50, message = "First name must be between 1 and 50 characters."))]
    first_mid_name: String,
    hire_date: NaiveDate,
    #[serde(default)]
    #[validate]
    office_assignment: Option<OfficeAssignmentForm>,
    #[serde(default)]
    selected_courses: Option<Vec<String>>,
    #[serde(default)]
    row_version: Option<i64>,
}

impl InstructorForm {
    fn fields(&self) -> InstructorFields {
        InstructorFields {
            last_name: self.last_name.clone(),
            first_mid_name: self.first_mid_name.clone(),
            hire_date: self.hire_date,
        }
    }

    /// The submitted office location, or `None` when it is missing or blank.
    fn office_location(&self) -> Option<&str> {
        self.office_assignment
            .as_ref()
            .and_then(|office| office.location.as_deref())
            .filter(|location| !location.trim().is_empty())
    }
}

#[derive(Deserialize, Debug)]
pub struct InstructorIndexQuery {
    id: Option<i32>,
    course_id: Option<i32>,
}

/// A create form sent back with the course selections it was submitted with.
#[derive(Serialize)]
struct PendingInstructor {
    #[serde(flatten)]
    instructor: InstructorForm,
    course_assignments: BTreeSet<i32>,
}

#[derive(Serialize)]
struct InstructorFormData {
    instructor: Option<InstructorDetail>,
    courses: Vec<AssignedCourseData>,
}

/// Course assignment changes needed to make an instructor's courses match a selection.
#[derive(Debug, Default, PartialEq)]
struct AssignmentPlan {
    to_add: Vec<i32>,
    to_remove: Vec<i32>,
}

/// Parses submitted course ids. Returns the ids that parsed and the raw values that did not.
fn parse_selected_courses(selected: &[String]) -> (BTreeSet<i32>, Vec<String>) {
    let mut ids = BTreeSet::new();
    let mut invalid = Vec::new();
    for raw in selected {
        match raw.trim().parse::<i32>() {
            Ok(id) => {
                ids.insert(id);
            }
            Err(_) => invalid.push(raw.clone()),
        }
    }
    (ids, invalid)
}

fn selection_errors(invalid: &[String]) -> FormErrors {
    let mut errors = FormErrors::new();
    for raw in invalid {
        errors.add("selected_courses", format!("'{}' is not a valid course id.", raw));
    }
    errors
}

/// Walks the known courses and diffs the current assignments against the
/// selection. Selected ids that are not known courses are ignored; no
/// selection at all removes every assignment.
fn reconcile_course_assignments(
    current: &BTreeSet<i32>,
    selected: Option<&BTreeSet<i32>>,
    known_courses: &BTreeSet<i32>,
) -> AssignmentPlan {
    let Some(selected) = selected else {
        return AssignmentPlan {
            to_add: Vec::new(),
            to_remove: current.iter().copied().collect(),
        };
    };

    let mut plan = AssignmentPlan::default();
    for &course_id in known_courses {
        match (selected.contains(&course_id), current.contains(&course_id)) {
            (true, false) => plan.to_add.push(course_id),
            (false, true) => plan.to_remove.push(course_id),
            _ => {}
        }
    }
    plan
}

fn assigned_course_data(
    all_courses: Vec<Course>,
    assigned: &BTreeSet<i32>,
) -> Vec<AssignedCourseData> {
    all_courses
        .into_iter()
        .map(|course| AssignedCourseData {
            assigned: assigned.contains(&course.course_id),
            course_id: course.course_id,
            title: course.title,
        })
        .collect()
}

/// Loads every instructor with office and courses (each with its department) in three queries.
async fn load_instructor_details(conn: &mut PgConnection) -> Result<Vec<InstructorDetail>, AppError> {
    let instructors = people::list_instructors(conn).await?;

    let mut offices: HashMap<i32, OfficeAssignment> = people::list_office_assignments(conn)
        .await?
        .into_iter()
        .map(|office| (office.instructor_id, office))
        .collect();

    let mut assigned: HashMap<i32, Vec<_>> = HashMap::new();
    for row in course_assignments::list_with_courses(conn).await? {
        assigned.entry(row.instructor_id).or_default().push(row.course);
    }

    Ok(instructors
        .into_iter()
        .map(|person| InstructorDetail {
            office_assignment: offices.remove(&person.id),
            courses: assigned.remove(&person.id).unwrap_or_default(),
            person,
        })
        .collect())
}

async fn load_instructor_detail(
    conn: &mut PgConnection,
    instructor_id: i32,
) -> Result<Option<InstructorDetail>, AppError> {
    let Some(person) = people::find_instructor(conn, instructor_id).await? else {
        return Ok(None);
    };

    Ok(Some(InstructorDetail {
        office_assignment: people::find_office_assignment(conn, instructor_id).await?,
        courses: course_assignments::courses_for(conn, instructor_id).await?,
        person,
    }))
}

/// Loads the enrollments of one course, then the students they reference.
async fn load_enrollments(
    conn: &mut PgConnection,
    course_id: i32,
) -> Result<Vec<EnrollmentDetail>, AppError> {
    let enrollments = enrollments::for_course(conn, course_id).await?;

    let student_ids: Vec<i32> = enrollments
        .iter()
        .map(|enrollment| enrollment.student_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let students: HashMap<i32, _> = people::find_students(conn, &student_ids)
        .await?
        .into_iter()
        .map(|student| (student.id, student))
        .collect();

    Ok(enrollments
        .into_iter()
        .map(|enrollment| EnrollmentDetail {
            student: students.get(&enrollment.student_id).cloned(),
            enrollment,
        })
        .collect())
}

fn instructor_not_found() -> AppError {
    AppError::NotFound("Instructor not found".to_string())
}

pub async fn list_instructors(
    pool: web::Data<PgPool>,
    query: web::Query<InstructorIndexQuery>,
) -> Result<HttpResponse, AppError> {
    let mut conn = pool.acquire().await?;

    let mut view = InstructorIndexData {
        instructors: load_instructor_details(&mut conn).await?,
        ..Default::default()
    };

    if let Some(instructor_id) = query.id {
        let selected = view
            .instructors
            .iter()
            .find(|detail| detail.person.id == instructor_id)
            .ok_or_else(instructor_not_found)?;
        view.selected_instructor_id = Some(instructor_id);
        view.courses = Some(selected.courses.clone());
    }

    if let Some(course_id) = query.course_id {
        let is_listed = view
            .courses
            .as_ref()
            .is_some_and(|courses| courses.iter().any(|course| course.course_id == course_id));
        if !is_listed {
            return Err(AppError::NotFound(
                "Course is not assigned to the selected instructor".to_string(),
            ));
        }
        view.selected_course_id = Some(course_id);
        view.enrollments = Some(load_enrollments(&mut conn, course_id).await?);
    }

    Ok(HttpResponse::Ok().json(view))
}

pub async fn instructor_details(
    pool: web::Data<PgPool>,
    instructor_id: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let mut conn = pool.acquire().await?;
    let instructor = people::find_instructor(&mut conn, instructor_id.into_inner())
        .await?
        .ok_or_else(instructor_not_found)?;

    Ok(HttpResponse::Ok().json(instructor))
}

pub async fn create_instructor_form(pool: web::Data<PgPool>) -> Result<HttpResponse, AppError> {
    let mut conn = pool.acquire().await?;
    let all_courses = courses::list(&mut conn).await?;

    Ok(HttpResponse::Ok().json(InstructorFormData {
        instructor: None,
        courses: assigned_course_data(all_courses, &BTreeSet::new()),
    }))
}

pub async fn create_instructor(
    pool: web::Data<PgPool>,
    new_instructor: web::Json<InstructorForm>,
) -> Result<HttpResponse, AppError> {
    let form = new_instructor.into_inner();

    // Selections are collected before validation so a redisplay keeps them.
    let (course_ids, invalid) =
        parse_selected_courses(form.selected_courses.as_deref().unwrap_or_default());
    let mut errors = validate_payload(&form).err().unwrap_or_default();
    errors.merge(selection_errors(&invalid));

    let pending = |instructor: InstructorForm, course_assignments: BTreeSet<i32>| PendingInstructor {
        instructor,
        course_assignments,
    };

    if !errors.is_empty() {
        return Ok(redisplay(
            StatusCode::UNPROCESSABLE_ENTITY,
            pending(form, course_ids),
            errors,
        ));
    }

    let mut tx = pool.begin().await?;

    let existing = courses::existing_ids(&mut tx, &course_ids).await?;
    for unknown in course_ids.difference(&existing) {
        errors.add("selected_courses", format!("Course {} does not exist.", unknown));
    }
    if !errors.is_empty() {
        return Ok(redisplay(
            StatusCode::UNPROCESSABLE_ENTITY,
            pending(form, course_ids),
            errors,
        ));
    }

    let instructor_id = people::insert_instructor(&mut tx, &form.fields()).await?;
    if let Some(location) = form.office_location() {
        people::upsert_office_assignment(&mut tx, instructor_id, location).await?;
    }
    for &course_id in &course_ids {
        course_assignments::add(&mut tx, CourseAssignment { instructor_id, course_id }).await?;
    }
    tx.commit().await?;

    info!(
        "Created instructor {} with {} course assignments",
        instructor_id,
        course_ids.len()
    );
    Ok(see_other(LIST_LOCATION))
}

pub async fn edit_instructor_form(
    pool: web::Data<PgPool>,
    instructor_id: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let mut conn = pool.acquire().await?;

    let instructor = load_instructor_detail(&mut conn, instructor_id.into_inner())
        .await?
        .ok_or_else(instructor_not_found)?;
    let assigned: BTreeSet<i32> = instructor.courses.iter().map(|c| c.course_id).collect();
    let all_courses = courses::list(&mut conn).await?;

    Ok(HttpResponse::Ok().json(InstructorFormData {
        courses: assigned_course_data(all_courses, &assigned),
        instructor: Some(instructor),
    }))
}

/// Writes the instructor row, office and course assignments. `Ok(false)`
/// means the instructor's version moved on since the client read it.
async fn save_instructor_edit(
    tx: &mut Transaction<'_, Postgres>,
    instructor_id: i32,
    form: &InstructorForm,
    plan: &AssignmentPlan,
) -> Result<bool, sqlx::Error> {
    if !people::update_instructor(tx, instructor_id, &form.fields(), form.row_version).await? {
        return Ok(false);
    }

    // An absent office_assignment leaves the stored office untouched.
    if form.office_assignment.is_some() {
        match form.office_location() {
            Some(location) => people::upsert_office_assignment(tx, instructor_id, location).await?,
            None => {
                people::delete_office_assignment(tx, instructor_id).await?;
            }
        }
    }

    for &course_id in &plan.to_add {
        course_assignments::add(tx, CourseAssignment { instructor_id, course_id }).await?;
    }
    for &course_id in &plan.to_remove {
        course_assignments::remove(tx, CourseAssignment { instructor_id, course_id }).await?;
    }

    Ok(true)
}

pub async fn edit_instructor(
    pool: web::Data<PgPool>,
    instructor_id: web::Path<i32>,
    updates: web::Json<InstructorForm>,
) -> Result<HttpResponse, AppError> {
    let instructor_id = instructor_id.into_inner();
    let form = updates.into_inner();
    let mut tx = pool.begin().await?;

    if people::find_instructor(&mut tx, instructor_id).await?.is_none() {
        return Err(instructor_not_found());
    }
    let current = course_assignments::course_ids_for(&mut tx, instructor_id).await?;

    let selected = form
        .selected_courses
        .as_deref()
        .map(parse_selected_courses);
    let mut errors = validate_payload(&form).err().unwrap_or_default();
    if let Some((_, invalid)) = &selected {
        errors.merge(selection_errors(invalid));
    }
    if !errors.is_empty() {
        return Ok(redisplay(StatusCode::UNPROCESSABLE_ENTITY, form, errors));
    }

    let known_courses = courses::all_ids(&mut tx).await?;
    let plan = reconcile_course_assignments(
        &current,
        selected.as_ref().map(|(ids, _)| ids),
        &known_courses,
    );

    let outcome = save_instructor_edit(&mut tx, instructor_id, &form, &plan).await;
    let saved = match outcome {
        Ok(true) => tx.commit().await.map(|_| true),
        other => other,
    };

    match saved {
        Ok(true) => {
            info!(
                "Updated instructor {}: {} course(s) added, {} removed",
                instructor_id,
                plan.to_add.len(),
                plan.to_remove.len()
            );
            Ok(see_other(LIST_LOCATION))
        }
        Ok(false) => {
            warn!(
                "Edit of instructor {} conflicted at version {:?}",
                instructor_id, form.row_version
            );
            let mut errors = FormErrors::new();
            errors.add(FORM_LEVEL, SAVE_FAILED);
            Ok(redisplay(StatusCode::CONFLICT, form, errors))
        }
        Err(err) => {
            error!("Edit of instructor {} failed to save: {}", instructor_id, err);
            let mut errors = FormErrors::new();
            errors.add(FORM_LEVEL, SAVE_FAILED);
            Ok(redisplay(StatusCode::CONFLICT, form, errors))
        }
    }
}

pub async fn delete_instructor_confirm(
    pool: web::Data<PgPool>,
    instructor_id: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let mut conn = pool.acquire().await?;
    let instructor = people::find_instructor(&mut conn, instructor_id.into_inner())
        .await?
        .ok_or_else(instructor_not_found)?;

    Ok(HttpResponse::Ok().json(instructor))
}

pub async fn delete_instructor(
    pool: web::Data<PgPool>,
    instructor_id: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let instructor_id = instructor_id.into_inner();
    let mut tx = pool.begin().await?;

    if people::find_instructor(&mut tx, instructor_id).await?.is_none() {
        return Err(instructor_not_found());
    }

    let assignments = course_assignments::remove_all_for(&mut tx, instructor_id).await?;
    let released = departments::clear_administrator(&mut tx, instructor_id).await?;
    people::delete_office_assignment(&mut tx, instructor_id).await?;
    people::delete_person(&mut tx, instructor_id).await?;
    tx.commit().await?;

    info!(
        "Deleted instructor {} ({} course assignments removed, {} departments left without administrator)",
        instructor_id, assignments, released
    );
    Ok(see_other(LIST_LOCATION))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test as actix_test, App};
    use sqlx::postgres::PgPoolOptions;

    fn set(ids: &[i32]) -> BTreeSet<i32> {
        ids.iter().copied().collect()
    }

    #[test]
    fn reconcile_adds_new_and_removes_dropped_selections() {
        let plan = reconcile_course_assignments(
            &set(&[1045, 3141]),
            Some(&set(&[3141, 4022])),
            &set(&[1045, 1050, 3141, 4022]),
        );

        assert_eq!(
            plan,
            AssignmentPlan {
                to_add: vec![4022],
                to_remove: vec![1045],
            }
        );
    }

    #[test]
    fn reconcile_ignores_unknown_courses() {
        let plan = reconcile_course_assignments(&set(&[]), Some(&set(&[9999, 1050])), &set(&[1050]));
        assert_eq!(plan.to_add, vec![1050]);
        assert!(plan.to_remove.is_empty());
    }

    #[test]
    fn missing_selection_clears_every_assignment() {
        let plan = reconcile_course_assignments(&set(&[1045, 3141]), None, &set(&[1045, 3141]));
        assert!(plan.to_add.is_empty());
        assert_eq!(plan.to_remove, vec![1045, 3141]);
    }

    #[test]
    fn unchanged_selection_needs_no_work() {
        let current = set(&[1045, 3141]);
        let plan = reconcile_course_assignments(&current, Some(&current), &set(&[1045, 3141, 4022]));
        assert_eq!(plan, AssignmentPlan::default());
    }

    #[test]
    fn selected_course_ids_are_parsed_and_deduplicated() {
        let raw = vec![
            "1045".to_string(),
            " 3141 ".to_string(),
            "1045".to_string(),
            "chem".to_string(),
        ];
        let (ids, invalid) = parse_selected_courses(&raw);
        assert_eq!(ids, set(&[1045, 3141]));
        assert_eq!(invalid, vec!["chem".to_string()]);
    }

    fn form(location: Option<&str>) -> InstructorForm {
        InstructorForm {
            last_name: "Abercrombie".to_string(),
            first_mid_name: "Kim".to_string(),
            hire_date: NaiveDate::from_ymd_opt(1995, 3, 11).unwrap(),
            office_assignment: Some(OfficeAssignmentForm {
                location: location.map(str::to_string),
            }),
            selected_courses: None,
            row_version: None,
        }
    }

    #[test]
    fn blank_office_location_means_no_office() {
        assert_eq!(form(Some("   ")).office_location(), None);
        assert_eq!(form(None).office_location(), None);
        assert_eq!(form(Some("Smith 17")).office_location(), Some("Smith 17"));

        let mut without_office = form(None);
        without_office.office_assignment = None;
        assert_eq!(without_office.office_location(), None);
    }

    #[actix_web::test]
    async fn invalid_create_keeps_course_selections() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .expect("lazy pool");
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(pool))
                .configure(crate::routes::configure),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/instructors/create")
            .set_json(serde_json::json!({
                "last_name": "",
                "first_mid_name": "Kim",
                "hire_date": "1995-03-11",
                "office_assignment": { "location": "Smith 17" },
                "selected_courses": ["1045", "3141", "x"]
            }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["form"]["course_assignments"], serde_json::json!([1045, 3141]));
        assert_eq!(body["form"]["office_assignment"]["location"], "Smith 17");
        assert_eq!(
            body["errors"]["last_name"][0],
            "Last name must be between 1 and 50 characters."
        );
        assert_eq!(body["errors"]["selected_courses"][0], "'x' is not a valid course id.");
    }
}
