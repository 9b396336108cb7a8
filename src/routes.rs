use actix_web::web;

use crate::errors::AppError;
use crate::handlers::{department, instructor};

/// Registers every route. `create` is registered ahead of `{id}` so it is not
/// taken for an id.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .service(
        web::scope("/departments")
            .route("", web::get().to(department::list_departments))
            .route("/create", web::get().to(department::create_department_form))
            .route("/create", web::post().to(department::create_department))
            .route("/{id}", web::get().to(department::department_details))
            .route("/{id}/edit", web::get().to(department::edit_department_form))
            .route("/{id}/edit", web::post().to(department::edit_department))
            .route("/{id}/delete", web::get().to(department::delete_department_confirm))
            .route("/{id}/delete", web::post().to(department::delete_department)),
    )
    .service(
        web::scope("/instructors")
            .route("", web::get().to(instructor::list_instructors))
            .route("/create", web::get().to(instructor::create_instructor_form))
            .route("/create", web::post().to(instructor::create_instructor))
            .route("/{id}", web::get().to(instructor::instructor_details))
            .route("/{id}/edit", web::get().to(instructor::edit_instructor_form))
            .route("/{id}/edit", web::post().to(instructor::edit_instructor))
            .route("/{id}/delete", web::get().to(instructor::delete_instructor_confirm))
            .route("/{id}/delete", web::post().to(instructor::delete_instructor)),
    );
}
