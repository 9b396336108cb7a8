pub mod department;
pub mod instructor;

use actix_web::http::{header, StatusCode};
use actix_web::HttpResponse;
use serde::Serialize;

use crate::utils::validation::FormErrors;

/// A form sent back to the client together with the reasons it was not saved.
#[derive(Serialize)]
struct FormResponse<T: Serialize> {
    form: T,
    errors: FormErrors,
}

pub(crate) fn redisplay<T: Serialize>(status: StatusCode, form: T, errors: FormErrors) -> HttpResponse {
    HttpResponse::build(status).json(FormResponse { form, errors })
}

pub(crate) fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}
