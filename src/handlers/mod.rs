//! HTTP handlers for the `/api` routes.
//!
//! Each handler validates its input, takes one pooled connection for the
//! duration of the request and replies with an [`Envelope`].

pub mod cities;
pub mod docs;
pub mod envelope;
pub mod requests;
pub mod students;

use actix_files::Files;
use actix_web::guard::{self, GuardContext};
use actix_web::http::header;
use actix_web::{web, HttpResponse};
use serde::Serialize;
use tracing::error;

use crate::config::UploadConfig;
use crate::error::AppError;
use crate::Result;
pub use envelope::Envelope;

/// Registers the `/api` scope together with the body extractor settings it needs.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        AppError::ValidationError(format!("Invalid JSON body: {}", err)).into()
    }))
    .app_data(web::FormConfig::default().error_handler(|err, _req| {
        AppError::ValidationError(format!("Invalid form body: {}", err)).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        AppError::ValidationError(format!("Invalid query string: {}", err)).into()
    }))
    .service(
        web::scope("/api")
            .route("/docs", web::get().to(docs::openapi))
            .route("/city", web::get().to(cities::get_cities))
            .route("/city/", web::get().to(cities::get_cities))
            .route("/city", web::post().to(cities::create_city))
            .route("/city/{id}", web::get().to(cities::get_city))
            .route("/city/{id}", web::put().to(cities::update_city))
            .route("/city/{id}", web::delete().to(cities::delete_city))
            .route("/student", web::get().to(students::get_students))
            .route("/student/", web::get().to(students::get_students))
            .route(
                "/student",
                web::post()
                    .guard(guard::fn_guard(is_multipart))
                    .to(students::create_student),
            )
            .route("/student", web::post().to(students::create_student_from_body))
            .route("/student/{id}", web::get().to(students::get_student))
            .route("/student/{id}", web::put().to(students::update_student))
            .route("/student/{id}", web::delete().to(students::delete_student)),
    );
}

/// Serves previously uploaded images. The directory must already exist.
pub fn configure_uploads(cfg: &mut web::ServiceConfig, uploads: &UploadConfig) {
    cfg.service(Files::new(&uploads.url_prefix, &uploads.dir));
}

fn is_multipart(ctx: &GuardContext) -> bool {
    ctx.head()
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map_or(false, |value| value.trim_start().to_ascii_lowercase().starts_with("multipart/"))
}

fn reply<T: Serialize>(
    route: &str,
    outcome: Result<Vec<T>>,
    success: &str,
    failure: &str,
) -> HttpResponse {
    match outcome {
        Ok(rows) => Envelope::success(success, rows).respond(),
        Err(e) => {
            error!("Error in {}: {}", route, e);
            Envelope::<T>::failure(&e, failure).respond()
        }
    }
}

/// Like [`reply`], but failures report the error's own message and a null result.
fn reply_insert<T: Serialize>(route: &str, outcome: Result<Vec<T>>, success: &str) -> HttpResponse {
    match outcome {
        Ok(rows) => Envelope::success(success, rows).respond(),
        Err(e) => {
            error!("Error in {}: {}", route, e);
            Envelope::<T>::failure(&e, e.message()).without_result().respond()
        }
    }
}
