use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::error::AppError;

/// Wrapper every route replies with.
///
/// The transport status is always `200 OK`; `statusCode` inside the body
/// carries the outcome.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub status_code: u16,
    pub message: String,
    pub exception: Option<String>,
    pub result: Option<Vec<T>>,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(message: impl Into<String>, rows: Vec<T>) -> Self {
        Self {
            status_code: 200,
            message: message.into(),
            exception: None,
            result: Some(rows),
        }
    }

    pub fn failure(err: &AppError, message: impl Into<String>) -> Self {
        Self {
            status_code: err.status_code().as_u16(),
            message: message.into(),
            exception: err.detail(),
            result: Some(Vec::new()),
        }
    }

    /// Inserts report failures with a null `result`.
    pub fn without_result(mut self) -> Self {
        self.result = None;
        self
    }

    pub fn respond(&self) -> HttpResponse {
        HttpResponse::Ok().json(self)
    }
}
