// Error handling for the HTTP layer
// Wraps anyhow so handlers can `?` anything; RollcallError maps to its status

use std::fmt::{Display, Formatter};

use actix_web::{HttpResponse, http::StatusCode};
use rollcall_common::RollcallError;
use tracing::error;

use crate::model::response::ErrorBody;

// Local wrapper for application errors to implement actix-web error handling
// (Cannot impl foreign trait for foreign type due to orphan rules)
#[derive(Debug)]
pub struct AppError {
    inner: anyhow::Error,
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError { inner: value }
    }
}

impl From<RollcallError> for AppError {
    fn from(value: RollcallError) -> Self {
        AppError {
            inner: anyhow::Error::new(value),
        }
    }
}

impl AppError {
    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }

    pub fn downcast_ref<E: std::error::Error + Send + Sync + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }
}

impl actix_web::error::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.downcast_ref::<RollcallError>()
            .and_then(|e| StatusCode::from_u16(e.status_code()).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        match self.downcast_ref::<RollcallError>() {
            Some(e) => ErrorBody::http_response(
                e.status_code(),
                e.to_string(),
                e.hint().map(str::to_string),
            ),
            None => {
                error!("Unhandled error: {:#}", self.inner);
                ErrorBody::http_response(500, "internal error", None)
            }
        }
    }
}
