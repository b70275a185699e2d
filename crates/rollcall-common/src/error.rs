//! Error types for Rollcall
//!
//! `RollcallError` is the taxonomy shared by the registry service and the HTTP
//! layer. Each variant carries a human-readable message and an optional hint
//! telling the caller how to fix the request.

/// Application-specific error types
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RollcallError {
    #[error("{message}")]
    InvalidInput {
        message: String,
        hint: Option<String>,
    },

    #[error("{message}")]
    Unauthorized {
        message: String,
        hint: Option<String>,
    },

    #[error("{message}")]
    Forbidden {
        message: String,
        hint: Option<String>,
    },

    #[error("{message}")]
    Conflict {
        message: String,
        hint: Option<String>,
    },

    #[error("{message}")]
    UnprocessableEntity {
        message: String,
        hint: Option<String>,
    },

    #[error("{message}")]
    NotFound {
        message: String,
        hint: Option<String>,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl RollcallError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        RollcallError::InvalidInput {
            message: message.into(),
            hint: None,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        RollcallError::Unauthorized {
            message: message.into(),
            hint: None,
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        RollcallError::Forbidden {
            message: message.into(),
            hint: None,
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        RollcallError::Conflict {
            message: message.into(),
            hint: None,
        }
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        RollcallError::UnprocessableEntity {
            message: message.into(),
            hint: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        RollcallError::NotFound {
            message: message.into(),
            hint: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        RollcallError::Internal(message.into())
    }

    /// Attach a hint to the error. Internal errors never carry one.
    pub fn with_hint(mut self, value: impl Into<String>) -> Self {
        match &mut self {
            RollcallError::InvalidInput { hint, .. }
            | RollcallError::Unauthorized { hint, .. }
            | RollcallError::Forbidden { hint, .. }
            | RollcallError::Conflict { hint, .. }
            | RollcallError::UnprocessableEntity { hint, .. }
            | RollcallError::NotFound { hint, .. } => *hint = Some(value.into()),
            RollcallError::Internal(_) => {}
        }
        self
    }

    pub fn hint(&self) -> Option<&str> {
        match self {
            RollcallError::InvalidInput { hint, .. }
            | RollcallError::Unauthorized { hint, .. }
            | RollcallError::Forbidden { hint, .. }
            | RollcallError::Conflict { hint, .. }
            | RollcallError::UnprocessableEntity { hint, .. }
            | RollcallError::NotFound { hint, .. } => hint.as_deref(),
            RollcallError::Internal(_) => None,
        }
    }

    /// HTTP status code equivalent
    pub fn status_code(&self) -> u16 {
        match self {
            RollcallError::InvalidInput { .. } => 400,
            RollcallError::Unauthorized { .. } => 401,
            RollcallError::Forbidden { .. } => 403,
            RollcallError::NotFound { .. } => 404,
            RollcallError::Conflict { .. } => 409,
            RollcallError::UnprocessableEntity { .. } => 422,
            RollcallError::Internal(_) => 500,
        }
    }
}

impl From<anyhow::Error> for RollcallError {
    fn from(value: anyhow::Error) -> Self {
        RollcallError::Internal(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RollcallError::invalid_input("domain is required");
        assert_eq!(format!("{}", err), "domain is required");

        let err = RollcallError::internal("disk full");
        assert_eq!(format!("{}", err), "internal error: disk full");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(RollcallError::invalid_input("x").status_code(), 400);
        assert_eq!(RollcallError::unauthorized("x").status_code(), 401);
        assert_eq!(RollcallError::forbidden("x").status_code(), 403);
        assert_eq!(RollcallError::not_found("x").status_code(), 404);
        assert_eq!(RollcallError::conflict("x").status_code(), 409);
        assert_eq!(RollcallError::unprocessable("x").status_code(), 422);
        assert_eq!(RollcallError::internal("x").status_code(), 500);
    }

    #[test]
    fn test_hint() {
        let err = RollcallError::conflict("already registered").with_hint("send your token");
        assert_eq!(err.hint(), Some("send your token"));

        let err = RollcallError::internal("boom").with_hint("ignored");
        assert_eq!(err.hint(), None);
    }

    #[test]
    fn test_from_anyhow() {
        let err: RollcallError = anyhow::anyhow!("connection reset").into();
        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().contains("connection reset"));
    }
}
