//! HTTP response bodies

use actix_web::{HttpResponse, HttpResponseBuilder, http::StatusCode};
use rollcall_persistence::NodeRecord;
use serde::Serialize;

/// Body of every error response
#[derive(Clone, Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            error: error.into(),
            hint,
        }
    }

    pub fn http_response(status: u16, error: impl Into<String>, hint: Option<String>) -> HttpResponse {
        HttpResponseBuilder::new(
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        )
        .json(Self::new(error, hint))
    }
}

/// `GET /nodes`
#[derive(Clone, Debug, Serialize)]
pub struct NodeList {
    pub total: usize,
    pub nodes: Vec<NodeRecord>,
}

impl From<Vec<NodeRecord>> for NodeList {
    fn from(nodes: Vec<NodeRecord>) -> Self {
        Self {
            total: nodes.len(),
            nodes,
        }
    }
}

/// `DELETE /nodes/{domain}`
#[derive(Clone, Debug, Serialize)]
pub struct Removed {
    pub status: &'static str,
    pub domain: String,
}

/// `GET /healthz`
#[derive(Clone, Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
