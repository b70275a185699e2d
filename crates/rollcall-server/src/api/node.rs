//! Node API handlers
//!
//! - POST /announce - Register a node or apply a heartbeat
//! - GET /nodes - List nodes
//! - GET /nodes/{domain} - Get node detail
//! - DELETE /nodes/{domain} - Remove a node

use actix_web::{HttpRequest, HttpResponse, delete, get, http::header, post, web};
use rollcall_common::RollcallError;
use rollcall_registry::AnnounceRequest;
use serde::Deserialize;
use tracing::debug;

use crate::{
    error::AppError,
    model::{
        AppState,
        response::{NodeList, Removed},
    },
};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub include_offline: Option<String>,
}

impl ListQuery {
    fn include_offline(&self) -> bool {
        self.include_offline
            .as_deref()
            .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
    }
}

/// Extract the token from `Authorization: Bearer <token>`
pub fn bearer_token(req: &HttpRequest) -> Result<&str, RollcallError> {
    let malformed = || {
        RollcallError::unauthorized("missing or malformed Authorization header")
            .with_hint("send Authorization: Bearer <token>")
    };

    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(malformed)?;

    let (scheme, token) = value.trim().split_once(' ').ok_or_else(malformed)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(malformed());
    }
    Ok(token)
}

/// Register or heartbeat
///
/// POST /announce
///
/// 201 with the token on first registration, 200 on heartbeat.
#[post("/announce")]
pub async fn announce(
    data: web::Data<AppState>,
    body: web::Json<AnnounceRequest>,
) -> Result<HttpResponse, AppError> {
    let outcome = data.registry.announce(body.into_inner()).await?;

    if outcome.is_registered() {
        Ok(HttpResponse::Created().json(outcome))
    } else {
        Ok(HttpResponse::Ok().json(outcome))
    }
}

/// List nodes
///
/// GET /nodes?include_offline=true
#[get("/nodes")]
pub async fn list_nodes(
    data: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let nodes = data.registry.list_nodes(query.include_offline()).await?;
    debug!(count = nodes.len(), "Listed nodes");
    Ok(HttpResponse::Ok().json(NodeList::from(nodes)))
}

/// Get node detail
///
/// GET /nodes/{domain}
#[get("/nodes/{domain}")]
pub async fn get_node(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let node = data.registry.get_node(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(node))
}

/// Remove a node
///
/// DELETE /nodes/{domain}
#[delete("/nodes/{domain}")]
pub async fn remove_node(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let token = bearer_token(&req)?;
    let domain = data.registry.remove_node(&path.into_inner(), token).await?;

    Ok(HttpResponse::Ok().json(Removed {
        status: "removed",
        domain,
    }))
}
