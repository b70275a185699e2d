//! API routing configuration

use actix_web::{Scope, error::JsonPayloadError, web};
use rollcall_common::RollcallError;

use crate::error::AppError;

use super::{node, system};

/// Maximum accepted `POST /announce` body
const MAX_JSON_PAYLOAD: usize = 64 * 1024;

/// Malformed or oversized JSON bodies become 400 `{error, hint}`
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(MAX_JSON_PAYLOAD)
        .error_handler(|err: JsonPayloadError, _req| {
            let error = RollcallError::invalid_input(format!("invalid request body: {}", err))
                .with_hint("send a JSON object such as {\"domain\": \"node.example.com\"}");
            AppError::from(error).into()
        })
}

/// Create the registry routes
///
/// Routes:
/// - POST /announce - Register a node or send a heartbeat
/// - GET /nodes - List nodes (`?include_offline=true` for all)
/// - GET /nodes/{domain} - Get one node
/// - DELETE /nodes/{domain} - Remove a node (`Authorization: Bearer <token>`)
/// - GET /stats - Aggregate counters
/// - GET /healthz - Registry liveness
pub fn routes() -> Scope {
    web::scope("")
        .app_data(json_config())
        .service(node::announce)
        .service(node::list_nodes)
        .service(node::get_node)
        .service(node::remove_node)
        .service(system::stats)
        .service(system::healthz)
}
