//! HTTP server setup.

use std::sync::Arc;

use actix_web::{App, HttpServer, dev::Server, middleware::Logger, web};

use crate::{
    api,
    middleware::rate_limit::{RateLimiter, RateLimiterState},
    model::AppState,
};

/// Creates and binds the main HTTP server.
///
/// All workers share one rate limiter state, so limits hold per client across workers.
pub fn main_server(
    app_state: Arc<AppState>,
    rate_limiter: Arc<RateLimiterState>,
    address: String,
    port: u16,
) -> Result<Server, std::io::Error> {
    Ok(HttpServer::new(move || {
        App::new()
            .wrap(RateLimiter::from_state(rate_limiter.clone()))
            .wrap(Logger::default())
            .app_data(web::Data::from(app_state.clone()))
            .service(api::route::routes())
    })
    .bind((address, port))?
    .run())
}
