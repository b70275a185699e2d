//! HTTP API handlers

pub mod node;
pub mod route;
pub mod system;
