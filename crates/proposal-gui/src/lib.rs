//! Web front end for the proposal generator: a single-page form plus a JSON API.

pub mod config;
pub mod error;
mod metrics;
pub mod render;
pub mod routes;
pub mod state;
