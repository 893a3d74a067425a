pub mod auth;
pub mod cache;
pub mod configuration;
pub mod domain;
pub mod error;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod session;
pub mod startup;
pub mod store;
pub mod telemetry;
pub mod users;
pub mod validators;
