//! Wiz security-findings proxy.
//!
//! The server half (`routes`, `client`, `auth`) holds the Wiz service
//! credentials and answers a small REST surface by forwarding GraphQL
//! queries to the Wiz API. The client half (`api`, `filters`) turns a
//! catalog entity's annotations into typed filters and calls that surface.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod filters;
pub mod logging;
pub mod queries;
pub mod responses;
pub mod routes;
pub mod types;

pub use config::Config;
pub use error::{Result, WizError, WizErrorType};
