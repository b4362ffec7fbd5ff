//! Raw appliance endpoints that run before a session exists.
//!
//! Everything here takes a plain `reqwest::Client` and an origin. Calls made
//! with a session go through the dispatcher in `client::dispatch`.

mod auth;
mod request;

pub use auth::{Grant, login_response, provider_scope, rsts_token};
pub use request::{SUCCESS_STATUSES, check_response, is_success_status, send_checked};
