//! Data models for appliance API responses.
//!
//! Only the shapes the access layer itself needs live here: token exchange,
//! cluster membership, the caller identity, access requests and events.

mod access_request;
mod auth;
mod cluster;
mod event;
mod identity;

pub use access_request::{AccessRequest, RequestPhase};
pub use auth::{LoginResponse, RstsTokenResponse};
pub(crate) use auth::LoginRequest;
pub use cluster::ClusterMember;
pub use event::Event;
pub(crate) use event::{FRAME_CLOSE, FRAME_INVOCATION, FRAME_PING, Frame};
pub use identity::UserIdentity;
