//! Networking modules for the portal REST API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `transport` performs raw exchanges, `client` layers the interceptor
//! pipeline and refresh-and-replay, `api` names the endpoints, `types`
//! defines the wire schema, and `admin` wraps account moderation.

pub mod admin;
pub mod api;
pub mod client;
pub mod transport;
pub mod types;
