//! # fenix-client
//!
//! Session and navigation core for the FENIX education portal frontend.
//!
//! This crate owns the parts of the portal client that decide *who may see
//! what*: the persisted token pair, the session lifecycle (login, register,
//! profile refresh, logout), the authenticated HTTP client with one-shot
//! refresh-and-replay, and the navigation guard that runs before every route
//! transition. Page rendering lives elsewhere; it consumes the [`bootstrap::App`]
//! handed to its mount callback.
//!
//! Browser builds enable the `hydrate` feature (`localStorage` + `gloo-net`);
//! native builds use the default `native` feature (`reqwest`).

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod net;
pub mod router;
pub mod state;
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;

pub use bootstrap::{App, bootstrap};
pub use config::ClientConfig;
pub use error::ClientError;
pub use net::admin::AdminApi;
pub use net::client::ApiClient;
pub use router::navigator::{NavigationOutcome, Navigator};
pub use router::routes::{RouteDescriptor, RouteTable};
pub use state::session::SessionManager;
pub use state::token_store::TokenStore;
