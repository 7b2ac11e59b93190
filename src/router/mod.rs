//! Client-side routing: the portal's route table, the navigation guard, and
//! the navigator that applies guard decisions.
//!
//! SYSTEM CONTEXT
//! ==============
//! Rendering is someone else's job. This module only decides which location
//! the user ends up on, so page components can be mounted against the
//! committed [`routes::RouteMatch`].

pub mod guard;
pub mod navigator;
pub mod routes;
