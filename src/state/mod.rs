//! Session state: durable storage backends, the token store written through
//! on every change, and the session manager that owns both.

pub mod session;
pub mod storage;
pub mod token_store;
