//! Shared fixtures for unit tests: a scripted transport and profile builders.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::net::transport::{ApiRequest, ApiResponse, Method, Transport};
use crate::net::types::{AccountStatus, Role, UserProfile};
use crate::state::session::SessionManager;
use crate::state::storage::{MemoryStorage, StorageBackend};
use crate::state::token_store::TokenStore;

pub const BASE_URL: &str = "http://portal.test/api";

type Handler = Box<dyn Fn(&ApiRequest) -> Result<ApiResponse, ClientError>>;

/// Transport that answers from a closure and records every request it sees.
///
/// With `yielding`, each exchange suspends once before answering so that
/// concurrently polled futures genuinely overlap.
pub struct MockTransport {
    handler: Handler,
    calls: RefCell<Vec<ApiRequest>>,
    yielding: Cell<bool>,
}

impl MockTransport {
    pub fn new(handler: impl Fn(&ApiRequest) -> Result<ApiResponse, ClientError> + 'static) -> Rc<Self> {
        Rc::new(Self { handler: Box::new(handler), calls: RefCell::new(Vec::new()), yielding: Cell::new(false) })
    }

    pub fn yielding(handler: impl Fn(&ApiRequest) -> Result<ApiResponse, ClientError> + 'static) -> Rc<Self> {
        let transport = Self::new(handler);
        transport.yielding.set(true);
        transport
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|r| r.method == method && r.endpoint() == path)
            .count()
    }

    pub fn total(&self) -> usize {
        self.calls.borrow().len()
    }
}

#[async_trait(?Send)]
impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        self.calls.borrow_mut().push(request.clone());
        if self.yielding.get() {
            tokio::task::yield_now().await;
        }
        (self.handler)(request)
    }
}

pub fn ok_json(value: &Value) -> Result<ApiResponse, ClientError> {
    Ok(ApiResponse::new(200, value.to_string()))
}

pub fn status_json(status: u16, value: &Value) -> Result<ApiResponse, ClientError> {
    Ok(ApiResponse::new(status, value.to_string()))
}

pub fn unauthorized() -> Result<ApiResponse, ClientError> {
    status_json(401, &json!({ "detail": "Could not validate credentials" }))
}

pub fn not_found() -> Result<ApiResponse, ClientError> {
    status_json(404, &json!({ "error": "not found" }))
}

pub fn bearer(request: &ApiRequest) -> Option<&str> {
    request.header_value("Authorization").and_then(|v| v.strip_prefix("Bearer "))
}

pub fn profile(id: i64, role: Role, status: AccountStatus) -> UserProfile {
    UserProfile {
        id,
        email: format!("user{id}@fenix.test"),
        role,
        status,
        full_name: Some(format!("User {id}")),
        course: None,
        group: None,
        created_at: None,
        confirmed_at: None,
        confirmed_by: None,
    }
}

pub fn profile_json(user: &UserProfile) -> Value {
    serde_json::to_value(user).unwrap()
}

pub fn token_body(access: &str, refresh: &str, user: Option<&UserProfile>) -> Value {
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "token_type": "bearer",
        "user": user.map(profile_json),
    })
}

pub fn test_config() -> ClientConfig {
    ClientConfig::with_base_url(BASE_URL)
}

/// A session over fresh in-memory storage.
pub fn session_with(transport: Rc<MockTransport>) -> (SessionManager, Rc<MemoryStorage>) {
    let storage = Rc::new(MemoryStorage::default());
    let session = session_over(transport, storage.clone());
    (session, storage)
}

/// A session over caller-provided (possibly pre-seeded) storage.
pub fn session_over(transport: Rc<MockTransport>, storage: Rc<MemoryStorage>) -> SessionManager {
    let backend: Rc<dyn StorageBackend> = storage;
    SessionManager::new(&test_config(), transport, TokenStore::new(backend))
}
