use serde_json::json;

use super::*;
use crate::net::api;
use crate::net::transport::Method;
use crate::net::types::{AccountStatus, Role, UserProfile};
use crate::router::routes::{RouteDescriptor, WAITING_APPROVAL_PATH};
use crate::state::storage::{MemoryStorage, StorageBackend};
use crate::state::token_store::TokenStore;
use crate::test_support::{MockTransport, not_found, ok_json, profile, profile_json, session_over, test_config};
use crate::util::clock::now_ms;

fn storage_for(user: Option<&UserProfile>, checked_at_ms: i64) -> Rc<MemoryStorage> {
    let storage = Rc::new(MemoryStorage::default());
    if let Some(user) = user {
        let backend: Rc<dyn StorageBackend> = storage.clone();
        TokenStore::new(backend).save("a1", "r1", user, checked_at_ms).unwrap();
    }
    storage
}

fn navigator_for(user: Option<&UserProfile>) -> (Navigator, Rc<MemoryStorage>) {
    let storage = storage_for(user, now_ms());
    let session = session_over(MockTransport::new(|_| ok_json(&json!({}))), storage.clone());
    (Navigator::new(session, Rc::new(RouteTable::portal()), &test_config()), storage)
}

fn committed_path(outcome: NavigationOutcome) -> String {
    match outcome {
        NavigationOutcome::Committed(location) => location.full_path,
        NavigationOutcome::Superseded => panic!("navigation was superseded"),
    }
}

#[tokio::test]
async fn first_navigation_waits_for_init() {
    let teacher = profile(4, Role::Teacher, AccountStatus::Active);
    let (navigator, _storage) = navigator_for(Some(&teacher));
    assert!(!navigator.session().is_initialized());

    let path = committed_path(navigator.navigate("/dashboard").await.unwrap());

    assert_eq!(path, "/dashboard");
    assert!(navigator.session().is_initialized());
}

#[tokio::test]
async fn anonymous_user_is_allowed_on_landing() {
    let (navigator, _storage) = navigator_for(None);
    assert_eq!(committed_path(navigator.navigate("/").await.unwrap()), "/");
}

#[tokio::test]
async fn anonymous_user_is_sent_to_login_and_back() {
    let (navigator, _storage) = navigator_for(None);

    let path = committed_path(navigator.navigate("/course/42?tab=files").await.unwrap());

    assert!(path.starts_with("/login?redirect="));
    assert_eq!(navigator.login_return_path(), "/course/42?tab=files");
}

#[tokio::test]
async fn unknown_path_lands_on_dashboard_for_active_user() {
    let student = profile(5, Role::Student, AccountStatus::Active);
    let (navigator, _storage) = navigator_for(Some(&student));
    assert_eq!(committed_path(navigator.navigate("/no/such/page").await.unwrap()), "/dashboard");
}

#[tokio::test]
async fn teacher_edits_and_student_reads() {
    let teacher = profile(4, Role::Teacher, AccountStatus::Active);
    let (navigator, _storage) = navigator_for(Some(&teacher));
    assert_eq!(committed_path(navigator.navigate("/course/42/edit").await.unwrap()), "/course/42/edit");

    let student = profile(5, Role::Student, AccountStatus::Active);
    let (navigator, _storage) = navigator_for(Some(&student));
    assert_eq!(committed_path(navigator.navigate("/course/42/edit").await.unwrap()), "/course/42");
}

#[tokio::test]
async fn blocked_user_is_signed_out_to_login() {
    let blocked = profile(6, Role::Student, AccountStatus::Blocked);
    let (navigator, storage) = navigator_for(Some(&blocked));

    let path = committed_path(navigator.navigate("/dashboard").await.unwrap());

    assert_eq!(path, "/login");
    assert!(!navigator.session().is_authenticated());
    assert!(storage.is_empty());
}

#[tokio::test]
async fn pending_user_ends_on_waiting_approval() {
    let pending = profile(8, Role::Teacher, AccountStatus::Pending);
    let (navigator, _storage) = navigator_for(Some(&pending));
    for path in ["/", "/login", "/admin/users", "/messages"] {
        assert_eq!(committed_path(navigator.navigate(path).await.unwrap()), WAITING_APPROVAL_PATH, "{path}");
    }
}

#[tokio::test]
async fn newer_navigation_supersedes_one_awaiting_init() {
    let user = profile(4, Role::Teacher, AccountStatus::Active);
    let reply = profile_json(&user);
    let storage = storage_for(Some(&user), 0);
    let transport = MockTransport::yielding(move |req| match req.endpoint() {
        api::ME => ok_json(&reply),
        _ => not_found(),
    });
    let session = session_over(transport.clone(), storage);
    let navigator = Navigator::new(session, Rc::new(RouteTable::portal()), &test_config());

    let (first, second) = tokio::join!(navigator.navigate("/courses"), navigator.navigate("/messages"));

    assert_eq!(first.unwrap(), NavigationOutcome::Superseded);
    assert_eq!(committed_path(second.unwrap()), "/messages");
    assert_eq!(navigator.current().map(|c| c.full_path).as_deref(), Some("/messages"));
    assert_eq!(transport.count(Method::Get, api::ME), 1);
}

#[tokio::test]
async fn redirect_loop_is_reported() {
    let student = profile(5, Role::Student, AccountStatus::Active);
    let storage = storage_for(Some(&student), now_ms());
    let session = session_over(MockTransport::new(|_| not_found()), storage);
    let table = RouteTable::new(vec![RouteDescriptor::new("Home", "/").guest_only()]);
    let navigator = Navigator::new(session, Rc::new(table), &test_config());

    let err = navigator.navigate("/").await.unwrap_err();

    assert!(matches!(err, NavigationError::RedirectLoop { .. }));
    assert_eq!(navigator.current(), None);
}

#[tokio::test]
async fn revalidate_after_logout_moves_to_login() {
    let student = profile(5, Role::Student, AccountStatus::Active);
    let (navigator, _storage) = navigator_for(Some(&student));
    navigator.navigate("/messages").await.unwrap();

    navigator.session().logout().await;
    let path = committed_path(navigator.revalidate().await.unwrap());

    assert_eq!(path, "/login?redirect=%2Fmessages");
}
