use serde_json::json;

use super::*;
use crate::net::transport::Method;
use crate::net::types::{LoginRequest, Role};
use crate::test_support::{MockTransport, bearer, ok_json, profile, profile_json, session_with, status_json, token_body};

async fn signed_in_admin(transport: std::rc::Rc<MockTransport>) -> AdminApi {
    let (session, _storage) = session_with(transport);
    session.login(&LoginRequest::new("admin@fenix.test", "secret1")).await.unwrap();
    AdminApi::new(session)
}

fn admin_backend() -> std::rc::Rc<MockTransport> {
    let admin = profile(1, Role::Admin, AccountStatus::Active);
    let pending = profile(2, Role::Student, AccountStatus::Pending);
    MockTransport::new(move |req| match (req.method, req.endpoint()) {
        (Method::Post, api::LOGIN) => ok_json(&token_body("adm", "r1", Some(&admin))),
        (Method::Get, api::ADMIN_USERS | api::ADMIN_PENDING_USERS) => ok_json(&json!({
            "users": [profile_json(&pending)],
            "total": 1,
            "page": 1,
            "pages": 1,
        })),
        (Method::Post, "/admin/users/2/approve") => ok_json(&json!({
            "success": true,
            "message": "User approved",
            "user": profile_json(&profile(2, Role::Student, AccountStatus::Active)),
        })),
        (Method::Put, "/admin/users/2/status") => ok_json(&json!({ "success": true, "message": "updated" })),
        _ => status_json(404, &json!({ "detail": "Not found" })),
    })
}

#[tokio::test]
async fn list_users_sends_filter_and_bearer() {
    let transport = admin_backend();
    let admin = signed_in_admin(transport.clone()).await;
    let filter = UserFilter { status: Some(AccountStatus::Pending), role: Some(Role::Student), ..UserFilter::default() };

    let page = admin.list_users(&filter).await.unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.users[0].status, AccountStatus::Pending);
    let call = transport.calls().into_iter().find(|r| r.endpoint() == api::ADMIN_USERS).unwrap();
    assert_eq!(bearer(&call), Some("adm"));
    assert!(call.query.contains(&("status".to_owned(), "pending".to_owned())));
    assert!(call.query.contains(&("role".to_owned(), "student".to_owned())));
    assert!(call.query.contains(&("page".to_owned(), "1".to_owned())));
}

#[tokio::test]
async fn pending_users_pages() {
    let transport = admin_backend();
    let admin = signed_in_admin(transport.clone()).await;

    admin.pending_users(3, 10).await.unwrap();

    let call = transport.calls().into_iter().find(|r| r.endpoint() == api::ADMIN_PENDING_USERS).unwrap();
    assert_eq!(call.query, vec![("page".to_owned(), "3".to_owned()), ("limit".to_owned(), "10".to_owned())]);
}

#[tokio::test]
async fn approve_returns_updated_account() {
    let admin = signed_in_admin(admin_backend()).await;

    let change = admin.approve(2).await.unwrap();

    assert!(change.success);
    assert_eq!(change.user.map(|u| u.status), Some(AccountStatus::Active));
}

#[tokio::test]
async fn set_status_puts_status_body() {
    let transport = admin_backend();
    let admin = signed_in_admin(transport.clone()).await;

    admin.set_status(2, AccountStatus::Blocked).await.unwrap();

    let call = transport.calls().into_iter().find(|r| r.method == Method::Put).unwrap();
    assert_eq!(call.body, Some(json!({ "status": "blocked" })));
}

#[tokio::test]
async fn unknown_account_surfaces_validation_error() {
    let admin = signed_in_admin(admin_backend()).await;

    let err = admin.reject(99).await.unwrap_err();

    assert_eq!(err, ClientError::Validation { status: 404, message: "Not found".into() });
}
