use super::*;

#[test]
fn set_header_replaces_case_insensitively() {
    let mut req = ApiRequest::get("/auth/me").header("accept", "text/plain");
    req.set_header("Accept", "application/json");
    assert_eq!(req.headers.len(), 1);
    assert_eq!(req.header_value("ACCEPT"), Some("application/json"));
}

#[test]
fn json_body_is_serialized() {
    let req = ApiRequest::post("/auth/refresh").json(&serde_json::json!({ "refresh_token": "r1" })).unwrap();
    assert_eq!(req.method, Method::Post);
    assert_eq!(req.body, Some(serde_json::json!({ "refresh_token": "r1" })));
}

#[test]
fn endpoint_strips_query_string() {
    assert_eq!(ApiRequest::get("/admin/users?page=2").endpoint(), "/admin/users");
}

#[test]
fn error_for_status_passes_success_through() {
    let resp = ApiResponse::new(204, "");
    assert_eq!(resp.clone().error_for_status(false), Ok(resp));
}

#[test]
fn error_for_status_classifies_failures() {
    let resp = ApiResponse::new(400, r#"{"error": "User already exists"}"#);
    assert_eq!(
        resp.error_for_status(true),
        Err(ClientError::Validation { status: 400, message: "User already exists".into() })
    );
}

#[test]
fn json_decode_failure_is_decode_error() {
    let resp = ApiResponse::new(200, "not json");
    assert!(matches!(resp.json::<serde_json::Value>(), Err(ClientError::Decode(_))));
}
