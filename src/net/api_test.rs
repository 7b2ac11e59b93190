use super::*;

#[test]
fn credential_endpoints_are_login_register_refresh() {
    assert!(is_credential_endpoint(LOGIN));
    assert!(is_credential_endpoint(REGISTER));
    assert!(is_credential_endpoint(REFRESH));
    assert!(!is_credential_endpoint(ME));
    assert!(!is_credential_endpoint(LOGOUT));
    assert!(!is_credential_endpoint(CHECK_STATUS));
}

#[test]
fn credential_endpoint_check_ignores_query_and_trailing_slash() {
    assert!(is_credential_endpoint("/auth/refresh/"));
    assert!(is_credential_endpoint("/auth/login?next=%2F"));
    assert!(!is_credential_endpoint("/auth/loginx"));
}

#[test]
fn admin_user_endpoints_format_expected_paths() {
    assert_eq!(user_status_endpoint(42), "/admin/users/42/status");
    assert_eq!(approve_user_endpoint(42), "/admin/users/42/approve");
    assert_eq!(reject_user_endpoint(42), "/admin/users/42/reject");
}
