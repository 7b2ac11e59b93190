use super::*;

fn student_registration() -> RegisterRequest {
    RegisterRequest {
        email: "ivan@fenix.test".into(),
        full_name: "Ivan Petrov".into(),
        password: "secret1".into(),
        role: Role::Student,
        course: Some("2".into()),
        group: Some("CS-21".into()),
    }
}

// =============================================================================
// Role / AccountStatus
// =============================================================================

#[test]
fn role_uses_snake_case_on_the_wire() {
    assert_eq!(serde_json::to_string(&Role::DepartmentHead).unwrap(), "\"department_head\"");
    let role: Role = serde_json::from_str("\"teacher\"").unwrap();
    assert_eq!(role, Role::Teacher);
}

#[test]
fn admin_tier_is_admin_and_department_head() {
    let admins: Vec<Role> = Role::ALL.into_iter().filter(|r| r.is_admin_tier()).collect();
    assert_eq!(admins, vec![Role::DepartmentHead, Role::Admin]);
}

#[test]
fn teacher_tier_excludes_only_students() {
    let tier: Vec<Role> = Role::ALL.into_iter().filter(|r| r.is_teacher_tier()).collect();
    assert_eq!(tier, vec![Role::Teacher, Role::DepartmentHead, Role::Admin]);
}

#[test]
fn role_and_status_parse_from_str() {
    assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
    assert!("root".parse::<Role>().is_err());
    assert_eq!("blocked".parse::<AccountStatus>(), Ok(AccountStatus::Blocked));
}

#[test]
fn locked_out_statuses() {
    assert!(AccountStatus::Rejected.is_locked_out());
    assert!(AccountStatus::Blocked.is_locked_out());
    assert!(!AccountStatus::Pending.is_locked_out());
    assert!(!AccountStatus::Active.is_locked_out());
}

// =============================================================================
// UserProfile
// =============================================================================

#[test]
fn profile_decodes_full_backend_shape() {
    let json = r#"{
        "id": 7, "email": "anna@fenix.test", "full_name": "Anna", "role": "teacher",
        "status": "active", "course": null, "group": null,
        "created_at": "2025-09-01T10:00:00", "confirmed_at": "2025-09-02T08:00:00", "confirmed_by": 1
    }"#;
    let user: UserProfile = serde_json::from_str(json).unwrap();
    assert_eq!(user.id, 7);
    assert!(user.is_teacher());
    assert!(!user.is_admin());
    assert_eq!(user.confirmed_by, Some(1));
    assert_eq!(user.display_name(), "Anna");
}

#[test]
fn profile_decodes_minimal_shape() {
    let user: UserProfile =
        serde_json::from_str(r#"{"id": 1, "email": "a@b.c", "role": "admin", "status": "pending"}"#).unwrap();
    assert!(user.is_admin());
    assert_eq!(user.display_name(), "a@b.c");
}

#[test]
fn profile_rejects_unknown_role() {
    let result = serde_json::from_str::<UserProfile>(r#"{"id": 1, "email": "a@b.c", "role": "root", "status": "active"}"#);
    assert!(result.is_err());
}

// =============================================================================
// RegisterRequest::validate
// =============================================================================

#[test]
fn valid_student_registration_passes() {
    assert_eq!(student_registration().validate(), Ok(()));
}

#[test]
fn registration_rejects_bad_email() {
    let mut req = student_registration();
    req.email = "ivan.fenix.test".into();
    assert_eq!(req.validate().unwrap_err().to_string(), "Invalid email format");
}

#[test]
fn registration_rejects_short_password() {
    let mut req = student_registration();
    req.password = "12345".into();
    assert!(matches!(req.validate(), Err(ClientError::Validation { status: 400, .. })));
}

#[test]
fn student_registration_requires_course_and_group() {
    let mut req = student_registration();
    req.course = None;
    assert_eq!(req.validate().unwrap_err().to_string(), "Students must specify a course");

    let mut req = student_registration();
    req.group = Some("  ".into());
    assert_eq!(req.validate().unwrap_err().to_string(), "Students must specify a group");
}

#[test]
fn teacher_registration_needs_no_course() {
    let mut req = student_registration();
    req.role = Role::Teacher;
    req.course = None;
    req.group = None;
    assert_eq!(req.validate(), Ok(()));
    let json = serde_json::to_value(&req).unwrap();
    assert!(json.get("course").is_none());
}

// =============================================================================
// TokenResponse / UserFilter
// =============================================================================

#[test]
fn token_response_defaults_token_type_and_user() {
    let tokens: TokenResponse = serde_json::from_str(r#"{"access_token": "a", "refresh_token": "r"}"#).unwrap();
    assert_eq!(tokens.token_type, "bearer");
    assert!(tokens.user.is_none());
}

#[test]
fn user_filter_query_includes_only_set_filters() {
    let filter = UserFilter { status: Some(AccountStatus::Pending), role: None, page: 2, limit: 50 };
    assert_eq!(
        filter.to_query(),
        vec![
            ("status".to_owned(), "pending".to_owned()),
            ("page".to_owned(), "2".to_owned()),
            ("limit".to_owned(), "50".to_owned()),
        ]
    );
}

#[test]
fn user_filter_clamps_zero_page() {
    let filter = UserFilter { page: 0, ..UserFilter::default() };
    assert!(filter.to_query().contains(&("page".to_owned(), "1".to_owned())));
}
