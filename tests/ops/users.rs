use chrono::NaiveDate;
use rollcall::core::db;
use rollcall::core::error::RollcallError;
use rollcall::core::store::Store;
use rollcall::ops::attendance::{self, AttendanceFilter, AttendanceStatus};
use rollcall::ops::users::{self, ActivationOutcome, NewUser, Role};
use tempfile::tempdir;

fn setup() -> (tempfile::TempDir, Store) {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path().join("attendance.db"));
    db::initialize_store(&store).unwrap();
    (tmp, store)
}

fn new_user(username: &str, email: &str, role: Role) -> NewUser {
    NewUser {
        username: username.to_string(),
        password: "secret99".to_string(),
        full_name: "Test Person".to_string(),
        email: email.to_string(),
        role,
        phone: None,
        qualification: None,
        experience: None,
        job_role: None,
    }
}

#[test]
fn test_seeded_accounts_authenticate() {
    let (_tmp, store) = setup();

    let admin = users::authenticate(&store, "admin", "admin123").unwrap();
    assert_eq!(admin.role_name, "Admin");
    assert!(admin.is_admin());

    let john = users::authenticate(&store, "john.doe", "emp123").unwrap();
    assert_eq!(john.full_name, "John Doe");
    assert!(!john.is_admin());
}

#[test]
fn test_bad_credentials_rejected_uniformly() {
    let (_tmp, store) = setup();

    // Wrong password and unknown username read the same to the caller:
    // a NotFound-style credential failure, not a policy rejection.
    let wrong = users::authenticate(&store, "john.doe", "nope").unwrap_err();
    let unknown = users::authenticate(&store, "ghost", "emp123").unwrap_err();
    assert!(matches!(wrong, RollcallError::NotFound(_)));
    assert!(matches!(unknown, RollcallError::NotFound(_)));
    assert_eq!(wrong.to_string(), unknown.to_string());
}

#[test]
fn test_deactivated_account_is_gated_until_reactivated() {
    let (_tmp, store) = setup();

    // 1. Deactivate.
    let outcome = users::deactivate_user(&store, "admin", "john.doe").unwrap();
    assert_eq!(outcome, ActivationOutcome::Updated);

    // 2. Correct credentials no longer log in.
    let err = users::authenticate(&store, "john.doe", "emp123").unwrap_err();
    assert!(matches!(err, RollcallError::Policy(_)));

    // 3. Repeat deactivation is reported, not failed.
    let outcome = users::deactivate_user(&store, "admin", "john.doe").unwrap();
    assert_eq!(outcome, ActivationOutcome::AlreadyInactive);

    // 4. Reactivation clears the gate.
    let outcome = users::activate_user(&store, "admin", "john.doe").unwrap();
    assert_eq!(outcome, ActivationOutcome::Updated);
    assert!(users::authenticate(&store, "john.doe", "emp123").is_ok());
}

#[test]
fn test_deactivate_reactivate_leaves_no_attendance_side_effects() {
    let (_tmp, store) = setup();
    let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
    let now = today.and_hms_opt(9, 0, 0).unwrap();

    attendance::mark_attendance(
        &store,
        "john.doe",
        AttendanceStatus::Present,
        None,
        today,
        now,
    )
    .unwrap();

    users::deactivate_user(&store, "admin", "john.doe").unwrap();
    users::activate_user(&store, "admin", "john.doe").unwrap();

    let john = users::get_user(&store, "john.doe").unwrap();
    assert!(john.is_active);

    let filter = AttendanceFilter {
        username: Some("john.doe".to_string()),
        ..Default::default()
    };
    let records = attendance::list_attendance(&store, &filter).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, AttendanceStatus::Present);
}

#[test]
fn test_admin_self_deactivation_rejected() {
    let (_tmp, store) = setup();

    let err = users::deactivate_user(&store, "admin", "admin").unwrap_err();
    assert!(matches!(err, RollcallError::Policy(_)));
    assert!(users::get_user(&store, "admin").unwrap().is_active);
}

#[test]
fn test_cross_admin_deactivation_succeeds() {
    let (_tmp, store) = setup();

    users::add_user(
        &store,
        "admin",
        &new_user("second.admin", "second.admin@company.com", Role::Admin),
    )
    .unwrap();

    let outcome = users::deactivate_user(&store, "admin", "second.admin").unwrap();
    assert_eq!(outcome, ActivationOutcome::Updated);
    assert!(!users::get_user(&store, "second.admin").unwrap().is_active);
}

#[test]
fn test_non_admin_cannot_manage_accounts() {
    let (_tmp, store) = setup();

    let err = users::deactivate_user(&store, "john.doe", "jane.smith").unwrap_err();
    assert!(matches!(err, RollcallError::Policy(_)));

    let err = users::add_user(
        &store,
        "jane.smith",
        &new_user("intruder", "intruder@company.com", Role::Employee),
    )
    .unwrap_err();
    assert!(matches!(err, RollcallError::Policy(_)));
}

#[test]
fn test_add_user_duplicate_username_is_constraint() {
    let (_tmp, store) = setup();

    let err = users::add_user(
        &store,
        "admin",
        &new_user("john.doe", "other@company.com", Role::Employee),
    )
    .unwrap_err();
    assert!(err.is_constraint());
}

#[test]
fn test_add_user_validation_runs_before_write() {
    let (_tmp, store) = setup();

    let bad_email = new_user("valid.name", "not-an-email", Role::Employee);
    let err = users::add_user(&store, "admin", &bad_email).unwrap_err();
    assert!(matches!(err, RollcallError::Validation(_)));

    let mut short_password = new_user("valid.name", "valid@company.com", Role::Employee);
    short_password.password = "abc".to_string();
    let err = users::add_user(&store, "admin", &short_password).unwrap_err();
    assert!(matches!(err, RollcallError::Validation(_)));

    // Nothing was created by the rejected attempts.
    assert!(matches!(
        users::get_user(&store, "valid.name").unwrap_err(),
        RollcallError::NotFound(_)
    ));
}

#[test]
fn test_list_employees_excludes_admins_and_orders_active_first() {
    let (_tmp, store) = setup();
    users::deactivate_user(&store, "admin", "mike.johnson").unwrap();

    let active_only = users::list_employees(&store, false).unwrap();
    assert_eq!(active_only.len(), 2);
    assert!(active_only.iter().all(|u| u.is_active));
    assert!(active_only.iter().all(|u| u.role_name == "Employee"));

    let everyone = users::list_employees(&store, true).unwrap();
    assert_eq!(everyone.len(), 3);
    assert!(!everyone.last().unwrap().is_active);
}

#[test]
fn test_update_profile_touches_only_given_fields() {
    let (_tmp, store) = setup();

    users::update_profile(
        &store,
        "jane.smith",
        &users::ProfileUpdate {
            phone: Some("555-0199".to_string()),
            qualification: Some("BSc".to_string()),
            ..Default::default()
        },
    )
    .unwrap();

    users::update_profile(
        &store,
        "jane.smith",
        &users::ProfileUpdate {
            job_role: Some("Accountant".to_string()),
            ..Default::default()
        },
    )
    .unwrap();

    let jane = users::get_user(&store, "jane.smith").unwrap();
    assert_eq!(jane.phone.as_deref(), Some("555-0199"));
    assert_eq!(jane.qualification.as_deref(), Some("BSc"));
    assert_eq!(jane.job_role.as_deref(), Some("Accountant"));
    assert!(jane.experience.is_none());

    let err = users::update_profile(&store, "jane.smith", &users::ProfileUpdate::default())
        .unwrap_err();
    assert!(matches!(err, RollcallError::Validation(_)));
}

#[test]
fn test_deactivated_user_profile_update_rejected() {
    let (_tmp, store) = setup();
    users::deactivate_user(&store, "admin", "john.doe").unwrap();

    let err = users::update_profile(
        &store,
        "john.doe",
        &users::ProfileUpdate {
            phone: Some("555-0100".to_string()),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, RollcallError::Policy(_)));

    // The stored profile is untouched.
    let john = users::get_user(&store, "john.doe").unwrap();
    assert!(john.phone.is_none());

    // Reactivation makes the same update valid again.
    users::activate_user(&store, "admin", "john.doe").unwrap();
    let john = users::update_profile(
        &store,
        "john.doe",
        &users::ProfileUpdate {
            phone: Some("555-0100".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(john.phone.as_deref(), Some("555-0100"));
}
