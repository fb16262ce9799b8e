use chrono::{NaiveDate, NaiveDateTime};
use rollcall::core::db;
use rollcall::core::error::RollcallError;
use rollcall::core::store::Store;
use rollcall::ops::leave::{self, LeaveDecision, LeaveStatus, LeaveType};
use rollcall::ops::users;
use tempfile::tempdir;

fn setup() -> (tempfile::TempDir, Store) {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path().join("attendance.db"));
    db::initialize_store(&store).unwrap();
    (tmp, store)
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
}

fn now() -> NaiveDateTime {
    today().and_hms_opt(10, 0, 0).unwrap()
}

fn apply(store: &Store, username: &str) -> leave::LeaveRequest {
    leave::apply_leave(
        store,
        username,
        LeaveType::Sick,
        day(5),
        day(6),
        "Recovering from a bad flu",
        today(),
        now(),
    )
    .unwrap()
}

#[test]
fn test_apply_creates_pending_request() {
    let (_tmp, store) = setup();

    let request = apply(&store, "john.doe");
    assert_eq!(request.status, LeaveStatus::Pending);
    assert_eq!(request.days(), 2);
    assert!(request.reviewed_by.is_none());
    assert!(request.reviewed_at.is_none());
}

#[test]
fn test_review_approves_once_then_rejects_re_review() {
    let (_tmp, store) = setup();
    let request = apply(&store, "john.doe");

    // 1. First review lands atomically: status + reviewer + timestamp.
    let reviewed = leave::review_leave(
        &store,
        "admin",
        request.leave_id,
        LeaveDecision::Approve,
        Some("Get well soon"),
        now(),
    )
    .unwrap();
    assert_eq!(reviewed.status, LeaveStatus::Approved);
    assert_eq!(reviewed.reviewer_name.as_deref(), Some("System Administrator"));
    assert!(reviewed.reviewed_at.is_some());
    assert_eq!(reviewed.admin_remarks.as_deref(), Some("Get well soon"));

    // 2. Second review of any kind is a policy violation.
    let err = leave::review_leave(
        &store,
        "admin",
        request.leave_id,
        LeaveDecision::Reject,
        None,
        now(),
    )
    .unwrap_err();
    assert!(matches!(err, RollcallError::Policy(_)));

    // 3. The decision is unchanged.
    let requests = leave::list_leave(&store, Some("john.doe"), None).unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].status, LeaveStatus::Approved);
}

#[test]
fn test_reject_path_records_reviewer() {
    let (_tmp, store) = setup();
    let request = apply(&store, "jane.smith");

    let reviewed = leave::review_leave(
        &store,
        "admin",
        request.leave_id,
        LeaveDecision::Reject,
        Some("Short staffed that week"),
        now(),
    )
    .unwrap();
    assert_eq!(reviewed.status, LeaveStatus::Rejected);
    assert!(reviewed.reviewed_by.is_some());
}

#[test]
fn test_only_admins_review() {
    let (_tmp, store) = setup();
    let request = apply(&store, "john.doe");

    let err = leave::review_leave(
        &store,
        "jane.smith",
        request.leave_id,
        LeaveDecision::Approve,
        None,
        now(),
    )
    .unwrap_err();
    assert!(matches!(err, RollcallError::Policy(_)));

    let requests = leave::list_leave(&store, None, Some(LeaveStatus::Pending)).unwrap();
    assert_eq!(requests.len(), 1);
}

#[test]
fn test_review_of_unknown_request_is_not_found() {
    let (_tmp, store) = setup();

    let err =
        leave::review_leave(&store, "admin", 4242, LeaveDecision::Approve, None, now())
            .unwrap_err();
    assert!(matches!(err, RollcallError::NotFound(_)));
}

#[test]
fn test_apply_validation_runs_before_write() {
    let (_tmp, store) = setup();

    // End before start.
    let err = leave::apply_leave(
        &store,
        "john.doe",
        LeaveType::Casual,
        day(6),
        day(5),
        "Family function out of town",
        today(),
        now(),
    )
    .unwrap_err();
    assert!(matches!(err, RollcallError::Validation(_)));

    // Start in the past.
    let err = leave::apply_leave(
        &store,
        "john.doe",
        LeaveType::Casual,
        day(1),
        day(5),
        "Family function out of town",
        today(),
        now(),
    )
    .unwrap_err();
    assert!(matches!(err, RollcallError::Validation(_)));

    // Reason too short.
    let err = leave::apply_leave(
        &store,
        "john.doe",
        LeaveType::Casual,
        day(5),
        day(6),
        "busy",
        today(),
        now(),
    )
    .unwrap_err();
    assert!(matches!(err, RollcallError::Validation(_)));

    assert!(leave::list_leave(&store, None, None).unwrap().is_empty());
}

#[test]
fn test_deactivated_user_cannot_apply() {
    let (_tmp, store) = setup();
    users::deactivate_user(&store, "admin", "john.doe").unwrap();

    let err = leave::apply_leave(
        &store,
        "john.doe",
        LeaveType::Annual,
        day(5),
        day(9),
        "Annual family vacation plans",
        today(),
        now(),
    )
    .unwrap_err();
    assert!(matches!(err, RollcallError::Policy(_)));
}

#[test]
fn test_list_filters_by_user_and_status() {
    let (_tmp, store) = setup();
    let first = apply(&store, "john.doe");
    apply(&store, "jane.smith");

    leave::review_leave(
        &store,
        "admin",
        first.leave_id,
        LeaveDecision::Approve,
        None,
        now(),
    )
    .unwrap();

    let approved = leave::list_leave(&store, None, Some(LeaveStatus::Approved)).unwrap();
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0].username, "john.doe");

    let pending = leave::list_leave(&store, None, Some(LeaveStatus::Pending)).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].username, "jane.smith");

    let janes = leave::list_leave(&store, Some("jane.smith"), None).unwrap();
    assert_eq!(janes.len(), 1);

    let single_day = leave::apply_leave(
        &store,
        "mike.johnson",
        LeaveType::Casual,
        day(10),
        day(10),
        "Attending a school event",
        today(),
        now(),
    )
    .unwrap();
    assert_eq!(single_day.days(), 1);
}
