use rollcall::core::db;
use rollcall::core::error::RollcallError;
use rollcall::core::migration;
use rollcall::core::store::Store;
use rollcall::ops::report;
use tempfile::tempdir;

fn fresh_store(dir: &tempfile::TempDir) -> Store {
    Store::new(dir.path().join("attendance.db"))
}

fn count(store: &Store, table: &str) -> i64 {
    store
        .with_conn(|conn| {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?)
        })
        .unwrap()
}

#[test]
fn test_init_creates_full_schema() {
    let tmp = tempdir().unwrap();
    let store = fresh_store(&tmp);
    db::initialize_store(&store).unwrap();

    assert!(store.exists());
    let schema = report::verify_schema(&store).unwrap();
    assert!(schema.ok(), "fresh init must match the expected layout");
    assert_eq!(schema.tables.len(), 6);
}

#[test]
fn test_double_init_seeds_exactly_once() {
    let tmp = tempdir().unwrap();
    let store = fresh_store(&tmp);

    db::initialize_store(&store).unwrap();
    db::initialize_store(&store).unwrap();

    assert_eq!(count(&store, "roles"), 2);
    assert_eq!(count(&store, "users"), 4);

    let descriptions: Vec<(String, String)> = store
        .with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT role_name, description FROM roles ORDER BY role_id")?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            Ok(rows.collect::<Result<_, _>>()?)
        })
        .unwrap();
    assert_eq!(
        descriptions,
        vec![
            (
                "Admin".to_string(),
                "Administrator with full access".to_string()
            ),
            (
                "Employee".to_string(),
                "Regular employee with limited access".to_string()
            ),
        ]
    );
}

#[test]
fn test_init_creates_parent_directory() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path().join("nested/dir/attendance.db"));
    db::initialize_store(&store).unwrap();
    assert!(store.exists());
}

#[test]
fn test_migration_noop_on_fresh_store() {
    let tmp = tempdir().unwrap();
    let store = fresh_store(&tmp);
    db::initialize_store(&store).unwrap();

    let report = migration::apply_migrations(&store).unwrap();
    assert!(report.up_to_date());
    assert_eq!(report.skipped, vec!["break_times", "user_profile_columns"]);
}

#[test]
fn test_migration_refuses_missing_database() {
    let tmp = tempdir().unwrap();
    let store = fresh_store(&tmp);

    let err = migration::apply_migrations(&store).unwrap_err();
    assert!(matches!(err, RollcallError::NotFound(_)));
    assert!(!store.exists(), "migration must never create a store");
}

/// Builds a database in the shape the earliest tooling produced: no
/// break_times table and no profile columns on users.
fn legacy_store(dir: &tempfile::TempDir) -> Store {
    let store = Store::new(dir.path().join("attendance.db"));
    let conn = db::db_connect(store.path()).unwrap();
    conn.execute_batch(
        "CREATE TABLE roles (
             role_id INTEGER PRIMARY KEY AUTOINCREMENT,
             role_name TEXT UNIQUE NOT NULL,
             description TEXT
         );
         CREATE TABLE users (
             user_id INTEGER PRIMARY KEY AUTOINCREMENT,
             username TEXT UNIQUE NOT NULL,
             password TEXT NOT NULL,
             full_name TEXT NOT NULL,
             email TEXT UNIQUE NOT NULL,
             role_id INTEGER NOT NULL,
             date_joined DATE DEFAULT CURRENT_DATE,
             is_active INTEGER DEFAULT 1,
             FOREIGN KEY (role_id) REFERENCES roles(role_id)
         );
         CREATE TABLE attendance (
             attendance_id INTEGER PRIMARY KEY AUTOINCREMENT,
             user_id INTEGER NOT NULL,
             attendance_date DATE NOT NULL,
             status TEXT NOT NULL CHECK (status IN ('Present', 'Absent')),
             marked_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
             remarks TEXT,
             UNIQUE (user_id, attendance_date)
         );
         CREATE TABLE leave_requests (
             leave_id INTEGER PRIMARY KEY AUTOINCREMENT,
             user_id INTEGER NOT NULL,
             leave_type TEXT NOT NULL CHECK (leave_type IN ('Sick', 'Casual', 'Annual')),
             start_date DATE NOT NULL,
             end_date DATE NOT NULL,
             reason TEXT NOT NULL,
             status TEXT DEFAULT 'Pending' CHECK (status IN ('Pending', 'Approved', 'Rejected')),
             applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
             reviewed_by INTEGER,
             reviewed_at TIMESTAMP,
             admin_remarks TEXT
         );
         CREATE TABLE holidays (
             holiday_id INTEGER PRIMARY KEY AUTOINCREMENT,
             holiday_date DATE NOT NULL UNIQUE,
             holiday_name TEXT NOT NULL,
             description TEXT,
             created_by INTEGER NOT NULL,
             created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
         );",
    )
    .unwrap();
    store
}

#[test]
fn test_migration_upgrades_legacy_store() {
    let tmp = tempdir().unwrap();
    let store = legacy_store(&tmp);

    // 1. Both deltas are pending.
    let pending = migration::pending_migrations(&store).unwrap();
    assert_eq!(pending, vec!["break_times", "user_profile_columns"]);

    // 2. First pass applies both.
    let report = migration::apply_migrations(&store).unwrap();
    assert!(!report.up_to_date());
    assert_eq!(report.applied, vec!["break_times", "user_profile_columns"]);

    store
        .with_conn(|conn| {
            assert!(migration::table_exists(conn, "break_times").unwrap());
            for column in ["phone", "qualification", "experience", "job_role"] {
                assert!(migration::column_exists(conn, "users", column).unwrap());
            }
            Ok(())
        })
        .unwrap();

    // 3. Second pass reports up to date.
    let report = migration::apply_migrations(&store).unwrap();
    assert!(report.up_to_date());
}

#[test]
fn test_migration_converges_after_partial_profile_upgrade() {
    let tmp = tempdir().unwrap();
    let store = legacy_store(&tmp);

    // Half the profile columns already exist (hand-upgraded store).
    store
        .with_conn(|conn| {
            conn.execute("ALTER TABLE users ADD COLUMN phone TEXT", [])?;
            conn.execute("ALTER TABLE users ADD COLUMN qualification TEXT", [])?;
            Ok(())
        })
        .unwrap();

    let report = migration::apply_migrations(&store).unwrap();
    assert!(report.applied.contains(&"user_profile_columns"));

    store
        .with_conn(|conn| {
            for column in ["phone", "qualification", "experience", "job_role"] {
                assert!(migration::column_exists(conn, "users", column).unwrap());
            }
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_verify_schema_flags_legacy_store_until_migrated() {
    let tmp = tempdir().unwrap();
    let store = legacy_store(&tmp);

    let schema = report::verify_schema(&store).unwrap();
    assert!(!schema.ok());
    let users_check = schema.tables.iter().find(|t| t.table == "users").unwrap();
    assert!(users_check.missing_columns.contains(&"phone".to_string()));
    let breaks_check = schema
        .tables
        .iter()
        .find(|t| t.table == "break_times")
        .unwrap();
    assert!(!breaks_check.exists);

    migration::apply_migrations(&store).unwrap();
    let schema = report::verify_schema(&store).unwrap();
    assert!(schema.ok());
}

#[test]
fn test_connection_enforces_foreign_keys() {
    let tmp = tempdir().unwrap();
    let store = fresh_store(&tmp);
    db::initialize_store(&store).unwrap();

    let err = store
        .with_conn(|conn| {
            conn.execute(
                "INSERT INTO attendance (user_id, attendance_date, status)
                 VALUES (999, '2026-03-02', 'Present')",
                [],
            )?;
            Ok(())
        })
        .unwrap_err();
    assert!(err.is_constraint());
}
