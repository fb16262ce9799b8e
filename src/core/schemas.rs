//! Centralized schema definitions for the attendance database.
//!
//! Every table lives in one SQLite file. Column names are load-bearing:
//! verification (`report verify`) and the companion tooling address them
//! literally, so renames here are breaking changes.

pub const DEFAULT_DB_NAME: &str = "attendance.db";

// --- 1. Identity ---
pub const SCHEMA_ROLES: &str = "
    CREATE TABLE IF NOT EXISTS roles (
        role_id INTEGER PRIMARY KEY AUTOINCREMENT,
        role_name TEXT UNIQUE NOT NULL,
        description TEXT
    )
";

pub const SCHEMA_USERS: &str = "
    CREATE TABLE IF NOT EXISTS users (
        user_id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT UNIQUE NOT NULL,
        password TEXT NOT NULL,
        full_name TEXT NOT NULL,
        email TEXT UNIQUE NOT NULL,
        role_id INTEGER NOT NULL,
        date_joined DATE DEFAULT CURRENT_DATE,
        is_active INTEGER DEFAULT 1,
        phone TEXT,
        qualification TEXT,
        experience TEXT,
        job_role TEXT,
        FOREIGN KEY (role_id) REFERENCES roles(role_id)
    )
";

// --- 2. Attendance ---
pub const SCHEMA_ATTENDANCE: &str = "
    CREATE TABLE IF NOT EXISTS attendance (
        attendance_id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        attendance_date DATE NOT NULL,
        status TEXT NOT NULL CHECK (status IN ('Present', 'Absent')),
        marked_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        remarks TEXT,
        FOREIGN KEY (user_id) REFERENCES users(user_id),
        UNIQUE (user_id, attendance_date)
    )
";
pub const SCHEMA_INDEX_ATTENDANCE_DATE: &str =
    "CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance(attendance_date)";

pub const SCHEMA_BREAK_TIMES: &str = "
    CREATE TABLE IF NOT EXISTS break_times (
        break_id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        attendance_date DATE NOT NULL,
        break_in_time TIMESTAMP,
        break_out_time TIMESTAMP,
        break_duration INTEGER,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (user_id) REFERENCES users(user_id),
        UNIQUE (user_id, attendance_date, break_in_time)
    )
";
pub const SCHEMA_INDEX_BREAK_TIMES_USER_DATE: &str =
    "CREATE INDEX IF NOT EXISTS idx_break_times_user_date ON break_times(user_id, attendance_date)";

// --- 3. Leave ---
pub const SCHEMA_LEAVE_REQUESTS: &str = "
    CREATE TABLE IF NOT EXISTS leave_requests (
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
        admin_remarks TEXT,
        FOREIGN KEY (user_id) REFERENCES users(user_id),
        FOREIGN KEY (reviewed_by) REFERENCES users(user_id)
    )
";
pub const SCHEMA_INDEX_LEAVE_STATUS: &str =
    "CREATE INDEX IF NOT EXISTS idx_leave_requests_status ON leave_requests(status)";

// --- 4. Holidays ---
pub const SCHEMA_HOLIDAYS: &str = "
    CREATE TABLE IF NOT EXISTS holidays (
        holiday_id INTEGER PRIMARY KEY AUTOINCREMENT,
        holiday_date DATE NOT NULL UNIQUE,
        holiday_name TEXT NOT NULL,
        description TEXT,
        created_by INTEGER NOT NULL,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (created_by) REFERENCES users(user_id)
    )
";

// --- 5. Seeds ---
pub const SEED_ROLE_ADMIN: &str =
    "INSERT OR IGNORE INTO roles (role_name, description) VALUES ('Admin', 'Administrator with full access')";
pub const SEED_ROLE_EMPLOYEE: &str =
    "INSERT OR IGNORE INTO roles (role_name, description) VALUES ('Employee', 'Regular employee with limited access')";

/// Default accounts created on first init: (username, password, full name,
/// email, role name). Passwords are hashed at insert time.
pub const SEED_USERS: &[(&str, &str, &str, &str, &str)] = &[
    ("admin", "admin123", "System Administrator", "admin@company.com", "Admin"),
    ("john.doe", "emp123", "John Doe", "john.doe@company.com", "Employee"),
    ("jane.smith", "emp123", "Jane Smith", "jane.smith@company.com", "Employee"),
    ("mike.johnson", "emp123", "Mike Johnson", "mike.johnson@company.com", "Employee"),
];

// --- 6. Verification ---
/// Expected layout of a fully migrated store, in creation order. Each entry
/// is (table, required columns). `report verify` checks these literally.
pub const REQUIRED_TABLES: &[(&str, &[&str])] = &[
    ("roles", &["role_id", "role_name", "description"]),
    (
        "users",
        &[
            "user_id",
            "username",
            "password",
            "full_name",
            "email",
            "role_id",
            "date_joined",
            "is_active",
            "phone",
            "qualification",
            "experience",
            "job_role",
        ],
    ),
    (
        "attendance",
        &[
            "attendance_id",
            "user_id",
            "attendance_date",
            "status",
            "marked_at",
            "remarks",
        ],
    ),
    (
        "break_times",
        &[
            "break_id",
            "user_id",
            "attendance_date",
            "break_in_time",
            "break_out_time",
            "break_duration",
            "created_at",
        ],
    ),
    (
        "leave_requests",
        &[
            "leave_id",
            "user_id",
            "leave_type",
            "start_date",
            "end_date",
            "reason",
            "status",
            "applied_at",
            "reviewed_by",
            "reviewed_at",
            "admin_remarks",
        ],
    ),
    (
        "holidays",
        &[
            "holiday_id",
            "holiday_date",
            "holiday_name",
            "description",
            "created_by",
            "created_at",
        ],
    ),
];
