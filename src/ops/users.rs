//! Employee accounts: creation, authentication, activation lifecycle,
//! profile fields.
//!
//! Accounts are never deleted. Deactivation flips `is_active` and leaves all
//! history (attendance, breaks, leave) attached to the user row.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use regex::Regex;
use rusqlite::{Connection, Row};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::core::error::RollcallError;
use crate::core::store::Store;
use crate::ops::OutputFormat;

pub const ROLE_ADMIN: &str = "Admin";
pub const ROLE_EMPLOYEE: &str = "Employee";

static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]{3,32}$").unwrap());
static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

const MIN_PASSWORD_LEN: usize = 6;

/// Stored password form: lowercase hex SHA-256 of the plaintext.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Role {
    Admin,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => ROLE_ADMIN,
            Role::Employee => ROLE_EMPLOYEE,
        }
    }
}

impl FromStr for Role {
    type Err = RollcallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(Role::Admin),
            "Employee" => Ok(Role::Employee),
            other => Err(RollcallError::Validation(format!("unknown role '{other}'"))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account row as exposed to callers. The password digest never leaves the
/// storage layer.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub role_name: String,
    pub date_joined: NaiveDate,
    pub is_active: bool,
    pub phone: Option<String>,
    pub qualification: Option<String>,
    pub experience: Option<String>,
    pub job_role: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role_name == ROLE_ADMIN
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub phone: Option<String>,
    pub qualification: Option<String>,
    pub experience: Option<String>,
    pub job_role: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub phone: Option<String>,
    pub qualification: Option<String>,
    pub experience: Option<String>,
    pub job_role: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.phone.is_none()
            && self.qualification.is_none()
            && self.experience.is_none()
            && self.job_role.is_none()
    }
}

/// Result of an activate/deactivate call. Repeating the operation on an
/// account already in the requested state is reported, not failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActivationOutcome {
    Updated,
    AlreadyActive,
    AlreadyInactive,
}

const USER_COLUMNS: &str = "u.user_id, u.username, u.full_name, u.email, r.role_name, \
     u.date_joined, u.is_active, u.phone, u.qualification, u.experience, u.job_role";

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        user_id: row.get(0)?,
        username: row.get(1)?,
        full_name: row.get(2)?,
        email: row.get(3)?,
        role_name: row.get(4)?,
        date_joined: row.get(5)?,
        is_active: row.get(6)?,
        phone: row.get(7)?,
        qualification: row.get(8)?,
        experience: row.get(9)?,
        job_role: row.get(10)?,
    })
}

pub(crate) fn fetch_user(
    conn: &Connection,
    username: &str,
) -> Result<Option<User>, RollcallError> {
    let query = format!(
        "SELECT {USER_COLUMNS} FROM users u JOIN roles r ON r.role_id = u.role_id
         WHERE u.username = ?1"
    );
    let mut stmt = conn.prepare(&query)?;
    let mut rows = stmt.query_map([username], user_from_row)?;
    match rows.next() {
        Some(user) => Ok(Some(user?)),
        None => Ok(None),
    }
}

/// Resolves a username to an active account, the precondition shared by
/// every attendance/break/leave mutation.
pub(crate) fn require_active_user(
    conn: &Connection,
    username: &str,
) -> Result<User, RollcallError> {
    let user = fetch_user(conn, username)?
        .ok_or_else(|| RollcallError::NotFound(format!("no such user '{username}'")))?;
    if !user.is_active {
        return Err(RollcallError::Policy(format!(
            "account '{username}' is deactivated"
        )));
    }
    Ok(user)
}

/// Resolves an actor to an active admin account. Privileged operations
/// (account lifecycle, leave review, holiday creation) go through this.
pub(crate) fn require_active_admin(
    conn: &Connection,
    username: &str,
) -> Result<User, RollcallError> {
    let user = require_active_user(conn, username)?;
    if !user.is_admin() {
        return Err(RollcallError::Policy(format!(
            "'{username}' is not an administrator"
        )));
    }
    Ok(user)
}

fn validate_new_user(new: &NewUser) -> Result<(), RollcallError> {
    if !USERNAME_PATTERN.is_match(&new.username) {
        return Err(RollcallError::Validation(format!(
            "invalid username '{}': 3-32 chars from [A-Za-z0-9._-]",
            new.username
        )));
    }
    if !EMAIL_PATTERN.is_match(&new.email) {
        return Err(RollcallError::Validation(format!(
            "invalid email '{}'",
            new.email
        )));
    }
    if new.password.len() < MIN_PASSWORD_LEN {
        return Err(RollcallError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if new.full_name.trim().is_empty() {
        return Err(RollcallError::Validation("full name is required".into()));
    }
    Ok(())
}

/// Creates an account. Requires an active admin actor; duplicate usernames
/// or emails surface as `Constraint`.
pub fn add_user(store: &Store, actor: &str, new: &NewUser) -> Result<User, RollcallError> {
    validate_new_user(new)?;
    store.with_conn(|conn| {
        require_active_admin(conn, actor)?;
        conn.execute(
            "INSERT INTO users (username, password, full_name, email, role_id,
                                phone, qualification, experience, job_role)
             VALUES (?1, ?2, ?3, ?4,
                     (SELECT role_id FROM roles WHERE role_name = ?5),
                     ?6, ?7, ?8, ?9)",
            rusqlite::params![
                new.username,
                hash_password(&new.password),
                new.full_name,
                new.email,
                new.role.as_str(),
                new.phone,
                new.qualification,
                new.experience,
                new.job_role,
            ],
        )?;
        require_active_user(conn, &new.username)
    })
}

/// Checks credentials against the stored digest. Unknown usernames and wrong
/// passwords are indistinguishable to the caller and come back as `NotFound`;
/// deactivated accounts are reported as a `Policy` rejection, and only after
/// the password matched.
pub fn authenticate(store: &Store, username: &str, password: &str) -> Result<User, RollcallError> {
    store.with_conn(|conn| {
        let invalid = || RollcallError::NotFound("invalid username or password".to_string());
        let user = fetch_user(conn, username)?.ok_or_else(invalid)?;
        let stored: String = conn.query_row(
            "SELECT password FROM users WHERE user_id = ?1",
            [user.user_id],
            |row| row.get(0),
        )?;
        if stored != hash_password(password) {
            return Err(invalid());
        }
        if !user.is_active {
            return Err(RollcallError::Policy(format!(
                "account '{username}' is deactivated"
            )));
        }
        Ok(user)
    })
}

pub fn get_user(store: &Store, username: &str) -> Result<User, RollcallError> {
    store.with_conn(|conn| {
        fetch_user(conn, username)?
            .ok_or_else(|| RollcallError::NotFound(format!("no such user '{username}'")))
    })
}

/// All employee-role accounts, active first, then by username.
pub fn list_employees(store: &Store, include_inactive: bool) -> Result<Vec<User>, RollcallError> {
    store.with_conn(|conn| {
        let mut query = format!(
            "SELECT {USER_COLUMNS} FROM users u JOIN roles r ON r.role_id = u.role_id
             WHERE r.role_name = ?1"
        );
        if !include_inactive {
            query.push_str(" AND u.is_active = 1");
        }
        query.push_str(" ORDER BY u.is_active DESC, u.username");
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map([ROLE_EMPLOYEE], user_from_row)?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    })
}

/// Deactivates an account. Admins may not deactivate themselves, so the
/// store can never lose its last usable administrator by this path.
pub fn deactivate_user(
    store: &Store,
    actor: &str,
    target: &str,
) -> Result<ActivationOutcome, RollcallError> {
    store.with_conn(|conn| {
        require_active_admin(conn, actor)?;
        if actor == target {
            return Err(RollcallError::Policy(
                "administrators cannot deactivate their own account".to_string(),
            ));
        }
        let user = fetch_user(conn, target)?
            .ok_or_else(|| RollcallError::NotFound(format!("no such user '{target}'")))?;
        if !user.is_active {
            return Ok(ActivationOutcome::AlreadyInactive);
        }
        conn.execute(
            "UPDATE users SET is_active = 0 WHERE user_id = ?1",
            [user.user_id],
        )?;
        Ok(ActivationOutcome::Updated)
    })
}

/// Reactivates a deactivated account. History is untouched; the account
/// simply becomes usable again.
pub fn activate_user(
    store: &Store,
    actor: &str,
    target: &str,
) -> Result<ActivationOutcome, RollcallError> {
    store.with_conn(|conn| {
        require_active_admin(conn, actor)?;
        let user = fetch_user(conn, target)?
            .ok_or_else(|| RollcallError::NotFound(format!("no such user '{target}'")))?;
        if user.is_active {
            return Ok(ActivationOutcome::AlreadyActive);
        }
        conn.execute(
            "UPDATE users SET is_active = 1 WHERE user_id = ?1",
            [user.user_id],
        )?;
        Ok(ActivationOutcome::Updated)
    })
}

/// Updates the optional profile columns on an account. Only fields given are
/// touched; `None` leaves the stored value alone. Deactivated accounts are
/// rejected like every other mutation.
pub fn update_profile(
    store: &Store,
    username: &str,
    update: &ProfileUpdate,
) -> Result<User, RollcallError> {
    if update.is_empty() {
        return Err(RollcallError::Validation(
            "no profile fields provided".to_string(),
        ));
    }
    store.with_conn(|conn| {
        let user = require_active_user(conn, username)?;

        let mut set_clauses = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        if let Some(phone) = &update.phone {
            set_clauses.push("phone = ?");
            params.push(Box::new(phone.clone()));
        }
        if let Some(qualification) = &update.qualification {
            set_clauses.push("qualification = ?");
            params.push(Box::new(qualification.clone()));
        }
        if let Some(experience) = &update.experience {
            set_clauses.push("experience = ?");
            params.push(Box::new(experience.clone()));
        }
        if let Some(job_role) = &update.job_role {
            set_clauses.push("job_role = ?");
            params.push(Box::new(job_role.clone()));
        }
        params.push(Box::new(user.user_id));

        let sql = format!(
            "UPDATE users SET {} WHERE user_id = ?",
            set_clauses.join(", ")
        );
        let params_as_dyn: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, &params_as_dyn[..])?;

        fetch_user(conn, username)?
            .ok_or_else(|| RollcallError::NotFound(format!("no such user '{username}'")))
    })
}

#[derive(Parser, Debug)]
#[clap(name = "employee", about = "Manage employee accounts and profiles.")]
pub struct EmployeeCli {
    #[clap(subcommand)]
    pub command: EmployeeCommand,
}

#[derive(Subcommand, Debug)]
pub enum EmployeeCommand {
    /// Create an account (admin only).
    Add {
        #[clap(long)]
        actor: String,
        #[clap(long)]
        username: String,
        #[clap(long)]
        password: String,
        #[clap(long)]
        full_name: String,
        #[clap(long)]
        email: String,
        #[clap(long, value_enum, default_value_t = Role::Employee)]
        role: Role,
        #[clap(long)]
        phone: Option<String>,
        #[clap(long)]
        qualification: Option<String>,
        #[clap(long)]
        experience: Option<String>,
        #[clap(long)]
        job_role: Option<String>,
    },
    /// List employee accounts.
    List {
        #[clap(long)]
        include_inactive: bool,
        #[clap(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Reactivate a deactivated account (admin only).
    Activate {
        #[clap(long)]
        actor: String,
        #[clap(long)]
        username: String,
    },
    /// Deactivate an account (admin only).
    Deactivate {
        #[clap(long)]
        actor: String,
        #[clap(long)]
        username: String,
    },
    /// Update profile fields on an account.
    SetProfile {
        #[clap(long)]
        username: String,
        #[clap(long)]
        phone: Option<String>,
        #[clap(long)]
        qualification: Option<String>,
        #[clap(long)]
        experience: Option<String>,
        #[clap(long)]
        job_role: Option<String>,
    },
}

pub fn run_employee_cli(store: &Store, cli: EmployeeCli) -> Result<(), RollcallError> {
    match cli.command {
        EmployeeCommand::Add {
            actor,
            username,
            password,
            full_name,
            email,
            role,
            phone,
            qualification,
            experience,
            job_role,
        } => {
            let user = add_user(
                store,
                &actor,
                &NewUser {
                    username,
                    password,
                    full_name,
                    email,
                    role,
                    phone,
                    qualification,
                    experience,
                    job_role,
                },
            )?;
            println!(
                "{} Created {} account '{}' ({})",
                "✓".green(),
                user.role_name,
                user.username,
                user.email
            );
        }
        EmployeeCommand::List {
            include_inactive,
            format,
        } => {
            let users = list_employees(store, include_inactive)?;
            match format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&users)
                        .map_err(|e| RollcallError::Validation(e.to_string()))?
                ),
                OutputFormat::Text => {
                    if users.is_empty() {
                        println!("No employee accounts found.");
                        return Ok(());
                    }
                    for user in users {
                        let state = if user.is_active {
                            "Active".green()
                        } else {
                            "Inactive".red()
                        };
                        println!(
                            "{} ({}) - {} [{}] joined {}",
                            user.full_name, user.username, user.email, state, user.date_joined
                        );
                    }
                }
            }
        }
        EmployeeCommand::Activate { actor, username } => {
            match activate_user(store, &actor, &username)? {
                ActivationOutcome::Updated => {
                    println!("{} Account '{}' reactivated", "✓".green(), username)
                }
                _ => {
                    println!("{} Account '{}' is already active", "!".yellow(), username)
                }
            }
        }
        EmployeeCommand::Deactivate { actor, username } => {
            match deactivate_user(store, &actor, &username)? {
                ActivationOutcome::Updated => {
                    println!("{} Account '{}' deactivated", "✓".green(), username)
                }
                _ => println!(
                    "{} Account '{}' is already inactive",
                    "!".yellow(),
                    username
                ),
            }
        }
        EmployeeCommand::SetProfile {
            username,
            phone,
            qualification,
            experience,
            job_role,
        } => {
            let user = update_profile(
                store,
                &username,
                &ProfileUpdate {
                    phone,
                    qualification,
                    experience,
                    job_role,
                },
            )?;
            println!("{} Profile updated for '{}'", "✓".green(), user.username);
        }
    }
    Ok(())
}
