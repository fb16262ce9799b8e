//! Leave requests: applied Pending, reviewed exactly once.
//!
//! The review transition is the only mutable foreign key in the schema:
//! status, reviewer and review timestamp are set together in one UPDATE
//! whose WHERE clause re-checks `status = 'Pending'`, so a request can be
//! reviewed at most once even when two admins race.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use rusqlite::{Connection, Row};
use serde::Serialize;

use crate::core::error::RollcallError;
use crate::core::store::Store;
use crate::core::time;
use crate::ops::OutputFormat;
use crate::ops::users;

/// Shortest acceptable reason, matching the application form's rule.
const MIN_REASON_CHARS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
pub enum LeaveType {
    Sick,
    Casual,
    Annual,
}

impl LeaveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveType::Sick => "Sick",
            LeaveType::Casual => "Casual",
            LeaveType::Annual => "Annual",
        }
    }
}

impl FromStr for LeaveType {
    type Err = RollcallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Sick" => Ok(LeaveType::Sick),
            "Casual" => Ok(LeaveType::Casual),
            "Annual" => Ok(LeaveType::Annual),
            other => Err(RollcallError::Validation(format!(
                "unknown leave type '{other}'"
            ))),
        }
    }
}

impl fmt::Display for LeaveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromSql for LeaveType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse()
            .map_err(|_| FromSqlError::Other(format!("unexpected leave type '{text}'").into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "Pending",
            LeaveStatus::Approved => "Approved",
            LeaveStatus::Rejected => "Rejected",
        }
    }
}

impl FromStr for LeaveStatus {
    type Err = RollcallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(LeaveStatus::Pending),
            "Approved" => Ok(LeaveStatus::Approved),
            "Rejected" => Ok(LeaveStatus::Rejected),
            other => Err(RollcallError::Validation(format!(
                "unknown leave status '{other}'"
            ))),
        }
    }
}

impl fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromSql for LeaveStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse()
            .map_err(|_| FromSqlError::Other(format!("unexpected leave status '{text}'").into()))
    }
}

/// Reviewer's verdict on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LeaveDecision {
    Approve,
    Reject,
}

impl LeaveDecision {
    pub fn status(&self) -> LeaveStatus {
        match self {
            LeaveDecision::Approve => LeaveStatus::Approved,
            LeaveDecision::Reject => LeaveStatus::Rejected,
        }
    }
}

/// One leave request, joined with the applicant and (when reviewed) the
/// reviewer's full name.
#[derive(Debug, Clone, Serialize)]
pub struct LeaveRequest {
    pub leave_id: i64,
    pub user_id: i64,
    pub username: String,
    pub full_name: String,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub status: LeaveStatus,
    pub applied_at: NaiveDateTime,
    pub reviewed_by: Option<i64>,
    pub reviewer_name: Option<String>,
    pub reviewed_at: Option<NaiveDateTime>,
    pub admin_remarks: Option<String>,
}

impl LeaveRequest {
    /// Inclusive day span of the request (same start and end is one day).
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

const REQUEST_COLUMNS: &str = "lr.leave_id, lr.user_id, u.username, u.full_name, lr.leave_type, \
     lr.start_date, lr.end_date, lr.reason, lr.status, lr.applied_at, lr.reviewed_by, \
     rv.full_name, lr.reviewed_at, lr.admin_remarks";

fn request_from_row(row: &Row) -> rusqlite::Result<LeaveRequest> {
    Ok(LeaveRequest {
        leave_id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        full_name: row.get(3)?,
        leave_type: row.get(4)?,
        start_date: row.get(5)?,
        end_date: row.get(6)?,
        reason: row.get(7)?,
        status: row.get(8)?,
        applied_at: row.get(9)?,
        reviewed_by: row.get(10)?,
        reviewer_name: row.get(11)?,
        reviewed_at: row.get(12)?,
        admin_remarks: row.get(13)?,
    })
}

fn fetch_request(conn: &Connection, leave_id: i64) -> Result<LeaveRequest, RollcallError> {
    let query = format!(
        "SELECT {REQUEST_COLUMNS} FROM leave_requests lr
         JOIN users u ON u.user_id = lr.user_id
         LEFT JOIN users rv ON rv.user_id = lr.reviewed_by
         WHERE lr.leave_id = ?1"
    );
    conn.query_row(&query, [leave_id], request_from_row)
        .map_err(|err| match err {
            rusqlite::Error::QueryReturnedNoRows => {
                RollcallError::NotFound(format!("no leave request with id {leave_id}"))
            }
            other => other.into(),
        })
}

fn validate_window(
    start: NaiveDate,
    end: NaiveDate,
    reason: &str,
    today: NaiveDate,
) -> Result<(), RollcallError> {
    if end < start {
        return Err(RollcallError::Validation(
            "end date must be on or after the start date".to_string(),
        ));
    }
    if start < today {
        return Err(RollcallError::Validation(
            "cannot apply for past dates".to_string(),
        ));
    }
    if reason.trim().chars().count() < MIN_REASON_CHARS {
        return Err(RollcallError::Validation(format!(
            "reason must be at least {MIN_REASON_CHARS} characters"
        )));
    }
    Ok(())
}

/// Files a Pending request for `username`. Dates and reason are validated
/// before anything is written; deactivated accounts are rejected.
pub fn apply_leave(
    store: &Store,
    username: &str,
    leave_type: LeaveType,
    start: NaiveDate,
    end: NaiveDate,
    reason: &str,
    today: NaiveDate,
    now: NaiveDateTime,
) -> Result<LeaveRequest, RollcallError> {
    validate_window(start, end, reason, today)?;
    store.with_conn(|conn| {
        let user = users::require_active_user(conn, username)?;
        conn.execute(
            "INSERT INTO leave_requests (user_id, leave_type, start_date, end_date, reason,
                                         status, applied_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 'Pending', ?6)",
            rusqlite::params![
                user.user_id,
                leave_type.as_str(),
                start,
                end,
                reason.trim(),
                now
            ],
        )?;
        fetch_request(conn, conn.last_insert_rowid())
    })
}

/// Reviews a Pending request: records the decision, the reviewer and the
/// review timestamp in one statement. Only an active admin may review, and
/// only a Pending request may be reviewed; anything already decided is a
/// policy violation.
pub fn review_leave(
    store: &Store,
    reviewer: &str,
    leave_id: i64,
    decision: LeaveDecision,
    remarks: Option<&str>,
    now: NaiveDateTime,
) -> Result<LeaveRequest, RollcallError> {
    store.with_conn(|conn| {
        let admin = users::require_active_admin(conn, reviewer)?;
        let request = fetch_request(conn, leave_id)?;
        if request.status != LeaveStatus::Pending {
            return Err(RollcallError::Policy(format!(
                "leave request {leave_id} is already {}",
                request.status
            )));
        }
        // The status re-check in the WHERE clause makes the transition
        // single-shot even if another reviewer slipped in between the read
        // above and this write.
        let changed = conn.execute(
            "UPDATE leave_requests
             SET status = ?1, reviewed_by = ?2, reviewed_at = ?3, admin_remarks = ?4
             WHERE leave_id = ?5 AND status = 'Pending'",
            rusqlite::params![
                decision.status().as_str(),
                admin.user_id,
                now,
                remarks,
                leave_id
            ],
        )?;
        if changed == 0 {
            return Err(RollcallError::Policy(format!(
                "leave request {leave_id} has already been reviewed"
            )));
        }
        fetch_request(conn, leave_id)
    })
}

/// Lists leave requests with reviewer names joined in, newest applications
/// first. Both filters are optional.
pub fn list_leave(
    store: &Store,
    username: Option<&str>,
    status: Option<LeaveStatus>,
) -> Result<Vec<LeaveRequest>, RollcallError> {
    store.with_conn(|conn| {
        let mut query = format!(
            "SELECT {REQUEST_COLUMNS} FROM leave_requests lr
             JOIN users u ON u.user_id = lr.user_id
             LEFT JOIN users rv ON rv.user_id = lr.reviewed_by
             WHERE 1=1"
        );
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        if let Some(username) = username {
            query.push_str(" AND u.username = ?");
            params.push(Box::new(username.to_string()));
        }
        if let Some(status) = status {
            query.push_str(" AND lr.status = ?");
            params.push(Box::new(status.as_str()));
        }
        query.push_str(" ORDER BY lr.applied_at DESC, lr.leave_id DESC");

        let params_as_dyn: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map(&params_as_dyn[..], request_from_row)?;
        let mut requests = Vec::new();
        for row in rows {
            requests.push(row?);
        }
        Ok(requests)
    })
}

#[derive(Parser, Debug)]
#[clap(name = "leave", about = "Apply for and review leave.")]
pub struct LeaveCli {
    #[clap(subcommand)]
    pub command: LeaveCommand,
}

#[derive(Subcommand, Debug)]
pub enum LeaveCommand {
    /// File a leave request.
    Apply {
        #[clap(long)]
        username: String,
        #[clap(long = "type", value_enum)]
        leave_type: LeaveType,
        /// First day of leave, YYYY-MM-DD.
        #[clap(long)]
        start: String,
        /// Last day of leave (inclusive), YYYY-MM-DD.
        #[clap(long)]
        end: String,
        #[clap(long)]
        reason: String,
    },
    /// Approve or reject a pending request (admin only).
    Review {
        #[clap(long)]
        reviewer: String,
        #[clap(long)]
        id: i64,
        #[clap(long, value_enum)]
        decision: LeaveDecision,
        #[clap(long)]
        remarks: Option<String>,
    },
    /// List leave requests.
    List {
        #[clap(long)]
        username: Option<String>,
        #[clap(long, value_enum)]
        status: Option<LeaveStatus>,
        #[clap(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

pub fn run_leave_cli(store: &Store, cli: LeaveCli) -> Result<(), RollcallError> {
    match cli.command {
        LeaveCommand::Apply {
            username,
            leave_type,
            start,
            end,
            reason,
        } => {
            let request = apply_leave(
                store,
                &username,
                leave_type,
                time::parse_date(&start)?,
                time::parse_date(&end)?,
                &reason,
                time::today_local(),
                time::now_local(),
            )?;
            println!(
                "{} Leave request {} filed: {} {} to {} ({} day(s))",
                "✓".green(),
                request.leave_id,
                request.leave_type,
                request.start_date,
                request.end_date,
                request.days()
            );
        }
        LeaveCommand::Review {
            reviewer,
            id,
            decision,
            remarks,
        } => {
            let request =
                review_leave(store, &reviewer, id, decision, remarks.as_deref(), time::now_local())?;
            println!(
                "{} Leave request {} {} by {}",
                "✓".green(),
                request.leave_id,
                request.status,
                request.reviewer_name.as_deref().unwrap_or(&reviewer)
            );
        }
        LeaveCommand::List {
            username,
            status,
            format,
        } => {
            let requests = list_leave(store, username.as_deref(), status)?;
            match format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&requests)
                        .map_err(|e| RollcallError::Validation(e.to_string()))?
                ),
                OutputFormat::Text => {
                    if requests.is_empty() {
                        println!("No leave requests found.");
                        return Ok(());
                    }
                    for request in requests {
                        let status = match request.status {
                            LeaveStatus::Pending => "Pending".yellow(),
                            LeaveStatus::Approved => "Approved".green(),
                            LeaveStatus::Rejected => "Rejected".red(),
                        };
                        println!(
                            "#{} {} ({}): {} {} to {} ({} day(s)) - {} [reviewed by: {}]",
                            request.leave_id,
                            request.full_name,
                            request.username,
                            request.leave_type,
                            request.start_date,
                            request.end_date,
                            request.days(),
                            status,
                            request.reviewer_name.as_deref().unwrap_or("-")
                        );
                    }
                }
            }
        }
    }
    Ok(())
}
