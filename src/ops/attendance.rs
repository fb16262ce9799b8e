//! Daily attendance: the one-mark-per-day rule and the cutoff sweep.
//!
//! Every marking path relies on the `UNIQUE(user_id, attendance_date)`
//! constraint as the final arbiter. Policy checks run first, but the
//! constraint is what guarantees at most one record per user and day even
//! when two writers race: one insert lands, the other is rejected and
//! reported as "already marked".

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use rusqlite::{Connection, Row};
use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::core::error::RollcallError;
use crate::core::store::Store;
use crate::core::time;
use crate::ops::OutputFormat;
use crate::ops::holidays;
use crate::ops::users::{self, ROLE_EMPLOYEE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
        }
    }
}

impl FromStr for AttendanceStatus {
    type Err = RollcallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Present" => Ok(AttendanceStatus::Present),
            "Absent" => Ok(AttendanceStatus::Absent),
            other => Err(RollcallError::Validation(format!(
                "unknown attendance status '{other}'"
            ))),
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromSql for AttendanceStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse()
            .map_err(|_| FromSqlError::Other(format!("unexpected status '{text}'").into()))
    }
}

/// One attendance row, joined with the account it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceRecord {
    pub attendance_id: i64,
    pub user_id: i64,
    pub username: String,
    pub full_name: String,
    pub attendance_date: NaiveDate,
    pub status: AttendanceStatus,
    pub marked_at: NaiveDateTime,
    pub remarks: Option<String>,
}

/// Result of a manual mark. A duplicate on the same day is a reported
/// condition, not an error.
#[derive(Debug, Serialize)]
pub enum MarkOutcome {
    Marked(AttendanceRecord),
    AlreadyMarked,
}

/// Result of one cutoff sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SweepOutcome {
    /// The sweep ran; this many employees were newly marked Absent.
    Swept { marked: usize },
    /// Local wall-clock hour is still before the cutoff; nothing written.
    BeforeCutoff { hour: u32, cutoff_hour: u32 },
    /// The date is on the holiday calendar; nothing written.
    Holiday { name: String },
}

/// Optional predicates for [`list_attendance`]. Empty filter lists everything.
#[derive(Debug, Clone, Default)]
pub struct AttendanceFilter {
    pub date: Option<NaiveDate>,
    /// `YYYY-MM`, compared against `strftime('%Y-%m', attendance_date)`.
    pub month: Option<String>,
    pub status: Option<AttendanceStatus>,
    pub username: Option<String>,
}

const RECORD_COLUMNS: &str = "a.attendance_id, a.user_id, u.username, u.full_name, \
     a.attendance_date, a.status, a.marked_at, a.remarks";

fn record_from_row(row: &Row) -> rusqlite::Result<AttendanceRecord> {
    Ok(AttendanceRecord {
        attendance_id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        full_name: row.get(3)?,
        attendance_date: row.get(4)?,
        status: row.get(5)?,
        marked_at: row.get(6)?,
        remarks: row.get(7)?,
    })
}

fn fetch_record(
    conn: &Connection,
    user_id: i64,
    date: NaiveDate,
) -> Result<AttendanceRecord, RollcallError> {
    let query = format!(
        "SELECT {RECORD_COLUMNS} FROM attendance a JOIN users u ON u.user_id = a.user_id
         WHERE a.user_id = ?1 AND a.attendance_date = ?2"
    );
    Ok(conn.query_row(&query, rusqlite::params![user_id, date], record_from_row)?)
}

/// Marks `username` for `today`. At most one record per (user, date): a
/// second attempt comes back as [`MarkOutcome::AlreadyMarked`]. Deactivated
/// accounts are rejected before anything is written.
pub fn mark_attendance(
    store: &Store,
    username: &str,
    status: AttendanceStatus,
    remarks: Option<&str>,
    today: NaiveDate,
    now: NaiveDateTime,
) -> Result<MarkOutcome, RollcallError> {
    store.with_conn(|conn| {
        let user = users::require_active_user(conn, username)?;
        let insert = conn.execute(
            "INSERT INTO attendance (user_id, attendance_date, status, marked_at, remarks)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![user.user_id, today, status.as_str(), now, remarks],
        );
        match insert {
            Ok(_) => Ok(MarkOutcome::Marked(fetch_record(conn, user.user_id, today)?)),
            Err(err) => {
                let err = RollcallError::from(err);
                if err.is_constraint() {
                    Ok(MarkOutcome::AlreadyMarked)
                } else {
                    Err(err)
                }
            }
        }
    })
}

/// Marks every active employee without a record for `today` as Absent, once
/// the local hour has reached `cutoff_hour`. Holiday dates are skipped
/// entirely. Idempotent: employees already marked (by themselves or a prior
/// sweep) are filtered out up front, and `INSERT OR IGNORE` backstops any
/// write that races past the filter.
pub fn sweep_absent(
    store: &Store,
    today: NaiveDate,
    now: NaiveDateTime,
    cutoff_hour: u32,
) -> Result<SweepOutcome, RollcallError> {
    if now.hour() < cutoff_hour {
        return Ok(SweepOutcome::BeforeCutoff {
            hour: now.hour(),
            cutoff_hour,
        });
    }
    store.with_conn(|conn| {
        if let Some(name) = holidays::holiday_on(conn, today)? {
            return Ok(SweepOutcome::Holiday { name });
        }

        let mut marked = FxHashSet::default();
        {
            let mut stmt =
                conn.prepare("SELECT user_id FROM attendance WHERE attendance_date = ?1")?;
            let rows = stmt.query_map([today], |row| row.get::<_, i64>(0))?;
            for row in rows {
                marked.insert(row?);
            }
        }

        let employees: Vec<i64> = {
            let mut stmt = conn.prepare(
                "SELECT u.user_id FROM users u JOIN roles r ON r.role_id = u.role_id
                 WHERE r.role_name = ?1 AND u.is_active = 1",
            )?;
            let rows = stmt.query_map([ROLE_EMPLOYEE], |row| row.get(0))?;
            rows.collect::<Result<_, _>>()?
        };

        let mut insert = conn.prepare(
            "INSERT OR IGNORE INTO attendance (user_id, attendance_date, status, marked_at)
             VALUES (?1, ?2, 'Absent', ?3)",
        )?;
        let mut newly_marked = 0;
        for user_id in employees {
            if marked.contains(&user_id) {
                continue;
            }
            newly_marked += insert.execute(rusqlite::params![user_id, today, now])?;
        }
        Ok(SweepOutcome::Swept {
            marked: newly_marked,
        })
    })
}

/// Lists attendance records matching the filter, newest date first.
pub fn list_attendance(
    store: &Store,
    filter: &AttendanceFilter,
) -> Result<Vec<AttendanceRecord>, RollcallError> {
    store.with_conn(|conn| {
        let mut query = format!(
            "SELECT {RECORD_COLUMNS} FROM attendance a JOIN users u ON u.user_id = a.user_id
             WHERE 1=1"
        );
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        if let Some(date) = filter.date {
            query.push_str(" AND a.attendance_date = ?");
            params.push(Box::new(date));
        }
        if let Some(month) = &filter.month {
            query.push_str(" AND strftime('%Y-%m', a.attendance_date) = ?");
            params.push(Box::new(month.clone()));
        }
        if let Some(status) = filter.status {
            query.push_str(" AND a.status = ?");
            params.push(Box::new(status.as_str()));
        }
        if let Some(username) = &filter.username {
            query.push_str(" AND u.username = ?");
            params.push(Box::new(username.clone()));
        }
        query.push_str(" ORDER BY a.attendance_date DESC, u.username");

        let params_as_dyn: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map(&params_as_dyn[..], record_from_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    })
}

#[derive(Parser, Debug)]
#[clap(name = "attendance", about = "Mark, sweep and list daily attendance.")]
pub struct AttendanceCli {
    #[clap(subcommand)]
    pub command: AttendanceCommand,
}

#[derive(Subcommand, Debug)]
pub enum AttendanceCommand {
    /// Mark today's attendance for one user.
    Mark {
        #[clap(long)]
        username: String,
        #[clap(long, value_enum, default_value_t = AttendanceStatus::Present)]
        status: AttendanceStatus,
        #[clap(long)]
        remarks: Option<String>,
    },
    /// Mark every unmarked active employee Absent (runs after the cutoff hour).
    Sweep,
    /// List attendance records, optionally filtered.
    List {
        /// Exact date, YYYY-MM-DD.
        #[clap(long)]
        date: Option<String>,
        /// Whole month, YYYY-MM.
        #[clap(long)]
        month: Option<String>,
        #[clap(long, value_enum)]
        status: Option<AttendanceStatus>,
        #[clap(long)]
        username: Option<String>,
        #[clap(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

pub fn run_attendance_cli(
    store: &Store,
    cutoff_hour: u32,
    cli: AttendanceCli,
) -> Result<(), RollcallError> {
    match cli.command {
        AttendanceCommand::Mark {
            username,
            status,
            remarks,
        } => {
            let outcome = mark_attendance(
                store,
                &username,
                status,
                remarks.as_deref(),
                time::today_local(),
                time::now_local(),
            )?;
            match outcome {
                MarkOutcome::Marked(record) => println!(
                    "{} Marked {} for '{}' on {}",
                    "✓".green(),
                    record.status,
                    username,
                    record.attendance_date
                ),
                MarkOutcome::AlreadyMarked => println!(
                    "{} Attendance already marked for '{}' today",
                    "!".yellow(),
                    username
                ),
            }
        }
        AttendanceCommand::Sweep => {
            let today = time::today_local();
            match sweep_absent(store, today, time::now_local(), cutoff_hour)? {
                SweepOutcome::Swept { marked } => println!(
                    "{} Marked {} employee(s) Absent for {}",
                    "✓".green(),
                    marked,
                    today
                ),
                SweepOutcome::BeforeCutoff { hour, cutoff_hour } => println!(
                    "Hour {hour} is before the cutoff ({cutoff_hour}); nothing marked"
                ),
                SweepOutcome::Holiday { name } => {
                    println!("{today} is a holiday ({name}); sweep skipped")
                }
            }
        }
        AttendanceCommand::List {
            date,
            month,
            status,
            username,
            format,
        } => {
            let filter = AttendanceFilter {
                date: date.as_deref().map(time::parse_date).transpose()?,
                month: month.as_deref().map(time::parse_month).transpose()?,
                status,
                username,
            };
            let records = list_attendance(store, &filter)?;
            match format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&records)
                        .map_err(|e| RollcallError::Validation(e.to_string()))?
                ),
                OutputFormat::Text => {
                    if records.is_empty() {
                        println!("No attendance records found.");
                        return Ok(());
                    }
                    for record in records {
                        let status = match record.status {
                            AttendanceStatus::Present => "Present".green(),
                            AttendanceStatus::Absent => "Absent".red(),
                        };
                        println!(
                            "{} {} ({}): {} at {}{}",
                            record.attendance_date,
                            record.full_name,
                            record.username,
                            status,
                            record.marked_at,
                            record
                                .remarks
                                .as_deref()
                                .map(|r| format!(" [{r}]"))
                                .unwrap_or_default()
                        );
                    }
                }
            }
        }
    }
    Ok(())
}
