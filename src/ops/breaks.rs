//! Break sessions: break-in opens a row, break-out closes the most recent
//! open one and fixes the duration.
//!
//! A user has at most one open session per day. Opening a second one while
//! the first is still open is rejected, otherwise the close-out lookup
//! (newest row with a NULL break-out) would be ambiguous. The stored
//! `break_duration` is a convenience copy; [`BreakSession::duration_minutes`]
//! always recomputes from the timestamps and reports nothing while either
//! side is missing.

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use colored::Colorize;
use rusqlite::{Connection, Row};
use serde::Serialize;

use crate::core::error::RollcallError;
use crate::core::store::Store;
use crate::core::time;
use crate::ops::OutputFormat;
use crate::ops::users;

/// One break-session row, joined with the account it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct BreakSession {
    pub break_id: i64,
    pub user_id: i64,
    pub username: String,
    pub attendance_date: NaiveDate,
    pub break_in_time: Option<NaiveDateTime>,
    pub break_out_time: Option<NaiveDateTime>,
    /// Minutes as written at close-out. Derived; prefer
    /// [`BreakSession::duration_minutes`].
    pub break_duration: Option<i64>,
    pub created_at: NaiveDateTime,
}

impl BreakSession {
    pub fn is_open(&self) -> bool {
        self.break_in_time.is_some() && self.break_out_time.is_none()
    }

    /// Whole minutes between break-in and break-out, recomputed from the
    /// timestamps. None while either timestamp is missing.
    pub fn duration_minutes(&self) -> Option<i64> {
        match (self.break_in_time, self.break_out_time) {
            (Some(break_in), Some(break_out)) => Some((break_out - break_in).num_minutes()),
            _ => None,
        }
    }
}

const SESSION_COLUMNS: &str = "b.break_id, b.user_id, u.username, b.attendance_date, \
     b.break_in_time, b.break_out_time, b.break_duration, b.created_at";

fn session_from_row(row: &Row) -> rusqlite::Result<BreakSession> {
    Ok(BreakSession {
        break_id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        attendance_date: row.get(3)?,
        break_in_time: row.get(4)?,
        break_out_time: row.get(5)?,
        break_duration: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn fetch_session(conn: &Connection, break_id: i64) -> Result<BreakSession, RollcallError> {
    let query = format!(
        "SELECT {SESSION_COLUMNS} FROM break_times b JOIN users u ON u.user_id = b.user_id
         WHERE b.break_id = ?1"
    );
    Ok(conn.query_row(&query, [break_id], session_from_row)?)
}

fn open_session(
    conn: &Connection,
    user_id: i64,
    date: NaiveDate,
) -> Result<Option<BreakSession>, RollcallError> {
    let query = format!(
        "SELECT {SESSION_COLUMNS} FROM break_times b JOIN users u ON u.user_id = b.user_id
         WHERE b.user_id = ?1 AND b.attendance_date = ?2 AND b.break_out_time IS NULL
         ORDER BY b.break_in_time DESC LIMIT 1"
    );
    let mut stmt = conn.prepare(&query)?;
    let mut rows = stmt.query_map(rusqlite::params![user_id, date], session_from_row)?;
    match rows.next() {
        Some(session) => Ok(Some(session?)),
        None => Ok(None),
    }
}

/// Opens a break session for (user, today) at `now`. Rejected while another
/// session is still open; two sessions starting at the identical instant are
/// rejected by the `UNIQUE(user_id, attendance_date, break_in_time)`
/// constraint.
pub fn break_in(
    store: &Store,
    username: &str,
    today: NaiveDate,
    now: NaiveDateTime,
) -> Result<BreakSession, RollcallError> {
    store.with_conn(|conn| {
        let user = users::require_active_user(conn, username)?;
        if open_session(conn, user.user_id, today)?.is_some() {
            return Err(RollcallError::Constraint(format!(
                "'{username}' already has an open break session; break out first"
            )));
        }
        conn.execute(
            "INSERT INTO break_times (user_id, attendance_date, break_in_time, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![user.user_id, today, now, now],
        )?;
        fetch_session(conn, conn.last_insert_rowid())
    })
}

/// Closes the open break session for (user, today): sets `break_out_time`
/// and the computed duration in one UPDATE. `NotFound` when no session is
/// open; a break-out earlier than the break-in is rejected.
pub fn break_out(
    store: &Store,
    username: &str,
    today: NaiveDate,
    now: NaiveDateTime,
) -> Result<BreakSession, RollcallError> {
    store.with_conn(|conn| {
        let user = users::require_active_user(conn, username)?;
        let open = open_session(conn, user.user_id, today)?.ok_or_else(|| {
            RollcallError::NotFound(format!(
                "no open break session for '{username}' on {today}"
            ))
        })?;
        let break_in = open.break_in_time.ok_or_else(|| {
            RollcallError::Validation(format!(
                "break session {} has no break-in timestamp",
                open.break_id
            ))
        })?;
        if now < break_in {
            return Err(RollcallError::Validation(format!(
                "break-out at {now} is earlier than break-in at {break_in}"
            )));
        }
        let duration = (now - break_in).num_minutes();
        conn.execute(
            "UPDATE break_times SET break_out_time = ?1, break_duration = ?2 WHERE break_id = ?3",
            rusqlite::params![now, duration, open.break_id],
        )?;
        fetch_session(conn, open.break_id)
    })
}

/// Lists break sessions, optionally narrowed to one user and/or one date,
/// newest first.
pub fn list_breaks(
    store: &Store,
    username: Option<&str>,
    date: Option<NaiveDate>,
) -> Result<Vec<BreakSession>, RollcallError> {
    store.with_conn(|conn| {
        let mut query = format!(
            "SELECT {SESSION_COLUMNS} FROM break_times b JOIN users u ON u.user_id = b.user_id
             WHERE 1=1"
        );
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        if let Some(username) = username {
            query.push_str(" AND u.username = ?");
            params.push(Box::new(username.to_string()));
        }
        if let Some(date) = date {
            query.push_str(" AND b.attendance_date = ?");
            params.push(Box::new(date));
        }
        query.push_str(" ORDER BY b.attendance_date DESC, b.break_in_time DESC");

        let params_as_dyn: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map(&params_as_dyn[..], session_from_row)?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?);
        }
        Ok(sessions)
    })
}

#[derive(Parser, Debug)]
#[clap(name = "break", about = "Track break sessions.")]
pub struct BreakCli {
    #[clap(subcommand)]
    pub command: BreakCommand,
}

#[derive(Subcommand, Debug)]
pub enum BreakCommand {
    /// Start a break for today.
    Start {
        #[clap(long)]
        username: String,
    },
    /// End the open break and record its duration.
    End {
        #[clap(long)]
        username: String,
    },
    /// List break sessions.
    List {
        #[clap(long)]
        username: Option<String>,
        /// Exact date, YYYY-MM-DD.
        #[clap(long)]
        date: Option<String>,
        #[clap(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

pub fn run_break_cli(store: &Store, cli: BreakCli) -> Result<(), RollcallError> {
    match cli.command {
        BreakCommand::Start { username } => {
            let session = break_in(store, &username, time::today_local(), time::now_local())?;
            println!(
                "{} Break started for '{}' at {}",
                "✓".green(),
                username,
                session
                    .break_in_time
                    .map(|t| t.to_string())
                    .unwrap_or_default()
            );
        }
        BreakCommand::End { username } => {
            let session = break_out(store, &username, time::today_local(), time::now_local())?;
            println!(
                "{} Break ended for '{}' ({} minute(s))",
                "✓".green(),
                username,
                session.duration_minutes().unwrap_or(0)
            );
        }
        BreakCommand::List {
            username,
            date,
            format,
        } => {
            let date = date.as_deref().map(time::parse_date).transpose()?;
            let sessions = list_breaks(store, username.as_deref(), date)?;
            match format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&sessions)
                        .map_err(|e| RollcallError::Validation(e.to_string()))?
                ),
                OutputFormat::Text => {
                    if sessions.is_empty() {
                        println!("No break sessions found.");
                        return Ok(());
                    }
                    for session in sessions {
                        let span = match (session.break_in_time, session.break_out_time) {
                            (Some(break_in), Some(break_out)) => {
                                format!("{break_in} to {break_out}")
                            }
                            (Some(break_in), None) => format!("{break_in} (open)"),
                            _ => "incomplete".to_string(),
                        };
                        let duration = session
                            .duration_minutes()
                            .map(|m| format!("{m} min"))
                            .unwrap_or_else(|| "-".to_string());
                        println!(
                            "{} {}: {} [{}]",
                            session.attendance_date, session.username, span, duration
                        );
                    }
                }
            }
        }
    }
    Ok(())
}
