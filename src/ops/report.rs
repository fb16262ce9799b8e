//! Read-only verification and reporting.
//!
//! Nothing here writes. These are the same questions the operations modules
//! answer for themselves (does this column exist, who is marked today, who
//! is active), exposed as human-readable reports for inspection after an
//! init, a migration or a sweep.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::Colorize;
use rusqlite::Connection;
use serde::Serialize;

use crate::core::error::RollcallError;
use crate::core::migration;
use crate::core::schemas;
use crate::core::store::Store;
use crate::core::time;
use crate::ops::OutputFormat;
use crate::ops::users::{self, ROLE_EMPLOYEE, User};

/// Verification result for one table against the expected layout.
#[derive(Debug, Clone, Serialize)]
pub struct TableCheck {
    pub table: String,
    pub exists: bool,
    pub missing_columns: Vec<String>,
    pub row_count: Option<i64>,
}

impl TableCheck {
    pub fn ok(&self) -> bool {
        self.exists && self.missing_columns.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaReport {
    pub tables: Vec<TableCheck>,
}

impl SchemaReport {
    /// True when every expected table exists with every expected column.
    pub fn ok(&self) -> bool {
        self.tables.iter().all(TableCheck::ok)
    }
}

/// Sweep dry run for one date: who would be marked Absent if the sweep ran
/// now, without writing anything.
#[derive(Debug, Clone, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub active_employees: i64,
    pub present: i64,
    pub absent: i64,
    pub unmarked: i64,
    pub holiday: Option<String>,
}

fn check_table(
    conn: &Connection,
    table: &str,
    required_columns: &[&str],
) -> Result<TableCheck, RollcallError> {
    if !migration::table_exists(conn, table)? {
        return Ok(TableCheck {
            table: table.to_string(),
            exists: false,
            missing_columns: required_columns.iter().map(|c| c.to_string()).collect(),
            row_count: None,
        });
    }
    let mut missing = Vec::new();
    for column in required_columns {
        if !migration::column_exists(conn, table, column)? {
            missing.push(column.to_string());
        }
    }
    // Identifier comes from the static REQUIRED_TABLES list, not user input.
    let row_count: i64 =
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })?;
    Ok(TableCheck {
        table: table.to_string(),
        exists: true,
        missing_columns: missing,
        row_count: Some(row_count),
    })
}

/// Compares the live schema against the expected layout, table by table.
/// Fails with `NotFound` when the database file does not exist.
pub fn verify_schema(store: &Store) -> Result<SchemaReport, RollcallError> {
    store.with_existing_conn(|conn| {
        let mut tables = Vec::new();
        for (table, columns) in schemas::REQUIRED_TABLES {
            tables.push(check_table(conn, table, columns)?);
        }
        Ok(SchemaReport { tables })
    })
}

/// Every employee account with its active/inactive state, for eyeballing
/// the effect of activate/deactivate.
pub fn employee_status(store: &Store) -> Result<Vec<User>, RollcallError> {
    users::list_employees(store, true)
}

/// Counts for one attendance day: how many active employees exist, how many
/// are marked Present/Absent, and how many the sweep would still pick up.
pub fn day_summary(store: &Store, date: NaiveDate) -> Result<DaySummary, RollcallError> {
    store.with_existing_conn(|conn| {
        let active_employees: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users u JOIN roles r ON r.role_id = u.role_id
             WHERE r.role_name = ?1 AND u.is_active = 1",
            [ROLE_EMPLOYEE],
            |row| row.get(0),
        )?;
        let count_status = |status: &str| -> Result<i64, RollcallError> {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM attendance a
                 JOIN users u ON u.user_id = a.user_id
                 JOIN roles r ON r.role_id = u.role_id
                 WHERE a.attendance_date = ?1 AND a.status = ?2 AND r.role_name = ?3",
                rusqlite::params![date, status, ROLE_EMPLOYEE],
                |row| row.get(0),
            )?)
        };
        let present = count_status("Present")?;
        let absent = count_status("Absent")?;
        let unmarked: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users u JOIN roles r ON r.role_id = u.role_id
             WHERE r.role_name = ?1 AND u.is_active = 1
               AND u.user_id NOT IN
                   (SELECT user_id FROM attendance WHERE attendance_date = ?2)",
            rusqlite::params![ROLE_EMPLOYEE, date],
            |row| row.get(0),
        )?;
        let holiday = crate::ops::holidays::holiday_on(conn, date)?;
        Ok(DaySummary {
            date,
            active_employees,
            present,
            absent,
            unmarked,
            holiday,
        })
    })
}

/// Profile fields for every employee, for verifying a profile migration.
pub fn profile_report(store: &Store) -> Result<Vec<User>, RollcallError> {
    users::list_employees(store, true)
}

#[derive(Parser, Debug)]
#[clap(name = "report", about = "Read-only status reports.")]
pub struct ReportCli {
    #[clap(subcommand)]
    pub command: ReportCommand,
}

#[derive(Subcommand, Debug)]
pub enum ReportCommand {
    /// Active/inactive state of every employee account.
    Status {
        #[clap(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Attendance counts for one day (today by default).
    Day {
        /// Date to summarize, YYYY-MM-DD.
        #[clap(long)]
        date: Option<String>,
        #[clap(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Profile fields for every employee.
    Profile {
        #[clap(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), RollcallError> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).map_err(|e| RollcallError::Validation(e.to_string()))?
    );
    Ok(())
}

/// Prints the schema verification report; returns `Validation` when the
/// store does not match the expected layout, so scripts can gate on it.
pub fn run_check(store: &Store, format: OutputFormat) -> Result<(), RollcallError> {
    let report = verify_schema(store)?;
    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => {
            for check in &report.tables {
                if check.ok() {
                    println!(
                        "{} {} ({} row(s))",
                        "✓".green(),
                        check.table,
                        check.row_count.unwrap_or(0)
                    );
                } else if !check.exists {
                    println!("{} {} missing", "✗".red(), check.table);
                } else {
                    println!(
                        "{} {} missing column(s): {}",
                        "✗".red(),
                        check.table,
                        check.missing_columns.join(", ")
                    );
                }
            }
        }
    }
    if report.ok() {
        Ok(())
    } else {
        Err(RollcallError::Validation(
            "schema does not match the expected layout; run 'rollcall migrate'".to_string(),
        ))
    }
}

pub fn run_report_cli(store: &Store, cli: ReportCli) -> Result<(), RollcallError> {
    match cli.command {
        ReportCommand::Status { format } => {
            let employees = employee_status(store)?;
            match format {
                OutputFormat::Json => print_json(&employees)?,
                OutputFormat::Text => {
                    for user in employees {
                        let state = if user.is_active {
                            "Active".green()
                        } else {
                            "Inactive".red()
                        };
                        println!("{} ({}): {}", user.full_name, user.username, state);
                    }
                }
            }
        }
        ReportCommand::Day { date, format } => {
            let date = match date {
                Some(raw) => time::parse_date(&raw)?,
                None => time::today_local(),
            };
            let summary = day_summary(store, date)?;
            match format {
                OutputFormat::Json => print_json(&summary)?,
                OutputFormat::Text => {
                    println!("Attendance for {}", summary.date);
                    if let Some(name) = &summary.holiday {
                        println!("  Holiday: {name} (sweep skipped)");
                    }
                    println!("  Active employees: {}", summary.active_employees);
                    println!("  Present: {}", summary.present);
                    println!("  Absent: {}", summary.absent);
                    println!("  Unmarked (sweep would mark): {}", summary.unmarked);
                }
            }
        }
        ReportCommand::Profile { format } => {
            let employees = profile_report(store)?;
            match format {
                OutputFormat::Json => print_json(&employees)?,
                OutputFormat::Text => {
                    let field = |value: &Option<String>| match value {
                        Some(v) => v.clone(),
                        None => "Not set".to_string(),
                    };
                    for user in employees {
                        println!("{} ({})", user.full_name.bold(), user.username);
                        println!("  Phone:         {}", field(&user.phone));
                        println!("  Qualification: {}", field(&user.qualification));
                        println!("  Experience:    {}", field(&user.experience));
                        println!("  Job role:      {}", field(&user.job_role));
                    }
                }
            }
        }
    }
    Ok(())
}
