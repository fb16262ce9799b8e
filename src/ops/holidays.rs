//! Holiday calendar: reference dates excluded from the absent sweep.
//!
//! One row per date. The sweep asks [`holiday_on`] before writing anything,
//! so an employee is never marked Absent for a day the company was closed.

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

#[derive(Debug, Clone, Serialize)]
pub struct Holiday {
    pub holiday_id: i64,
    pub holiday_date: NaiveDate,
    pub holiday_name: String,
    pub description: Option<String>,
    pub created_by: i64,
    pub creator_name: String,
    pub created_at: NaiveDateTime,
}

const HOLIDAY_COLUMNS: &str = "h.holiday_id, h.holiday_date, h.holiday_name, h.description, \
     h.created_by, u.full_name, h.created_at";

fn holiday_from_row(row: &Row) -> rusqlite::Result<Holiday> {
    Ok(Holiday {
        holiday_id: row.get(0)?,
        holiday_date: row.get(1)?,
        holiday_name: row.get(2)?,
        description: row.get(3)?,
        created_by: row.get(4)?,
        creator_name: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Name of the holiday on `date`, if the calendar has one. Takes a borrowed
/// connection so the sweep can ask inside its own scoped connection.
pub(crate) fn holiday_on(
    conn: &Connection,
    date: NaiveDate,
) -> Result<Option<String>, RollcallError> {
    let mut stmt = conn.prepare("SELECT holiday_name FROM holidays WHERE holiday_date = ?1")?;
    let mut rows = stmt.query_map([date], |row| row.get::<_, String>(0))?;
    match rows.next() {
        Some(name) => Ok(Some(name?)),
        None => Ok(None),
    }
}

pub fn is_holiday(store: &Store, date: NaiveDate) -> Result<Option<String>, RollcallError> {
    store.with_conn(|conn| holiday_on(conn, date))
}

/// Adds a holiday. Only an active admin may edit the calendar; a duplicate
/// date is rejected by the `UNIQUE(holiday_date)` constraint.
pub fn add_holiday(
    store: &Store,
    creator: &str,
    date: NaiveDate,
    name: &str,
    description: Option<&str>,
    now: NaiveDateTime,
) -> Result<Holiday, RollcallError> {
    if name.trim().is_empty() {
        return Err(RollcallError::Validation(
            "holiday name is required".to_string(),
        ));
    }
    store.with_conn(|conn| {
        let admin = users::require_active_admin(conn, creator)?;
        conn.execute(
            "INSERT INTO holidays (holiday_date, holiday_name, description, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![date, name.trim(), description, admin.user_id, now],
        )?;
        let query = format!(
            "SELECT {HOLIDAY_COLUMNS} FROM holidays h JOIN users u ON u.user_id = h.created_by
             WHERE h.holiday_id = ?1"
        );
        Ok(conn.query_row(&query, [conn.last_insert_rowid()], holiday_from_row)?)
    })
}

/// Lists holidays in calendar order, optionally narrowed to one `YYYY-MM`.
pub fn list_holidays(store: &Store, month: Option<&str>) -> Result<Vec<Holiday>, RollcallError> {
    store.with_conn(|conn| {
        let mut query = format!(
            "SELECT {HOLIDAY_COLUMNS} FROM holidays h JOIN users u ON u.user_id = h.created_by"
        );
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        if let Some(month) = month {
            query.push_str(" WHERE strftime('%Y-%m', h.holiday_date) = ?");
            params.push(Box::new(month.to_string()));
        }
        query.push_str(" ORDER BY h.holiday_date");

        let params_as_dyn: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map(&params_as_dyn[..], holiday_from_row)?;
        let mut holidays = Vec::new();
        for row in rows {
            holidays.push(row?);
        }
        Ok(holidays)
    })
}

#[derive(Parser, Debug)]
#[clap(name = "holiday", about = "Maintain the holiday calendar.")]
pub struct HolidayCli {
    #[clap(subcommand)]
    pub command: HolidayCommand,
}

#[derive(Subcommand, Debug)]
pub enum HolidayCommand {
    /// Add a holiday (admin only).
    Add {
        #[clap(long)]
        actor: String,
        /// Holiday date, YYYY-MM-DD.
        #[clap(long)]
        date: String,
        #[clap(long)]
        name: String,
        #[clap(long)]
        description: Option<String>,
    },
    /// List holidays.
    List {
        /// Whole month, YYYY-MM.
        #[clap(long)]
        month: Option<String>,
        #[clap(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

pub fn run_holiday_cli(store: &Store, cli: HolidayCli) -> Result<(), RollcallError> {
    match cli.command {
        HolidayCommand::Add {
            actor,
            date,
            name,
            description,
        } => {
            let holiday = add_holiday(
                store,
                &actor,
                time::parse_date(&date)?,
                &name,
                description.as_deref(),
                time::now_local(),
            )?;
            println!(
                "{} Holiday '{}' added on {}",
                "✓".green(),
                holiday.holiday_name,
                holiday.holiday_date
            );
        }
        HolidayCommand::List { month, format } => {
            let month = month.as_deref().map(time::parse_month).transpose()?;
            let holidays = list_holidays(store, month.as_deref())?;
            match format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&holidays)
                        .map_err(|e| RollcallError::Validation(e.to_string()))?
                ),
                OutputFormat::Text => {
                    if holidays.is_empty() {
                        println!("No holidays found.");
                        return Ok(());
                    }
                    for holiday in holidays {
                        println!(
                            "{} {} {}",
                            holiday.holiday_date,
                            holiday.holiday_name.bold(),
                            holiday
                                .description
                                .as_deref()
                                .map(|d| format!("- {d}"))
                                .unwrap_or_default()
                        );
                    }
                }
            }
        }
    }
    Ok(())
}
