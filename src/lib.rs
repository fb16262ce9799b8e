//! Rollcall: persistence engine for employee attendance tracking.
//!
//! One SQLite database file holds accounts, daily attendance, break
//! sessions, leave requests and the holiday calendar. The library owns the
//! schema, its additive migrations and the lifecycle rules; the `rollcall`
//! binary is strictly a caller of that surface.
//!
//! # Layout
//!
//! - [`core`]: store handle, schema, migrations, configuration, errors
//! - [`ops`]: lifecycle operations (accounts, attendance, breaks, leave,
//!   holidays) and read-only reports
//!
//! # Rules worth knowing
//!
//! - At most one attendance record per (user, date); the `UNIQUE`
//!   constraint is the final arbiter, so racing writers produce exactly one
//!   row.
//! - The absent sweep runs only after the configured cutoff hour, skips
//!   holiday dates, and is idempotent.
//! - Accounts are soft-deleted: deactivation blocks login and all
//!   mutations but keeps history; an admin can never deactivate themselves.
//! - Leave requests are reviewed exactly once; the Pending check rides in
//!   the UPDATE's WHERE clause.

pub mod core;
pub mod ops;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;

use crate::core::config::Config;
use crate::core::db;
use crate::core::error::RollcallError;
use crate::core::migration;
use crate::core::store::Store;
use crate::ops::OutputFormat;
use crate::ops::attendance::{self, AttendanceCli};
use crate::ops::breaks::{self, BreakCli};
use crate::ops::holidays::{self, HolidayCli};
use crate::ops::leave::{self, LeaveCli};
use crate::ops::report::{self, ReportCli};
use crate::ops::users::{self, EmployeeCli};

#[derive(Parser, Debug)]
#[clap(
    name = "rollcall",
    version = env!("CARGO_PKG_VERSION"),
    about = "Attendance tracking over a single SQLite store: init, migrate, mark, sweep, report."
)]
struct Cli {
    /// Config file (default: ./rollcall.toml if present).
    #[clap(long, global = true)]
    config: Option<PathBuf>,
    /// Database file, overriding the configured path.
    #[clap(long, global = true)]
    db: Option<PathBuf>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database schema and seed roles and bootstrap accounts.
    Init,
    /// Apply pending additive migrations to an existing database.
    Migrate {
        /// List pending migrations without applying them.
        #[clap(long)]
        dry_run: bool,
    },
    /// Verify the live schema against the expected layout.
    Check {
        #[clap(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Check credentials against the store.
    Login {
        #[clap(long)]
        username: String,
        #[clap(long)]
        password: String,
    },
    /// Manage employee accounts and profiles.
    Employee(EmployeeCli),
    /// Mark, sweep and list daily attendance.
    Attendance(AttendanceCli),
    /// Track break sessions.
    Break(BreakCli),
    /// Apply for and review leave.
    Leave(LeaveCli),
    /// Maintain the holiday calendar.
    Holiday(HolidayCli),
    /// Read-only status reports.
    Report(ReportCli),
}

pub fn run() -> Result<(), RollcallError> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let db_path = cli.db.unwrap_or_else(|| config.storage.path.clone());
    let store = Store::new(db_path);

    match cli.command {
        Command::Init => {
            db::initialize_store(&store)?;
            println!(
                "{} Store initialized at {}",
                "✓".green(),
                store.path().display()
            );
        }
        Command::Migrate { dry_run } => {
            if dry_run {
                let pending = migration::pending_migrations(&store)?;
                if pending.is_empty() {
                    println!("{} Schema already up to date", "✓".green());
                } else {
                    for name in pending {
                        println!("pending: {name}");
                    }
                }
            } else {
                let migration_report = migration::apply_migrations(&store)?;
                if migration_report.up_to_date() {
                    println!("{} Schema already up to date", "✓".green());
                } else {
                    for name in &migration_report.applied {
                        println!("{} Applied migration '{name}'", "✓".green());
                    }
                }
            }
        }
        Command::Check { format } => report::run_check(&store, format)?,
        Command::Login { username, password } => {
            let user = users::authenticate(&store, &username, &password)?;
            println!(
                "{} Logged in as {} ({})",
                "✓".green(),
                user.full_name,
                user.role_name
            );
        }
        Command::Employee(employee_cli) => users::run_employee_cli(&store, employee_cli)?,
        Command::Attendance(attendance_cli) => {
            attendance::run_attendance_cli(&store, config.attendance.cutoff_hour, attendance_cli)?
        }
        Command::Break(break_cli) => breaks::run_break_cli(&store, break_cli)?,
        Command::Leave(leave_cli) => leave::run_leave_cli(&store, leave_cli)?,
        Command::Holiday(holiday_cli) => holidays::run_holiday_cli(&store, holiday_cli)?,
        Command::Report(report_cli) => report::run_report_cli(&store, report_cli)?,
    }
    Ok(())
}
