//! `drydock maintenance` — list, schedule, flush, and bring machines up or down.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use colored::Colorize;

use drydock::client::MasterClient;
use drydock::config::Config;
use drydock::domain::maintenance_service::{MaintenanceService, Outcome};
use drydock::domain::types::{MachineState, MachineView};
use drydock::reporter::ConsoleReporter;

#[derive(Subcommand)]
pub enum MaintenanceCommands {
    /// Show machines that are down, draining or scheduled
    List {
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Bring machines back up, flushing draining ones first
    Up {
        /// Apply to every machine currently down or draining
        #[arg(long)]
        all: bool,

        /// Hostnames, IPs, agent ids or {"hostname","ip"} records
        hosts: Vec<String>,
    },
    /// Mark machines down, scheduling a window first where needed
    Down {
        #[arg(required = true)]
        hosts: Vec<String>,
    },
    /// Schedule a maintenance window
    Schedule {
        /// Window start, seconds since the epoch (default: now)
        #[arg(long)]
        start: Option<i64>,

        /// Window length in seconds (default from config, 3600)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        duration: Option<u64>,

        #[arg(required = true)]
        hosts: Vec<String>,
    },
    /// Remove machines from the maintenance schedule
    Flush {
        /// Remove every window
        #[arg(long)]
        all: bool,

        hosts: Vec<String>,
    },
}

pub fn run(config: &Config, command: &MaintenanceCommands) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_async(config, command))
}

async fn run_async(config: &Config, command: &MaintenanceCommands) -> Result<()> {
    let client = MasterClient::from_config(config)?;
    let service = MaintenanceService::new(client, config.maintenance.clone());
    let reporter = ConsoleReporter;

    let outcome = match command {
        MaintenanceCommands::List { format } => {
            let rows = service
                .list(&reporter)
                .await
                .context("listing maintenance status")?;
            return print_output(format, &rows);
        }
        MaintenanceCommands::Up { all, hosts } => service.up(hosts, *all, &reporter).await?,
        MaintenanceCommands::Down { hosts } => service.down(hosts, &reporter).await?,
        MaintenanceCommands::Schedule {
            start,
            duration,
            hosts,
        } => {
            service
                .schedule(*start, *duration, hosts, &reporter)
                .await?
        }
        MaintenanceCommands::Flush { all, hosts } => service.flush(hosts, *all, &reporter).await?,
    };

    summarize(&outcome);
    Ok(())
}

fn summarize(outcome: &Outcome) {
    if !outcome.unresolved.is_empty() {
        eprintln!(
            "{} {} host(s) not resolved: {}",
            "!!".red().bold(),
            outcome.unresolved.len(),
            outcome.unresolved.join(", ")
        );
    }
    if outcome.writes == 0 {
        println!("{} No changes were made on the master", "::".blue().bold());
    }
}

fn print_output(format: &str, rows: &[MachineView]) -> Result<()> {
    match format {
        "json" => {
            let json = serde_json::to_string_pretty(rows)?;
            println!("{}", json);
        }
        _ => print_table(rows),
    }
    Ok(())
}

fn print_table(rows: &[MachineView]) {
    if rows.is_empty() {
        println!("{} No machines are in maintenance", "::".blue().bold());
        return;
    }

    let host_width = rows
        .iter()
        .map(|r| r.hostname.len())
        .max()
        .unwrap_or(0)
        .max("HOST".len());
    let ip_width = rows.iter().map(|r| r.ip.len()).max().unwrap_or(0).max("IP".len());

    println!(
        "{}",
        format!(
            "{:<hw$}  {:<iw$}  {:<8}  {:<25}  {:<9}  {}",
            "HOST",
            "IP",
            "STATE",
            "START",
            "DURATION",
            "EXPIRED",
            hw = host_width,
            iw = ip_width
        )
        .bold()
    );

    for row in rows {
        let state = format!("{:<8}", row.state.to_string());
        let state = match row.state {
            MachineState::Down => state.red(),
            MachineState::Draining => state.yellow(),
            MachineState::Up => state.green(),
        };
        println!(
            "{:<hw$}  {:<iw$}  {}  {:<25}  {:<9}  {}",
            row.hostname,
            row.ip,
            state,
            row.start.map(fmt_start).unwrap_or_else(|| "-".to_string()),
            row.duration
                .map(fmt_duration)
                .unwrap_or_else(|| "-".to_string()),
            match row.expired {
                Some(true) => "yes",
                Some(false) => "no",
                None => "-",
            },
            hw = host_width,
            iw = ip_width
        );
    }
}

fn fmt_start(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| secs.to_string())
}

fn fmt_duration(secs: i64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let rest = secs % 60;
    if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else if mins > 0 {
        format!("{}m {}s", mins, rest)
    } else {
        format!("{}s", rest)
    }
}
