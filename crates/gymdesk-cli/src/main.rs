//! GymDesk CLI
//!
//! Command-line front end for the gym management backend

mod app;
mod config;

use anyhow::{Context, bail};
use app::App;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use config::AppConfig;
use gymdesk_core::types::{DateRange, Pagination, PaymentMethod, ReportBucket};
use gymdesk_observability::init_logging;
use gymdesk_session::View;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "gymdesk")]
#[command(about = "GymDesk - front desk client for the gym management backend", long_about = None)]
struct Cli {
    /// Config file (YAML or TOML); defaults to ~/.gymdesk/config.yaml when present
    #[arg(long, global = true, env = "GYMDESK_CONFIG")]
    config: Option<PathBuf>,

    /// Print Prometheus metrics to stderr before exiting
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session credential
    Login {
        #[arg(long)]
        username: String,

        /// Read from stdin when omitted
        #[arg(long, env = "GYMDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Sign out and remove the stored credential
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Browse clients
    Clients {
        #[command(subcommand)]
        command: ClientCommands,
    },
    /// Browse payments
    Payments {
        #[command(subcommand)]
        command: PaymentCommands,
    },
    /// Register a check-in for a client
    Checkin { client_id: String },
    /// Aggregated reports
    Report {
        #[arg(value_enum)]
        kind: ReportKind,

        /// First day, YYYY-MM-DD
        #[arg(long)]
        start: NaiveDate,

        /// Last day, YYYY-MM-DD
        #[arg(long)]
        end: NaiveDate,

        /// day, week or month
        #[arg(long, default_value = "day")]
        bucket: ReportBucket,

        /// Revenue report only
        #[arg(long, value_enum)]
        method: Option<MethodArg>,
    },
    /// Incremental client search: each stdin line is the current input
    Search,
    /// Enter a view by path, e.g. /clients; prints the view actually shown
    Open { path: String },
}

#[derive(Subcommand)]
enum ClientCommands {
    List {
        #[arg(long)]
        query: Option<String>,

        #[arg(long, default_value = "10")]
        limit: u32,

        #[arg(long, default_value = "0")]
        offset: u32,
    },
    /// Whether a client's membership is paid up
    Status { id: String },
}

#[derive(Subcommand)]
enum PaymentCommands {
    List {
        #[arg(long)]
        client_id: Option<String>,

        #[arg(long, default_value = "10")]
        limit: u32,

        #[arg(long, default_value = "0")]
        offset: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportKind {
    Attendance,
    NewClients,
    Revenue,
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    Cash,
    Card,
    Transfer,
}

impl From<MethodArg> for PaymentMethod {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::Cash => PaymentMethod::Cash,
            MethodArg::Card => PaymentMethod::Card,
            MethodArg::Transfer => PaymentMethod::Transfer,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Warning: logging not initialized: {}", e);
    }

    let app = App::bootstrap(config)?;
    let result = run(&app, cli.command).await;

    if cli.metrics {
        eprint!("{}", app.metrics.render().context("Failed to render metrics")?);
    }
    result
}

async fn run(app: &App, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Login { username, password } => {
            let password = match password {
                Some(password) => password,
                None => read_password()?,
            };
            let claims = app.gateway.login(&username, &password).await?;
            println!("Signed in as {}", claims.display_label());
            if let Some(role) = &claims.role {
                println!("Role: {}", role);
            }
            if let Some(expires_at) = claims.expires_at {
                println!("Session expires at {}", expires_at.to_rfc3339());
            }
        }
        Commands::Logout => {
            let was_signed_in = app.session.is_authenticated();
            app.gateway.logout();
            if was_signed_in {
                println!("Signed out");
            } else {
                println!("Not signed in");
            }
        }
        Commands::Whoami => {
            let claims = app.enter(View::Home)?;
            println!("{}", claims.display_label());
            println!("  subject: {}", claims.subject);
            if let Some(email) = &claims.email {
                println!("  email:   {}", email);
            }
            if let Some(role) = &claims.role {
                println!("  role:    {}", role);
            }
            if let Some(expires_at) = claims.expires_at {
                println!("  expires: {}", expires_at.to_rfc3339());
            }
        }
        Commands::Clients { command } => {
            app.enter(View::Clients)?;
            match command {
                ClientCommands::List {
                    query,
                    limit,
                    offset,
                } => {
                    let page = app
                        .gateway
                        .list_clients(query.as_deref(), Pagination::new(limit, offset))
                        .await?;
                    for client in &page.items {
                        println!(
                            "{}  {}  {}  {}",
                            client.id,
                            client.full_name,
                            client.phone.as_deref().unwrap_or("-"),
                            if client.is_active { "active" } else { "inactive" }
                        );
                    }
                    println!("{} of {} clients", page.items.len(), page.total);
                }
                ClientCommands::Status { id } => {
                    let status = app.gateway.client_status(&id).await?;
                    let last = match (status.last_payment_month, status.last_payment_year) {
                        (Some(month), Some(year)) => format!("{:02}/{}", month, year),
                        _ => "never".to_string(),
                    };
                    println!(
                        "{}: {} (last paid period: {})",
                        status.full_name,
                        if status.is_up_to_date { "up to date" } else { "overdue" },
                        last
                    );
                }
            }
        }
        Commands::Payments { command } => {
            app.enter(View::Payments)?;
            match command {
                PaymentCommands::List {
                    client_id,
                    limit,
                    offset,
                } => {
                    let page = app
                        .gateway
                        .list_payments(client_id.as_deref(), Pagination::new(limit, offset))
                        .await?;
                    for payment in &page.items {
                        println!(
                            "{}  {}  {:.2}  {}  {:02}/{}",
                            payment.created_at.format("%Y-%m-%d"),
                            payment.client_id,
                            payment.amount,
                            payment.method.map(|m| m.as_str()).unwrap_or("-"),
                            payment.period_month,
                            payment.period_year
                        );
                    }
                    println!("{} of {} payments", page.items.len(), page.total);
                }
            }
        }
        Commands::Checkin { client_id } => {
            app.enter(View::Attendance)?;
            let receipt = app.gateway.check_in(&client_id).await?;
            if !receipt.ok {
                bail!("Check-in was not recorded");
            }
            println!("Checked in ({})", receipt.id);
        }
        Commands::Report {
            kind,
            start,
            end,
            bucket,
            method,
        } => {
            app.enter(View::Reports)?;
            let range = DateRange { start, end };
            match kind {
                ReportKind::Attendance | ReportKind::NewClients => {
                    let rows = if matches!(kind, ReportKind::Attendance) {
                        app.gateway.attendance_report(&range, bucket).await?
                    } else {
                        app.gateway.new_clients_report(&range, bucket).await?
                    };
                    for row in rows {
                        println!("{}  {}", row.bucket.format("%Y-%m-%d"), row.count);
                    }
                }
                ReportKind::Revenue => {
                    let rows = app
                        .gateway
                        .revenue_report(&range, bucket, method.map(PaymentMethod::from))
                        .await?;
                    for row in rows {
                        println!("{}  {:.2}", row.bucket.format("%Y-%m-%d"), row.total);
                    }
                }
            }
        }
        Commands::Search => {
            app.enter(View::Clients)?;
            search(app).await?;
        }
        Commands::Open { path } => {
            let view = app.open(&path)?;
            println!("{}", view);
        }
    }

    Ok(())
}

async fn search(app: &App) -> anyhow::Result<()> {
    let engine = app.search_engine();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        engine.input(&line)?;
    }

    let snapshot = app.settle(&engine).await?;
    engine.shutdown();

    if let Some(error) = &snapshot.error {
        bail!("Search failed: {}", error);
    }
    if snapshot.query.is_empty() {
        return Ok(());
    }

    println!("{} result(s) for \"{}\"", snapshot.total, snapshot.query);
    for entry in snapshot.entries.entries() {
        match &entry.stats {
            Some(stats) => {
                let last = stats
                    .last_payment
                    .as_ref()
                    .map(|p| format!("{:02}/{}", p.period_month, p.period_year))
                    .unwrap_or_else(|| "never".to_string());
                println!(
                    "{}  {}  visits: {}  last paid: {}",
                    entry.client.id, entry.client.full_name, stats.attendance_count, last
                );
            }
            None => println!("{}  {}", entry.client.id, entry.client.full_name),
        }
    }
    Ok(())
}

fn read_password() -> anyhow::Result<String> {
    eprint!("Password: ");
    std::io::stderr().flush()?;
    let mut password = String::new();
    std::io::stdin()
        .read_line(&mut password)
        .context("Failed to read password")?;
    Ok(password.trim_end_matches(['\r', '\n']).to_string())
}
