use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;

use citydash::services::{NewTransport, Transport, TransportUpdate};
use citydash::{AuthError, CityClient, ClientConfig, ServiceError, SessionController};

#[derive(Parser)]
#[command(
    name = "citydash",
    version,
    about = "Smart city dashboard client for the city API gateway"
)]
struct Cli {
    /// Config file (TOML). Defaults to the platform config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print raw JSON instead of pretty-printed output
    #[arg(long, global = true)]
    json: bool,

    /// Re-check a restored session with the gateway before running
    #[arg(long, global = true)]
    verify: bool,

    /// Log level filter (overrides RUST_LOG)
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and remember the session on this device
    Login {
        #[arg(short, long)]
        username: String,
        /// Prompted for when omitted (keeps it out of shell history)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Forget the session on this device
    Logout,
    /// Show who is logged in
    Whoami,
    /// Gateway reachability and session summary
    Status,
    /// Aggregated city dashboard
    Dashboard,
    /// Tourist attractions
    Attractions,
    /// Air quality measures
    Air,
    /// Emergency vehicles and active interventions
    Emergency,
    /// Plan a trip within a zone
    PlanTrip {
        #[arg(long, default_value = citydash::services::city::DEFAULT_ZONE)]
        zone: String,
    },
    /// Transport lines (changes require an administrator)
    #[command(subcommand)]
    Transport(TransportCommand),
}

#[derive(Subcommand)]
enum TransportCommand {
    List,
    Get {
        id: i64,
    },
    Add {
        #[arg(long)]
        mode: String,
        #[arg(long)]
        route: String,
        #[arg(long, default_value = "operationnel")]
        status: String,
    },
    Update {
        id: i64,
        #[arg(long)]
        mode: Option<String>,
        #[arg(long)]
        route: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    Delete {
        id: i64,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log.as_deref());

    if let Err(e) = run(cli).await {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }
}

fn init_tracing(filter: Option<&str>) {
    let filter = match filter {
        Some(f) => tracing_subscriber::EnvFilter::new(f),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("citydash=warn")),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = ClientConfig::load(cli.config.as_deref())?;
    let session = Arc::new(SessionController::from_config(&config)?);

    if session.init() && cli.verify {
        match session.revalidate().await {
            Ok(()) => {}
            Err(e) if e.is_rejection() => {
                eprintln!("Your saved session is no longer valid. Please log in again.");
            }
            Err(e) => tracing::warn!(error = %e, "Continuing with unverified session"),
        }
    }

    let client = CityClient::new(session.clone());
    let pretty = !cli.json;

    match cli.command {
        Command::Login { username, password } => {
            let password = match password {
                Some(password) => password,
                None => dialoguer::Password::new()
                    .with_prompt("Password")
                    .interact()?,
            };
            let profile = session
                .login(&username, &password)
                .await
                .map_err(auth_failure)?;
            println!(
                "✅ Welcome {} ({})",
                profile.full_name,
                profile.role.label()
            );
        }
        Command::Logout => {
            session.logout();
            println!("✅ Logged out");
        }
        Command::Whoami => match session.current_profile() {
            Some(profile) => println!("{} ({})", profile.full_name, profile.role.label()),
            None => println!("Not logged in"),
        },
        Command::Status => {
            let healthy = client.gateway_health().await;
            println!(
                "Gateway {}: {}",
                config.gateway_url,
                if healthy { "online" } else { "unreachable" }
            );
            match session.current_profile() {
                Some(profile) => println!(
                    "Session: {} ({})",
                    profile.full_name,
                    profile.role.label()
                ),
                None => println!("Session: none"),
            }
        }
        Command::Dashboard => print_json(&client.city_dashboard().await.map_err(failure)?, pretty)?,
        Command::Attractions => print_json(&client.attractions().await.map_err(failure)?, pretty)?,
        Command::Air => print_json(&client.air_quality().await.map_err(failure)?, pretty)?,
        Command::Emergency => {
            let vehicles = client.emergency_vehicles().await.map_err(failure)?;
            let interventions = client.emergency_interventions().await.map_err(failure)?;
            print_json(
                &serde_json::json!({ "vehicles": vehicles, "interventions": interventions }),
                pretty,
            )?;
        }
        Command::PlanTrip { zone } => {
            print_json(&client.plan_trip(&zone).await.map_err(failure)?, pretty)?
        }
        Command::Transport(cmd) => run_transport(&client, cmd, pretty).await?,
    }

    Ok(())
}

async fn run_transport(client: &CityClient, cmd: TransportCommand, pretty: bool) -> Result<()> {
    match cmd {
        TransportCommand::List => {
            let transports = client.list_transports().await.map_err(failure)?;
            if pretty {
                for t in &transports {
                    print_transport(t);
                }
                if transports.is_empty() {
                    println!("No transport lines");
                }
            } else {
                print_json(&serde_json::to_value(&transports)?, false)?;
            }
        }
        TransportCommand::Get { id } => {
            let transport = client.get_transport(id).await.map_err(failure)?;
            print_transport(&transport);
        }
        TransportCommand::Add {
            mode,
            route,
            status,
        } => {
            let created = client
                .create_transport(&NewTransport::new(mode, route, status))
                .await
                .map_err(failure)?;
            println!("✅ Transport created");
            print_transport(&created);
        }
        TransportCommand::Update {
            id,
            mode,
            route,
            status,
        } => {
            let updated = client
                .update_transport(
                    id,
                    &TransportUpdate {
                        mode,
                        route,
                        status,
                    },
                )
                .await
                .map_err(failure)?;
            println!("✅ Transport updated");
            print_transport(&updated);
        }
        TransportCommand::Delete { id } => {
            client.delete_transport(id).await.map_err(failure)?;
            println!("✅ Transport {id} deleted");
        }
    }
    Ok(())
}

fn print_transport(t: &Transport) {
    println!("#{:<4} {:<8} {:<12} {}", t.id, t.mode, t.route, t.status);
}

fn print_json(value: &Value, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}

fn auth_failure(e: AuthError) -> anyhow::Error {
    tracing::debug!(error = %e, "Command failed");
    anyhow!(e.user_message())
}

fn failure(e: ServiceError) -> anyhow::Error {
    tracing::debug!(error = %e, "Command failed");
    anyhow!(e.user_message())
}
