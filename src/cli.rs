//! CLI argument parsing for the lifecycle workflow.
//!
//! The CLI is intentionally thin: it wires the store, scheduler, and engine
//! together without embedding policy, so the same core logic can be driven
//! from cron or tests.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint for the monitoring lifecycle.
#[derive(Parser, Debug)]
#[command(
    name = "mapard",
    version,
    about = "Client intelligence monitoring lifecycle engine",
    after_help = "Examples:\n  mapard client add --name \"Ada Lovelace\" --email ada@example.com\n  mapard intake create --client C1AB2CD --type baseline --email ada@example.com\n  mapard intake authorize I-C1AB2CD-0001\n  mapard queue --json\n  mapard run --intake I-C1AB2CD-0001\n  mapard batch",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Data directory holding tracking state, reports, raw evidence, outbox
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Path to a service config JSON file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level workflow commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage registered clients
    #[command(subcommand)]
    Client(ClientCommand),
    /// Manage service intakes
    #[command(subcommand)]
    Intake(IntakeCommand),
    /// List authorized intakes in execution order
    Queue(QueueArgs),
    /// Execute a single authorized intake end to end
    Run(RunArgs),
    /// Execute every authorized intake in priority order
    Batch(BatchArgs),
}

/// Client management commands.
#[derive(Subcommand, Debug)]
pub enum ClientCommand {
    Add(ClientAddArgs),
    List(ClientListArgs),
}

/// Register a client; idempotent on the registration email.
#[derive(Parser, Debug)]
#[command(about = "Register a client (idempotent on email)")]
pub struct ClientAddArgs {
    /// Full client name
    #[arg(long)]
    pub name: String,

    /// Contact email; also the registration idempotency key
    #[arg(long)]
    pub email: String,

    /// Client class: individual or organization
    #[arg(long, default_value = "individual")]
    pub class: String,
}

/// List registered clients.
#[derive(Parser, Debug)]
#[command(about = "List registered clients")]
pub struct ClientListArgs {
    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

/// Intake management commands.
#[derive(Subcommand, Debug)]
pub enum IntakeCommand {
    Create(IntakeCreateArgs),
    Authorize(IntakeAuthorizeArgs),
}

/// Submit a new intake for a client.
#[derive(Parser, Debug)]
#[command(about = "Submit a new intake for a client")]
pub struct IntakeCreateArgs {
    /// Owning client id
    #[arg(long)]
    pub client: String,

    /// Intake type: baseline, periodic, incident, rescue, or on-demand
    #[arg(long = "type", value_name = "TYPE")]
    pub intake_type: String,

    /// Identity email used to target collection (repeatable)
    #[arg(long = "email", value_name = "EMAIL")]
    pub emails: Vec<String>,

    /// Requester identity recorded on the intake
    #[arg(long, default_value = "operator")]
    pub requested_by: String,

    /// Report id being replaced; required for rescue intakes
    #[arg(long, value_name = "REPORT_ID")]
    pub replaces: Option<String>,
}

/// Authorize a submitted intake for execution.
#[derive(Parser, Debug)]
#[command(about = "Authorize a submitted intake")]
pub struct IntakeAuthorizeArgs {
    /// Intake id (I-<client>-<seq>)
    pub intake: String,
}

/// Queue listing inputs.
#[derive(Parser, Debug)]
#[command(about = "List authorized intakes in execution order")]
pub struct QueueArgs {
    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

/// Single-intake execution inputs.
#[derive(Parser, Debug)]
#[command(about = "Execute one authorized intake end to end")]
pub struct RunArgs {
    /// Intake id to execute
    #[arg(long)]
    pub intake: String,
}

/// Batch execution inputs.
#[derive(Parser, Debug)]
#[command(about = "Execute every authorized intake in priority order")]
pub struct BatchArgs {}
