use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod collect;
mod config;
mod engine;
mod notify;
mod paths;
mod pipeline;
mod qc;
mod render;
mod scheduler;
mod store;
mod util;

use cli::{
    BatchArgs, ClientAddArgs, ClientCommand, ClientListArgs, Command, IntakeAuthorizeArgs,
    IntakeCommand, IntakeCreateArgs, QueueArgs, RootArgs, RunArgs,
};
use collect::{BreachApiClient, FileMentionSearch, ScannerCli};
use config::ServiceConfig;
use engine::{Collaborators, Engine, RunOutcome};
use notify::OutboxDispatcher;
use paths::DataPaths;
use pipeline::Tier;
use render::MarkdownRenderer;
use store::{ClientClass, EntityStore, IdentityPayload, IntakeStatus, IntakeType};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = RootArgs::parse();
    let config = config::load(args.config.as_deref())?;
    let data_dir = config::resolve_data_dir(&config, args.data_dir)?;
    let paths = DataPaths::new(data_dir);

    match args.command {
        Command::Client(ClientCommand::Add(add)) => cmd_client_add(&paths, add),
        Command::Client(ClientCommand::List(list)) => cmd_client_list(&paths, &list),
        Command::Intake(IntakeCommand::Create(create)) => cmd_intake_create(&paths, create),
        Command::Intake(IntakeCommand::Authorize(authorize)) => {
            cmd_intake_authorize(&paths, &authorize)
        }
        Command::Queue(queue) => cmd_queue(&paths, &queue),
        Command::Run(run) => cmd_run(&config, &paths, &run),
        Command::Batch(batch) => cmd_batch(&config, &paths, &batch),
    }
}

fn cmd_client_add(paths: &DataPaths, args: ClientAddArgs) -> Result<()> {
    let class = ClientClass::parse(&args.class)?;
    let mut store = EntityStore::open(paths.state_path())?;
    let id = store.create_client(&args.name, class, &args.email)?;
    let slug = store.client(&id).map(|client| client.slug.clone()).unwrap_or_default();
    println!("registered client {id} ({slug})");
    Ok(())
}

fn cmd_client_list(paths: &DataPaths, args: &ClientListArgs) -> Result<()> {
    let store = EntityStore::open(paths.state_path())?;
    if args.json {
        let clients: Vec<_> = store.clients().collect();
        println!("{}", serde_json::to_string_pretty(&clients)?);
        return Ok(());
    }
    for client in store.clients() {
        println!(
            "{}  {}  {}  intakes={} reports={}",
            client.id,
            client.slug,
            client.class,
            client.intakes.len(),
            client.reports.len()
        );
    }
    Ok(())
}

fn cmd_intake_create(paths: &DataPaths, args: IntakeCreateArgs) -> Result<()> {
    let intake_type = IntakeType::parse(&args.intake_type)?;
    let mut store = EntityStore::open(paths.state_path())?;
    let id = store.create_intake(
        &args.client,
        intake_type,
        &args.requested_by,
        args.replaces,
        IdentityPayload {
            emails: args.emails,
        },
    )?;
    println!("created intake {id} ({intake_type})");
    Ok(())
}

fn cmd_intake_authorize(paths: &DataPaths, args: &IntakeAuthorizeArgs) -> Result<()> {
    let mut store = EntityStore::open(paths.state_path())?;
    store.update_intake_status(&args.intake, IntakeStatus::Authorized, "operator")?;
    println!("authorized intake {}", args.intake);
    Ok(())
}

fn cmd_queue(paths: &DataPaths, args: &QueueArgs) -> Result<()> {
    let store = EntityStore::open(paths.state_path())?;
    let runnable = scheduler::list_runnable(&store);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&runnable)?);
        return Ok(());
    }
    if runnable.is_empty() {
        println!("queue empty");
        return Ok(());
    }
    for intake in runnable {
        println!(
            "{}  {}  client={}  created={}",
            intake.id,
            intake.intake_type,
            intake.client_id,
            intake.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

fn cmd_run(config: &ServiceConfig, paths: &DataPaths, args: &RunArgs) -> Result<()> {
    let mut store = EntityStore::open(paths.state_path())?;
    let scanner = ScannerCli::from_config(&config.scanner)?;
    let breaches = BreachApiClient::from_config(&config.breach);
    let mentions = FileMentionSearch::new(paths.mentions_dir());
    let renderer = MarkdownRenderer::new(paths.reports_dir(), paths.legal_requests_dir());
    let dispatcher = OutboxDispatcher::new(paths.outbox_dir(), config.notify.sender.clone());
    let collab = Collaborators {
        collector: &scanner,
        breaches: &breaches,
        mentions: &mentions,
        renderer: &renderer,
        dispatcher: &dispatcher,
    };

    let outcome = Engine::new(&mut store, paths, collab).run_intake(&args.intake)?;
    print_outcome(&outcome);
    Ok(())
}

fn cmd_batch(config: &ServiceConfig, paths: &DataPaths, _args: &BatchArgs) -> Result<()> {
    let mut store = EntityStore::open(paths.state_path())?;
    let scanner = ScannerCli::from_config(&config.scanner)?;
    let breaches = BreachApiClient::from_config(&config.breach);
    let mentions = FileMentionSearch::new(paths.mentions_dir());
    let renderer = MarkdownRenderer::new(paths.reports_dir(), paths.legal_requests_dir());
    let dispatcher = OutboxDispatcher::new(paths.outbox_dir(), config.notify.sender.clone());
    let collab = Collaborators {
        collector: &scanner,
        breaches: &breaches,
        mentions: &mentions,
        renderer: &renderer,
        dispatcher: &dispatcher,
    };

    let summary = scheduler::run_batch(&mut store, paths, collab);
    println!(
        "batch finished: {} executed, {} failed",
        summary.executed, summary.failed
    );
    Ok(())
}

fn print_outcome(outcome: &RunOutcome) {
    let mut critical = 0;
    let mut high = 0;
    let mut medium = 0;
    let mut low = 0;
    for finding in &outcome.findings {
        match finding.tier.unwrap_or(Tier::Low) {
            Tier::Critical => critical += 1,
            Tier::High => high += 1,
            Tier::Medium => medium += 1,
            Tier::Low => low += 1,
        }
    }
    println!(
        "report {} qc={} findings={} (critical={critical} high={high} medium={medium} low={low})",
        outcome.report_id,
        outcome.qc_status,
        outcome.findings.len()
    );
    if let Some(rescue) = &outcome.rescue_intake_id {
        println!("rescue intake created: {rescue}");
    }
}
