use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pipeline_core::{AccountField, OpportunityForm, Stage};
use pipeline_http::{create_router, AppState};
use pipeline_service::OpportunityService;
use pipeline_storage::Storage;

#[derive(Parser)]
#[command(name = "pipeline-crm")]
#[command(about = "Multi-tenant sales pipeline server", long_about = None)]
struct Cli {
    /// SQLite database path; defaults to the platform data directory.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server.
    Serve {
        #[arg(short, long, default_value = "8700")]
        port: u16,
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
    },
    /// Print row counts for the database.
    Stats,
    /// Create a demo site with users, accounts, a campaign, and a handful
    /// of opportunities for local development.
    Seed,
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pipeline-crm")
        .join("crm.db")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();
    let db_path = cli.db.unwrap_or_else(default_db_path);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let storage = Arc::new(Storage::new(&db_path)?);

    match cli.command {
        Commands::Serve { port, host } => {
            let opportunities = Arc::new(OpportunityService::new(Arc::clone(&storage)));
            let state = Arc::new(AppState::new(storage, opportunities));
            let router = create_router(state);
            let addr = format!("{host}:{port}");
            tracing::info!("Starting HTTP server on {}", addr);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            axum::serve(listener, router).await?;
        },
        Commands::Stats => {
            let stats = storage.get_stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        },
        Commands::Seed => {
            seed(storage)?;
        },
    }

    Ok(())
}

fn seed(storage: Arc<Storage>) -> Result<()> {
    let site = storage.create_site("demo")?;
    let alice = storage.create_user(&site.id, "alice", "Alice Example")?;
    storage.create_user(&site.id, "bob", "Bob Example")?;
    let scope = alice.scope();

    let campaign = storage.create_campaign(&scope, "Spring launch")?;
    let service = OpportunityService::new(Arc::clone(&storage));

    let deals = [
        ("Globex renewal", Stage::Negotiation, 12_000.0),
        ("Initech pilot", Stage::Prospecting, 4_500.0),
        ("Umbrella expansion", Stage::Proposal, 30_000.0),
        ("Hooli migration", Stage::Won, 55_000.0),
    ];
    for (name, stage, amount) in deals {
        let form = OpportunityForm {
            name: name.to_string(),
            stage: Some(stage),
            amount: Some(amount),
            campaign_id: Some(campaign.id.clone()),
            account: AccountField { id: None, name: Some(format!("{name} Co")) },
            ..OpportunityForm::default()
        };
        service.create(&scope, &form)?;
    }

    println!("Seeded demo site {}", site.id);
    println!("X-User-Id for requests: {}", alice.id);
    Ok(())
}
