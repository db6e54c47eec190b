//! Parley - ask questions about a business database in plain English.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use db_parley::cli::{Cli, Command};
use db_parley::config::Config;
use db_parley::error::{ParleyError, Result};
use db_parley::llm;
use db_parley::loader;
use db_parley::pipeline::{Pipeline, ResponseEnvelope, EXAMPLE_QUESTIONS};
use db_parley::store::{SqliteStore, Store};

#[tokio::main]
async fn main() {
    // Pick up OPENAI_API_KEY and friends from a local .env, if present
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays clean for answers and JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let config_path = cli.config_path();
    let mut config = Config::load_from_file(&config_path)?;

    // CLI flags override the config file
    if let Some(provider) = &cli.provider {
        config.llm.provider = provider.clone();
    }
    if let Some(model) = &cli.model {
        config.llm.model = Some(model.clone());
    }
    if let Some(db) = &cli.db {
        config.database.path = db.clone();
    }

    match &cli.command {
        Command::Ask { question, json } => run_ask(&config, &question.join(" "), *json).await,
        Command::Schema { json } => run_schema(&config, *json).await,
        Command::Suggest => {
            for (i, question) in EXAMPLE_QUESTIONS.iter().enumerate() {
                println!("{}. {}", i + 1, question);
            }
            Ok(())
        }
        Command::Setup => run_setup(&config).await,
    }
}

async fn run_ask(config: &Config, question: &str, json: bool) -> Result<()> {
    let store: Arc<dyn Store> = Arc::new(SqliteStore::new(&config.database.path));
    let client = llm::create_client(&config.llm)?;
    let pipeline = Pipeline::bootstrap(store, client).await?;

    match pipeline.answer_question(question).await {
        Ok(envelope) => {
            if json {
                println!("{}", to_pretty_json(&envelope)?);
            } else {
                print_envelope(&envelope);
            }
            Ok(())
        }
        Err(request_error) => {
            if json {
                println!("{}", to_pretty_json(&request_error)?);
            } else {
                eprintln!("Error: {}", request_error.message);
            }
            std::process::exit(1);
        }
    }
}

async fn run_schema(config: &Config, json: bool) -> Result<()> {
    let store = SqliteStore::new(&config.database.path);
    let catalog = store.discover().await?;

    if json {
        println!("{}", to_pretty_json(&catalog)?);
    } else if catalog.is_empty() {
        println!("No tables found. Run `parley setup` to build the database.");
    } else {
        print!("{}", catalog.render_for_prompt().trim_start());
    }
    Ok(())
}

async fn run_setup(config: &Config) -> Result<()> {
    info!("Building database at {}", config.database.path.display());
    let summary = loader::setup_database(&config.database.path).await?;

    println!(
        "Loaded {} of {} tables ({} rows) into {}",
        summary.tables_loaded,
        loader::CSV_SOURCES.len(),
        summary.rows_loaded,
        config.database.path.display()
    );
    for failure in &summary.failures {
        eprintln!("Failed: {}", failure);
    }
    Ok(())
}

fn print_envelope(envelope: &ResponseEnvelope) {
    println!("{}", envelope.response);

    if !envelope.sql_query.is_empty() {
        println!();
        println!("SQL: {}", envelope.sql_query);
    }

    if !envelope.data.is_empty() {
        println!(
            "Showing {} of {} rows:",
            envelope.data.len(),
            envelope.total_rows
        );
        println!("{}", envelope.columns.join(" | "));
        for row in &envelope.data {
            let values: Vec<String> = row.iter().map(|v| v.to_display_string()).collect();
            println!("{}", values.join(" | "));
        }
    }
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ParleyError::internal(format!("Failed to serialize output: {e}")))
}
