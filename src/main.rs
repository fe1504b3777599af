use northwind_assistant::config::Settings;
use northwind_assistant::conversation::{DialogueOrchestrator, DialogueStep};
use northwind_assistant::data_assistant::DataAssistant;
use northwind_assistant::schema_rag::{Retriever, SchemaRetriever};

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEMO_TURNS: [&str; 2] = [
    "Top products in Q2",
    "Q2 2024 by revenue net after discount ShipCountry",
];

#[derive(Parser)]
#[command(name = "northwind-assistant")]
#[command(about = "Conversational analytics over the Northwind database")]
#[command(version)]
struct Args {
    /// Path to the Northwind SQLite database (or set NORTHWIND_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Directory with schema_notes.md / sample_queries.md (or set DOCS_DIR)
    #[arg(long, global = true)]
    docs_dir: Option<PathBuf>,

    /// OpenAI API key (or set OPENAI_API_KEY env var)
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive conversation; type 'exit' to quit
    Chat,
    /// Ask a single question
    Ask {
        /// The question in natural language
        question: String,
    },
    /// Scripted walkthrough: an ambiguous question followed by its clarification
    Demo,
    /// Show the schema snippets retrieved for a question
    Schema {
        question: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut settings = Settings::from_env()?;
    if let Some(db) = args.db {
        settings.northwind_db = db;
    }
    if let Some(dir) = args.docs_dir {
        settings.docs_dir = dir;
    }
    if args.api_key.is_some() {
        settings.openai_api_key = args.api_key;
    }

    match args.command {
        Commands::Chat => run_chat(&settings).await,
        Commands::Ask { question } => run_ask(&settings, &question).await,
        Commands::Demo => run_demo(&settings).await,
        Commands::Schema { question } => run_schema(&settings, &question).await,
    }
}

async fn run_chat(settings: &Settings) -> Result<()> {
    let mut assistant = DataAssistant::from_settings(settings)?;
    println!("\nNorthwind Analytics Assistant\nType 'exit' to quit.\n");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("You: ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let question = line?.trim().to_string();
        if question.is_empty() || matches!(question.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        match assistant.ask(&question).await {
            Ok(reply) => println!("\nAssistant:\n{}\n", reply.message()),
            Err(e) => println!("[Error] {}", e),
        }
    }
    Ok(())
}

async fn run_ask(settings: &Settings, question: &str) -> Result<()> {
    let mut assistant = DataAssistant::from_settings(settings)?;
    let reply = assistant.ask(question).await?;
    println!("{}", reply.message());
    Ok(())
}

async fn run_demo(settings: &Settings) -> Result<()> {
    match DataAssistant::from_settings(settings) {
        Ok(mut assistant) => {
            for turn in DEMO_TURNS {
                println!("You: {}", turn);
                let reply = assistant.ask(turn).await?;
                println!("\nAssistant:\n{}\n", reply.message());
            }
        }
        Err(e) => {
            warn!("{} - running the dialogue without SQL execution", e);
            let mut orchestrator = DialogueOrchestrator::new(settings.conversation);
            for turn in DEMO_TURNS {
                println!("You: {}", turn);
                match orchestrator.next_action(turn) {
                    DialogueStep::Clarification { assistant_reply, .. } => {
                        println!("\nAssistant:\n{}\n", assistant_reply)
                    }
                    DialogueStep::Proceed {
                        transcript,
                        preference_hints,
                    } => println!(
                        "\nReady for SQL generation.\n\nContext:\n{}\n\nPreferences:\n{}\n",
                        transcript, preference_hints
                    ),
                }
            }
        }
    }
    Ok(())
}

async fn run_schema(settings: &Settings, question: &str) -> Result<()> {
    let retriever = SchemaRetriever::from_sqlite(
        &settings.northwind_db,
        Some(settings.docs_dir.as_path()),
        settings.top_k,
    )?;
    let snippets = retriever.retrieve(question).await?;
    info!("Retrieved {} snippet(s)", snippets.len());
    if snippets.is_empty() {
        println!("(no context retrieved)");
    } else {
        println!("{}", snippets.join("\n---\n"));
    }
    Ok(())
}
