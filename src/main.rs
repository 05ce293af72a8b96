use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use mindmate::api::ApiServerBuilder;
use mindmate::{
    ChatPipeline, Config, HttpChatEndpoint, Identity, SessionProvider, SessionRegistry,
    SqliteConversationStore, db, emergency_resources,
};

/// MindMate - mental health companion chat service
#[derive(Parser)]
#[command(name = "mindmate", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API server (default)
    Serve {
        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Chat interactively from the terminal
    Chat {
        /// User ID whose history to load
        #[arg(short, long, env = "MINDMATE_USER")]
        user: String,
        /// Sign in as a guest
        #[arg(long)]
        guest: bool,
    },
    /// Show emergency resources for a country code
    Resources {
        /// ISO country code (e.g. US, GB)
        country: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,mindmate=info",
        1 => "info,mindmate=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => serve(port).await,
        Command::Chat { user, guest } => chat(user, guest).await,
        Command::Resources { country } => {
            print_resources(&country);
            Ok(())
        }
    }
}

async fn serve(port: Option<u16>) -> anyhow::Result<()> {
    let config = Config::load()?;
    let port = port.unwrap_or(config.server.port);

    tracing::info!(
        port,
        db = %config.db_path.display(),
        model = %config.chat.model,
        "starting mindmate"
    );

    let pool = db::init(&config.db_path)?;
    let endpoint = Arc::new(HttpChatEndpoint::from_config(&config)?);
    let store = Arc::new(SqliteConversationStore::new(pool.clone()));
    let sessions = Arc::new(
        SessionRegistry::new(config.chat.settings(), endpoint, store)
            .with_capacity(config.server.max_sessions),
    );

    let server = ApiServerBuilder::new(pool, Arc::clone(&sessions), port)
        .rate_limit_rpm(config.server.rate_limit_rpm)
        .build();

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
    }

    // Background conversation writes must land before the process exits
    sessions.flush_all().await;

    Ok(())
}

async fn chat(user: String, guest: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let pool = db::init(&config.db_path)?;

    let identity = if guest {
        Identity::guest(user)
    } else {
        Identity::user(user)
    };
    let provider = SessionProvider::signed_in(identity);

    let mut pipeline = ChatPipeline::new(
        config.chat.settings(),
        Arc::new(HttpChatEndpoint::from_config(&config)?),
        Arc::new(SqliteConversationStore::new(pool)),
        provider.subscribe(),
    );

    for message in pipeline.load_history().await? {
        println!("{}: {}", message.role, message.content);
    }
    println!("Type a message, /clear to start over, /quit to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => {}
            "/quit" | "/exit" => break,
            "/clear" => {
                pipeline.clear().await?;
                println!("(conversation cleared)");
            }
            text => match pipeline.submit(text).await {
                Ok(reply) => println!("assistant: {reply}"),
                Err(e) => {
                    tracing::debug!(error = %e, "chat request failed");
                    println!("assistant: {}", e.user_message());
                }
            },
        }
    }

    pipeline.flush().await;
    Ok(())
}

fn print_resources(country: &str) {
    let code = country.trim().to_ascii_uppercase();
    println!("Emergency resources ({code}):");
    for resource in emergency_resources(&code) {
        println!();
        println!("  {}", resource.name);
        if let Some(phone) = resource.phone {
            println!("    Phone: {phone}");
        }
        if let Some(url) = resource.url {
            println!("    Web:   {url}");
        }
        println!("    {}", resource.description);
    }
}
