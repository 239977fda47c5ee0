use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::WrapErr;
use scentquiz::{
    ai::{AiConfig, DashscopeClient},
    db::Db,
    models::Seed,
    names,
    services::preference::ScoringStrategy,
    AppState,
};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// SQLite database url.
    #[arg(long, env, default_value = "sqlite:scentquiz.db")]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API.
    Serve(ServeArgs),

    /// Load question groups and fragrance categories from a JSON file.
    Seed { file: PathBuf },

    /// Create a user if needed and print a new session token for it.
    IssueToken {
        username: String,

        #[arg(long)]
        admin: bool,
    },
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    /// The address to bind to.
    #[arg(short, long, env, default_value = "127.0.0.1:1414")]
    address: String,

    /// How preferences are derived after stage 3.
    #[arg(long, env, value_enum, default_value_t = ScoringStrategy::Keyword)]
    scoring: ScoringStrategy,

    /// Credential for the AI service.
    #[arg(long, env = "DASHSCOPE_API_KEY", hide_env_values = true)]
    dashscope_api_key: Option<String>,

    /// Application used for fragrance classification.
    #[arg(long, env = "DASHSCOPE_APP_ID")]
    dashscope_app_id: Option<String>,

    #[arg(long, env, default_value = names::DEFAULT_AI_BASE_URL)]
    ai_base_url: String,

    #[arg(long, env, default_value = names::DEFAULT_AI_MODEL)]
    ai_model: String,

    #[arg(long, env, default_value_t = names::DEFAULT_AI_TIMEOUT_SECS)]
    ai_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "tracing=info,scentquiz=debug,tower_http=info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .init();

    let args = Args::parse();
    let db = Db::new(&args.database_url).await?;

    match args.command {
        Command::Seed { file } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .wrap_err_with(|| format!("could not read {}", file.display()))?;
            let seed: Seed = serde_json::from_str(&raw)
                .wrap_err_with(|| format!("could not parse {}", file.display()))?;
            db.load_seed(&seed).await?;
        }
        Command::IssueToken { username, admin } => {
            let user = db.ensure_user(&username, admin).await?;
            let token = db.create_user_session(user.id).await?;
            println!("{token}");
        }
        Command::Serve(serve) => serve_api(db, serve).await?,
    }

    Ok(())
}

async fn serve_api(db: Db, args: ServeArgs) -> color_eyre::Result<()> {
    let ai = DashscopeClient::new(AiConfig {
        api_key: args.dashscope_api_key.filter(|k| !k.is_empty()),
        app_id: args.dashscope_app_id.filter(|id| !id.is_empty()),
        base_url: args.ai_base_url,
        model: args.ai_model,
        timeout: Duration::from_secs(args.ai_timeout_secs),
    })?;

    let state = AppState::new(db, ai, args.scoring).await?;
    let app = scentquiz::router(state);

    let address = args.address.parse::<std::net::SocketAddr>()?;
    let listener = tokio::net::TcpListener::bind(address).await?;
    tracing::info!("listening on {address}");
    axum::serve(listener, app).await?;

    Ok(())
}
