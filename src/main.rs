use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use picturebot::config::{Cli, Command, Config};
use picturebot::db::{self, models::ExampleSeed, SqliteBotStore};
use picturebot::generation::OpenAiImageClient;
use picturebot::line::LineReplyClient;
use picturebot::pipeline::{Collaborators, Pipeline};
use picturebot::state::{AppState, DbPool};
use picturebot::{routes, translation};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    match cli.command.clone().unwrap_or(Command::Serve) {
        Command::ImportExamples { path } => {
            let seed = ExampleSeed::from_file(&path)?;
            db::import_examples(&pool, &seed)?;
            Ok(())
        }
        Command::Serve => serve(config, pool).await,
    }
}

async fn serve(config: Config, pool: DbPool) -> anyhow::Result<()> {
    config.validate()?;

    let collaborators = Collaborators {
        store: Arc::new(SqliteBotStore::new(pool.clone())),
        generator: Arc::new(OpenAiImageClient::new(
            config.generation.url.clone(),
            config.generation.api_key.clone(),
        )),
        translator: translation::from_config(&config.translation),
        sender: Arc::new(LineReplyClient::new(
            config.line.reply_url.clone(),
            config.line.access_token.clone(),
        )),
    };
    let pipeline = Pipeline::new(&config, collaborators);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let state = AppState {
        db: pool,
        config: Arc::new(config),
        pipeline: Arc::new(pipeline),
    };
    let app = routes::router(state);

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
