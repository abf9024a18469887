use std::env;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use filetext::handlers::{
    add_handler, clear_handler, copy_handler, list_handler, remove_handler, Cli, Command,
    ConsoleObserver,
};
use filetext::services::FileSessionStore;
use filetext::{Config, ExtractionPipeline};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout carries the extracted text.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "filetext=info".into());
    let json = env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    let command = Cli::parse().into_command();
    let config = Config::from_env()?;

    tracing::info!("Max file size: {} bytes", config.max_file_size_bytes);
    tracing::info!("Session snapshot: {}", config.session_file().display());

    let store = Arc::new(FileSessionStore::new(config.session_dir.clone()));
    let mut pipeline = ExtractionPipeline::new(&config).with_session_store(store);
    pipeline.subscribe(Arc::new(ConsoleObserver));
    pipeline.restore();

    match command {
        Command::Add { paths } => {
            add_handler(&mut pipeline, &paths).await?;
            println!("{}", list_handler(&pipeline));
        }
        Command::List => println!("{}", list_handler(&pipeline)),
        Command::Copy { name } => println!("{}", copy_handler(&pipeline, name.as_deref())?),
        Command::Remove { name } => remove_handler(&mut pipeline, &name)?,
        Command::Clear => clear_handler(&mut pipeline),
    }

    Ok(())
}
