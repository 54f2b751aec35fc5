use anyhow::Result;
use clap::Parser;
use prompt_eval_cli::cli;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    // Headless modes log through tracing; the TUI keeps the terminal to itself.
    if args.json || args.text {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(
                tracing_subscriber::EnvFilter::builder()
                    .with_env_var("LOG")
                    .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                    .from_env()?,
            )
            .init();
    }

    cli::run(args).await
}
