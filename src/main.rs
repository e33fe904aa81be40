use anyhow::Result;
use clap::Parser;
use std::io::{self, Write};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use video_summarizer::{cli, utils, Cli, Config, SummaryPipeline};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "video_summarizer=debug"
    } else {
        "video_summarizer=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.quiet {
        config.app.show_progress = false;
    }

    if cli.show_config {
        config.display();
        return Ok(());
    }

    // Check for required external dependencies (non-fatal)
    let missing_deps = utils::check_dependencies(&config.captions.yt_dlp_path).await;
    if !missing_deps.is_empty() {
        eprintln!("⚠️  Dependency check warnings:");
        for dep in missing_deps {
            eprintln!("   • {}", dep);
        }
        eprintln!("   (Continuing anyway - tools may be available)");
    }

    let pipeline = SummaryPipeline::from_config(&config);

    if let Some(url) = cli.url {
        let mut stdout = io::stdout();
        let Some(summarized) =
            cli::interruptible(cli::handle_url(&pipeline, &url, &mut stdout), ctrl_c()).await
        else {
            println!("\nGoodbye!");
            return Ok(());
        };
        stdout.flush()?;
        if !summarized? {
            anyhow::bail!("No summary produced for {}", url);
        }
        return Ok(());
    }

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = io::stdout();
    match cli::interruptible(cli::run_prompt(&pipeline, stdin, &mut stdout), ctrl_c()).await {
        Some(result) => result?,
        None => {
            println!("\nGoodbye!");
            // The stdin reader thread is still blocked and would hold up runtime shutdown
            std::process::exit(0);
        }
    }

    Ok(())
}

/// Resolves on Ctrl-C, or never if the handler cannot be installed
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Unable to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
