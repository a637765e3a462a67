//! # linkchat CLI Application
//!
//! Command-line entry point for the chat backend.
//!
//! ## Subcommands
//!
//! - `serve`: run the HTTP server exposing `POST /api/chat`
//! - `ask`: run one message through the chat pipeline and print the reply
//! - `crawl`: crawl a URL and print what the pipeline would see
//!
//! Configuration comes from the environment (see `linkchat::config`); only
//! `serve` and `ask` need the completion API key.

mod telemetry;

use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use linkchat::config::Config;
use linkchat::crawler::{Crawler, CrawlerConfig, HttpRenderer};
use linkchat::model::{Client, GroqCompletionModel};
use linkchat::pipeline::ChatPipeline;
use linkchat::ratelimit::{InMemoryQuotaStore, QuotaStore, UpstashQuotaStore};
use linkchat::server::{self, AppState};
use tracing::{info, instrument, warn};

#[derive(Parser)]
#[command(author, version, about = "Chat backend that reads the pages your messages link to", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server
    Serve(ServeArgs),

    /// Answer a single message and exit
    Ask(AskArgs),

    /// Crawl a URL and print the extracted text
    Crawl(CrawlArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,
}

#[derive(Args, Debug)]
struct AskArgs {
    /// Message to send, URLs included
    #[arg(required = true)]
    message: String,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// URL to crawl
    #[arg(required = true)]
    url: String,

    /// Crawl depth
    #[arg(short, long, default_value = "2")]
    depth: u32,

    /// Links followed per page
    #[arg(short, long, default_value = "5")]
    max_links: usize,

    /// Render timeout in seconds
    #[arg(short, long, default_value = "60")]
    timeout: u64,

    /// Skip pages already visited during this crawl
    #[arg(long)]
    dedupe: bool,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _otel = telemetry::init_tracing_subscriber()?;

    match cli.command {
        Some(Commands::Serve(args)) => {
            serve_command(args).await?;
        }
        Some(Commands::Ask(args)) => {
            ask_command(args).await?;
        }
        Some(Commands::Crawl(args)) => {
            crawl_command(args).await?;
        }
        None => {
            // If no command is provided, show help
            let _ = Cli::parse_from(["--help"]);
        }
    }

    Ok(())
}

fn build_pipeline(config: &Config) -> anyhow::Result<ChatPipeline<GroqCompletionModel>> {
    let crawler_config = CrawlerConfig::default();
    let renderer = HttpRenderer::new(&crawler_config).context("failed to build page renderer")?;
    let crawler = Crawler::new(Arc::new(renderer), crawler_config);

    let client = Client::new_groq_from_config(config);
    Ok(ChatPipeline::new(crawler, client.completion().clone()))
}

fn build_quota_store(config: &Config) -> anyhow::Result<Arc<dyn QuotaStore>> {
    match &config.upstash {
        Some(upstash) => {
            info!(url = %upstash.url, "Using Upstash quota store");
            let store = UpstashQuotaStore::new(upstash, config.rate_limit)
                .context("failed to build Upstash quota store")?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("UPSTASH_REDIS_REST_URL not set, counting requests in memory");
            Ok(Arc::new(InMemoryQuotaStore::new(config.rate_limit)))
        }
    }
}

#[instrument]
async fn serve_command(args: ServeArgs) -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;

    let pipeline = build_pipeline(&config)?;
    let quota = build_quota_store(&config)?;
    let state = AppState::new(pipeline, quota, config.trust_forwarded_for);

    let address = format!("{}:{}", args.host, args.port);
    server::serve(&address, state)
        .await
        .with_context(|| format!("server on {} failed", address))?;

    Ok(())
}

#[instrument]
async fn ask_command(args: AskArgs) -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    let pipeline = build_pipeline(&config)?;

    let reply = pipeline.handle(&args.message).await?;

    match args.format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
        _ => {
            println!("{}", reply.response);
            if !reply.urls.is_empty() {
                println!();
                println!(
                    "Sources: {} ({} pages read, {} failed)",
                    reply.urls.join(", "),
                    reply.pages_crawled,
                    reply.pages_failed
                );
            }
        }
    }

    Ok(())
}

#[instrument]
async fn crawl_command(args: CrawlArgs) -> anyhow::Result<()> {
    let config = CrawlerConfig::builder()
        .render_timeout_secs(args.timeout)
        .dedupe_visits(args.dedupe)
        .build();

    let renderer = HttpRenderer::new(&config)?;
    let crawler = Crawler::new(Arc::new(renderer), config);

    let report = crawler.crawl(&args.url, args.depth, args.max_links).await;

    match args.format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            println!(
                "Crawled {} pages ({} failed)",
                report.pages_crawled(),
                report.pages_failed()
            );
            for outcome in &report.outcomes {
                println!();
                println!("[level {}] {}", outcome.level(), outcome.url());
                println!("{}", outcome.as_text());
            }
        }
    }

    Ok(())
}
