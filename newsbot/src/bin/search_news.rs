use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use common::Config;
use newsbot::aggregator::NewsAggregator;
use newsbot::ingestion::HttpFeedFetcher;

/// Run the news pipeline for one query and print the page, without any LLM calls.
#[derive(Parser, Debug)]
#[command(name = "search_news")]
struct Args {
    /// Search topic, e.g. "AI 반도체"
    query: String,

    #[arg(long, default_value_t = 0)]
    offset: usize,

    /// Defaults to news.page_size from the configuration
    #[arg(long)]
    page_size: Option<usize>,

    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let config = Config::load_with_defaults(
        Some(PathBuf::from("config.default.toml").as_path()),
        args.config.as_deref(),
    )
    .await?;

    let page_size = args.page_size.unwrap_or(config.news.page_size);
    let fetcher = HttpFeedFetcher::new(config.news.fetch_timeout_seconds)?;
    let aggregator = NewsAggregator::new(Arc::new(fetcher), config.news.clone());
    let tz = aggregator.timezone();

    println!("\n{}", "=".repeat(60));
    println!("Query: {} (offset {}, page size {})", args.query, args.offset, page_size);
    for source in &config.news.sources {
        println!("  source {}: {}", source.name, source.url_template);
    }
    println!("{}", "=".repeat(60));

    let articles = aggregator.search(&args.query, args.offset, page_size).await;
    if articles.is_empty() {
        println!("✗ No results");
        return Ok(());
    }

    for (i, article) in articles.iter().enumerate() {
        let date = article
            .published_at
            .map(|d| d.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "undated".to_string());
        println!("{}. [{}] {}", args.offset + i + 1, date, article.title);
        println!("   URL: {}", article.link);
        println!("   Text: {} chars", article.summary_text.chars().count());
    }

    Ok(())
}
