use anyhow::{Context, Result};
use reqwest::Client;
use std::io::Cursor;
use tracing::{info, warn};

/// Fetches the page at `url` and returns its main readable text.
pub async fn scrape_article_content(client: &Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await.context("failed to fetch article page")?;

    let status = response.status();
    if !status.is_success() {
        return Err(anyhow::anyhow!("article fetch failed with status: {}", status));
    }

    // The final URL after redirects is the one relative links resolve against
    let page_url = response.url().clone();

    // Readability requires a Reader, so we fetch bytes
    let bytes = response.bytes().await.context("failed to read response body")?;
    extract_readable_text(&bytes, &page_url)
}

/// Extract the main content block of an HTML page as plain text.
pub fn extract_readable_text(html: &[u8], page_url: &url::Url) -> Result<String> {
    let mut reader = Cursor::new(html);
    let product = readability::extractor::extract(&mut reader, page_url)
        .map_err(|e| anyhow::anyhow!("readability failed for {}: {}", page_url, e))?;

    let text = match html2text::from_read(product.content.as_bytes(), 120) {
        Ok(text) => text,
        Err(e) => {
            warn!("scraping: failed to convert extracted HTML to text: {}", e);
            product.text
        }
    };

    let text = text.trim().to_string();
    info!("scraping: extracted {} chars from {}", text.chars().count(), page_url);
    Ok(text)
}
