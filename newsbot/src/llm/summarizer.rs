// Summarizer module
use common::SummarizerConfig;
use tracing::{info, warn};

use super::{ChatMessage, LlmProvider, LlmRequest};

/// Returned when there is not enough text to summarize
pub const CONTENT_UNAVAILABLE: &str = "요약할 본문이 없습니다.";

const SUMMARY_INSTRUCTION: &str = "너는 뉴스 기사를 3줄로 핵심만 요약하는 AI다.";

/// Summarize article text in three lines, falling back to the text's own first lines.
///
/// Always returns non-empty text; provider failures are logged and never propagated.
pub async fn summarize_article<P: LlmProvider + ?Sized>(
    provider: &P,
    article_text: &str,
    config: &SummarizerConfig,
) -> String {
    let text = article_text.trim();
    if text.chars().count() < config.min_chars.max(1) {
        return CONTENT_UNAVAILABLE.to_string();
    }

    let input = truncate_chars(text, config.max_input_chars);

    let request = LlmRequest::new(
        vec![
            ChatMessage::system(SUMMARY_INSTRUCTION),
            ChatMessage::user(input),
        ],
        config.max_tokens,
    );

    match provider.generate(request).await {
        Ok(response) if !response.content.trim().is_empty() => {
            info!(
                "LLM summarization successful: {} chars, {} tokens",
                response.content.chars().count(),
                response.usage.total_tokens
            );
            response.content.trim().to_string()
        }
        Ok(_) => {
            warn!("LLM returned an empty summary, falling back to leading lines");
            leading_lines(input)
        }
        Err(e) => {
            warn!("LLM summarization failed: {}, falling back to leading lines", e);
            leading_lines(input)
        }
    }
}

/// Fallback summary: the first three non-empty lines, verbatim
fn leading_lines(text: &str) -> String {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(3)
        .collect();

    if lines.is_empty() {
        CONTENT_UNAVAILABLE.to_string()
    } else {
        lines.join("\n")
    }
}

/// Cut `s` to at most `max_chars` characters without splitting a code point
fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
