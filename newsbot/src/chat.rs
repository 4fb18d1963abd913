use common::ChatConfig;
use tracing::{error, info};

use crate::conversation::ConversationLog;
use crate::llm::{ChatMessage, LlmProvider, LlmRequest};

const SYSTEM_INSTRUCTION: &str = "너는 일반적인 인공지능 챗봇이다.";

/// Build the prompt for a general chat reply: instruction, recent turns, new message.
pub fn build_messages(log: &ConversationLog, new_message: &str, config: &ChatConfig) -> Vec<ChatMessage> {
    let limit = (config.history_limit > 0).then_some(config.history_limit);
    let history = log.recent(limit);

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(SYSTEM_INSTRUCTION));
    messages.extend(history.iter().map(ChatMessage::from));
    messages.push(ChatMessage::user(new_message));
    messages
}

/// Context-aware reply. Failures become a displayable error string.
pub async fn respond<P: LlmProvider + ?Sized>(
    provider: &P,
    log: &ConversationLog,
    new_message: &str,
    config: &ChatConfig,
) -> String {
    let request = LlmRequest::new(build_messages(log, new_message, config), config.max_tokens);

    match provider.generate(request).await {
        Ok(response) => {
            info!(
                model = %response.model,
                tokens = response.usage.total_tokens,
                "chat reply generated"
            );
            response.content
        }
        Err(e) => {
            error!("chat completion failed: {:#}", e);
            error_reply(&e)
        }
    }
}

fn error_reply(e: &anyhow::Error) -> String {
    format!("⚠️ 응답 생성 중 오류가 발생했습니다: {:#}", e)
}
