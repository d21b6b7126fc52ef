use squidbot_llm::ProviderError;

/// Renders a provider error as the human-readable assistant reply the user
/// sees, distinguishing authentication, rate-limit, context-length, and
/// network failures.
pub fn format_llm_error(err: &ProviderError) -> String {
    match err {
        ProviderError::AuthFailed { model, .. } => format!(
            "I couldn't authenticate with the language model provider ({model}). Please check the configured API key."
        ),
        ProviderError::RateLimited { retry_after_ms } => format!(
            "The language model provider is rate-limiting requests right now. Please try again in about {} seconds.",
            (retry_after_ms / 1000).max(1)
        ),
        ProviderError::Api { status, message } if is_context_length_error(message) => {
            let _ = status;
            "This conversation has grown too long for the model's context window. Try starting a new session or asking me to summarize.".to_string()
        }
        ProviderError::Api { status, message } => {
            format!("The language model provider returned an error (status {status}): {message}")
        }
        ProviderError::Http(_) | ProviderError::Parse(_) => {
            "I hit a network error talking to the language model provider. Please try again.".to_string()
        }
        ProviderError::Unavailable(message) => {
            format!("The language model provider is temporarily unavailable: {message}")
        }
        ProviderError::Cancelled => "The request was cancelled.".to_string(),
    }
}

fn is_context_length_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("context length") || lower.contains("context_length") || lower.contains("too many tokens")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failure_mentions_api_key() {
        let msg = format_llm_error(&ProviderError::AuthFailed { model: "gpt".into(), message: "bad key".into() });
        assert!(msg.contains("API key"));
    }

    #[test]
    fn context_length_error_is_recognized_from_message_text() {
        let msg = format_llm_error(&ProviderError::Api { status: 400, message: "maximum context length exceeded".into() });
        assert!(msg.contains("context window"));
    }

    #[test]
    fn rate_limit_mentions_retry_seconds() {
        let msg = format_llm_error(&ProviderError::RateLimited { retry_after_ms: 5000 });
        assert!(msg.contains('5'));
    }
}
