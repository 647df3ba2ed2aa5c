//! Text formatting, sanitation, and truncation helpers for Telegram replies.

use anyhow::Result;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::warn;

/// Formats large counts with K/M/B suffixes.
///
/// # Examples
///
/// ```
/// use omnibot::utils::format_count;
/// assert_eq!(format_count(950), "950");
/// assert_eq!(format_count(1_500), "1.5K");
/// ```
#[must_use]
pub fn format_count(n: u64) -> String {
    #[allow(clippy::cast_precision_loss)]
    let f = n as f64;
    if n >= 1_000_000_000 {
        format!("{:.1}B", f / 1e9)
    } else if n >= 1_000_000 {
        format!("{:.1}M", f / 1e6)
    } else if n >= 1_000 {
        format!("{:.1}K", f / 1e3)
    } else {
        n.to_string()
    }
}

/// Formats currency amounts with a `$` prefix and K/M/B suffixes.
#[must_use]
pub fn format_currency(amount: u64) -> String {
    if amount >= 1_000 {
        format!("${}", format_count(amount))
    } else {
        format!("${amount}")
    }
}

/// Strips characters that could break Telegram's lightweight markup.
///
/// Analysis text comes back from upstream models with arbitrary Markdown;
/// rather than trying to repair it, the problematic characters are removed.
#[must_use]
pub fn sanitize_markup(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '*' | '_' | '[' | ']'))
        .collect()
}

/// Safely truncates a string to a maximum character length (not bytes).
///
/// This is UTF-8 safe and will not panic on multi-byte characters.
#[must_use]
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.char_indices()
        .nth(max_chars)
        .map_or_else(|| s.to_string(), |(pos, _)| s[..pos].to_string())
}

/// Hard-truncates to `max_chars` characters, appending an ellipsis marker
/// when anything was cut. Inputs within the budget pass through untouched.
#[must_use]
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out = truncate_str(s, max_chars);
    out.push_str("...");
    out
}

/// Uniform user-visible error template naming the failed service.
#[must_use]
pub fn format_error_message(service_name: &str, error: &str) -> String {
    format!(
        "❌ {service_name} Error\n\n\
         Sorry, I encountered an issue:\n\
         {error}\n\n\
         Please try again later or contact support if the problem persists."
    )
}

/// Splits a long message into parts that fit within `max_length` characters.
///
/// Splits on line boundaries where possible; a single line longer than the
/// limit is chunked at character boundaries.
#[must_use]
pub fn split_message(message: &str, max_length: usize) -> Vec<String> {
    if message.is_empty() {
        return Vec::new();
    }
    if message.chars().count() <= max_length {
        return vec![message.to_string()];
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    let flush = |current: &mut String, current_chars: &mut usize, parts: &mut Vec<String>| {
        if !current.is_empty() {
            parts.push(current.trim_end().to_string());
            current.clear();
            *current_chars = 0;
        }
    };

    for line in message.lines() {
        let line_chars = line.chars().count();

        if line_chars > max_length {
            flush(&mut current, &mut current_chars, &mut parts);
            let mut chunk = String::new();
            let mut chunk_chars = 0usize;
            for c in line.chars() {
                if chunk_chars == max_length {
                    parts.push(chunk.clone());
                    chunk.clear();
                    chunk_chars = 0;
                }
                chunk.push(c);
                chunk_chars += 1;
            }
            if !chunk.is_empty() {
                current.push_str(&chunk);
                current.push('\n');
                current_chars = chunk_chars + 1;
            }
            continue;
        }

        if current_chars + line_chars + 1 > max_length {
            flush(&mut current, &mut current_chars, &mut parts);
        }
        current.push_str(line);
        current.push('\n');
        current_chars += line_chars + 1;
    }

    flush(&mut current, &mut current_chars, &mut parts);
    parts
}

/// Retry a Telegram API file operation with exponential backoff.
///
/// Used for `get_file` + `download_file`, which may fail on transient
/// network errors. Upstream API calls are deliberately not retried.
///
/// # Errors
///
/// Returns the last error if all attempts fail.
pub async fn retry_telegram_operation<F, Fut, T>(operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    use crate::config::{
        TELEGRAM_API_INITIAL_BACKOFF_MS, TELEGRAM_API_MAX_BACKOFF_MS, TELEGRAM_API_MAX_RETRIES,
    };

    let retry_strategy = ExponentialBackoff::from_millis(TELEGRAM_API_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
        .map(jitter)
        .take(TELEGRAM_API_MAX_RETRIES);

    Retry::spawn(retry_strategy, operation).await.map_err(|e| {
        warn!(
            "Telegram API operation failed after {} attempts: {}",
            TELEGRAM_API_MAX_RETRIES, e
        );
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count_thresholds() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(950), "950");
        assert_eq!(format_count(1_500), "1.5K");
        assert_eq!(format_count(2_300_000), "2.3M");
        assert_eq!(format_count(1_200_000_000), "1.2B");
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(500), "$500");
        assert_eq!(format_currency(63_000_000), "$63.0M");
        assert_eq!(format_currency(1_200_000_000), "$1.2B");
    }

    #[test]
    fn test_sanitize_markup_strips_markup_chars() {
        let input = "A *bold* claim with a [link] and _emphasis_";
        let cleaned = sanitize_markup(input);
        assert_eq!(cleaned, "A bold claim with a link and emphasis");
        assert!(!cleaned.contains('*'));
        assert!(!cleaned.contains('['));
        assert!(!cleaned.contains(']'));
        assert!(!cleaned.contains('_'));
    }

    #[test]
    fn test_truncate_str_unicode() {
        let s = "Привет, мир!";
        assert_eq!(truncate_str(s, 6), "Привет");
        assert_eq!(truncate_str(s, 50), "Привет, мир!");
    }

    #[test]
    fn test_truncate_with_ellipsis_budget() {
        let long = "a".repeat(5000);
        let clipped = truncate_with_ellipsis(&long, 3800);
        assert_eq!(clipped.chars().count(), 3803);
        assert!(clipped.ends_with("..."));

        let short = "b".repeat(3800);
        assert_eq!(truncate_with_ellipsis(&short, 3800), short);
    }

    #[test]
    fn test_split_message_short_passthrough() {
        let parts = split_message("hello\nworld", 100);
        assert_eq!(parts, vec!["hello\nworld"]);
    }

    #[test]
    fn test_split_message_line_boundaries() {
        let input = "Line 1\nLine 2\nLine 3";
        // "Line 1\n" is 7 chars; two lines exceed a budget of 13.
        let parts = split_message(input, 13);
        assert_eq!(parts, vec!["Line 1", "Line 2", "Line 3"]);
    }

    #[test]
    fn test_split_message_oversized_line() {
        let input = "x".repeat(9000);
        let parts = split_message(&input, 4000);
        assert!(parts.len() >= 3);
        for part in &parts {
            assert!(part.chars().count() <= 4000);
        }
        let total: usize = parts.iter().map(|p| p.chars().count()).sum();
        assert_eq!(total, 9000);
    }

    #[test]
    fn test_format_error_message_names_service() {
        let msg = format_error_message("YouTube Search", "API error: 403");
        assert!(msg.contains("YouTube Search Error"));
        assert!(msg.contains("API error: 403"));
    }
}
