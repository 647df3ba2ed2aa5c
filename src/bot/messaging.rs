//! Sending helpers for Telegram replies.

use crate::utils::{split_message, truncate_str};
use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::ChatId;

/// Maximum message length with a safety margin below Telegram's 4096 limit.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4000;

/// Telegram photo captions are limited to 1024 characters; keep a margin.
pub const TELEGRAM_CAPTION_LIMIT: usize = 1000;

/// Sends a long plain-text reply, splitting it into multiple messages when
/// it exceeds the Telegram message budget.
///
/// # Errors
///
/// Returns an error if any part fails to send.
pub async fn send_long_message(bot: &Bot, chat_id: ChatId, text: &str) -> Result<()> {
    for part in split_message(text, TELEGRAM_MESSAGE_LIMIT) {
        bot.send_message(chat_id, part).await?;
    }
    Ok(())
}

/// Truncates HTML caption text without producing markup Telegram rejects.
///
/// A plain character cut can land inside an entity (`&amp;` → `&am`) or a
/// tag, or leave a `<b>` unclosed; any of those makes the whole send fail
/// under `ParseMode::Html`. After the cut, a dangling partial tag or entity
/// is dropped and unclosed `<b>` tags are closed. Captions here only use
/// `<b>` markup.
#[must_use]
pub fn truncate_caption_html(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out = truncate_str(text, max_chars);

    // Partially cut tag: a '<' with no closing '>' after it.
    if let Some(open) = out.rfind('<') {
        if !out[open..].contains('>') {
            out.truncate(open);
        }
    }
    // Partially cut entity: a '&' with no ';' after it.
    if let Some(amp) = out.rfind('&') {
        if !out[amp..].contains(';') {
            out.truncate(amp);
        }
    }

    let opens = out.matches("<b>").count();
    let closes = out.matches("</b>").count();
    for _ in closes..opens {
        out.push_str("</b>");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use html_escape::encode_text;

    #[test]
    fn test_truncate_caption_html_short_passthrough() {
        let text = "<b>Title</b> &amp; more";
        assert_eq!(truncate_caption_html(text, 100), text);
    }

    #[test]
    fn test_truncate_caption_html_never_splits_entity() {
        // An escaped '&' that lands exactly on the cut boundary must not
        // survive as a dangling "&am".
        let raw = format!("{}&", "x".repeat(997));
        let escaped = encode_text(&raw).to_string();
        assert_eq!(escaped.chars().count(), 1002);

        let caption = truncate_caption_html(&escaped, 1000);
        assert!(!caption.ends_with("&am"));
        assert!(!caption.contains('&'));
        assert_eq!(caption, "x".repeat(997));
    }

    #[test]
    fn test_truncate_caption_html_drops_partial_tag() {
        let text = format!("{}<b>bold</b>", "y".repeat(998));
        let caption = truncate_caption_html(&text, 1000);
        assert_eq!(caption, "y".repeat(998));
    }

    #[test]
    fn test_truncate_caption_html_closes_open_bold() {
        let text = format!("<b>{}</b>", "z".repeat(2000));
        let caption = truncate_caption_html(&text, 1000);
        assert!(caption.starts_with("<b>"));
        assert!(caption.ends_with("</b>"));
        assert_eq!(
            caption.matches("<b>").count(),
            caption.matches("</b>").count()
        );
    }
}
