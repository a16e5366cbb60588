//! Telegram client using teloxide.

use teloxide::prelude::*;
use teloxide::types::MessageId;
use tracing::{info, warn};

/// Telegram measures message length in UTF-16 code units.
const MAX_MESSAGE_UTF16: usize = 4096;

/// Telegram API client.
#[derive(Clone)]
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Send plain text. Returns the new message ID.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64, String> {
        self.bot
            .send_message(ChatId(chat_id), fit_message(text))
            .await
            .map(|msg| msg.id.0 as i64)
            .map_err(|e| {
                let msg = format!("Failed to send: {e}");
                warn!("{}", msg);
                msg
            })
    }

    /// Replace the text of a message the bot sent earlier.
    pub async fn edit_message(&self, chat_id: i64, message_id: i64, text: &str) -> Result<(), String> {
        self.bot
            .edit_message_text(ChatId(chat_id), MessageId(message_id as i32), fit_message(text))
            .await
            .map(|_| ())
            .map_err(|e| {
                let msg = format!("Failed to edit message: {e}");
                warn!("{}", msg);
                msg
            })
    }

    /// Show a placeholder, then swap it for the final reply.
    ///
    /// Falls back to a fresh message when the placeholder could not be sent
    /// or edited.
    pub async fn reply_after<F>(&self, chat_id: i64, placeholder: &str, reply: F) -> Result<(), String>
    where
        F: std::future::Future<Output = String>,
    {
        let working_id = self.send_message(chat_id, placeholder).await.ok();
        let text = reply.await;

        if let Some(message_id) = working_id {
            if self.edit_message(chat_id, message_id, &text).await.is_ok() {
                return Ok(());
            }
            info!("Edit failed, sending reply as a new message");
        }

        self.send_message(chat_id, &text).await.map(|_| ())
    }
}

fn fit_message(text: &str) -> String {
    if text.encode_utf16().count() <= MAX_MESSAGE_UTF16 {
        return text.to_string();
    }

    let budget = MAX_MESSAGE_UTF16 - 3;
    let mut used = 0;
    let mut truncated = String::new();
    for c in text.chars() {
        used += c.len_utf16();
        if used > budget {
            break;
        }
        truncated.push(c);
    }
    format!("{}...", truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_message_untouched() {
        assert_eq!(fit_message("hello"), "hello");
    }

    #[test]
    fn test_long_message_truncated() {
        let long = "é".repeat(5000);
        let fitted = fit_message(&long);
        assert_eq!(fitted.encode_utf16().count(), MAX_MESSAGE_UTF16);
        assert!(fitted.ends_with("..."));
    }

    #[test]
    fn test_astral_chars_count_as_two_units() {
        // 3000 chars, 6000 UTF-16 units.
        let long = "😀".repeat(3000);
        let fitted = fit_message(&long);
        assert!(fitted.encode_utf16().count() <= MAX_MESSAGE_UTF16);
        assert_eq!(fitted.chars().filter(|&c| c == '😀').count(), 2046);
        assert!(fitted.ends_with("..."));
    }

    #[test]
    fn test_exact_limit_untouched() {
        let text = "😀".repeat(MAX_MESSAGE_UTF16 / 2);
        assert_eq!(fit_message(&text), text);
    }
}
