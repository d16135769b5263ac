//! Command recognition: message text + media metadata -> [`Command`].

use crate::{config::BotSettings, domain::MediaKind};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    CreateSticker { name: String },
    /// `name` may be empty; the dispatcher rejects that as a format error.
    RenameSticker { name: String },
    TagAll { custom_message: Option<String> },
    Help,
    None,
}

/// Classify a message body. First matching rule wins.
///
/// `has_quoted_message` is accepted for completeness; whether the quoted
/// message is a sticker is only known after it has been fetched.
pub fn recognize(
    settings: &BotSettings,
    body: &str,
    has_media: bool,
    media_kind: MediaKind,
    _has_quoted_message: bool,
) -> Command {
    let text = body.trim();

    if has_media && media_kind == MediaKind::Image {
        if let Some(rest) = strip_keyword(text, &settings.sticker_command) {
            let name = rest.trim();
            let name = if name.is_empty() {
                settings.default_sticker_name.clone()
            } else {
                name.to_string()
            };
            return Command::CreateSticker { name };
        }
    }

    if let Some(rest) = strip_keyword(text, &settings.watermark_command) {
        return Command::RenameSticker {
            name: rest.trim().to_string(),
        };
    }

    if let Some(rest) = strip_keyword(text, &settings.tagall_command) {
        let msg = rest.trim();
        return Command::TagAll {
            custom_message: (!msg.is_empty()).then(|| msg.to_string()),
        };
    }

    if settings.help_aliases.iter().any(|alias| alias == text) {
        return Command::Help;
    }

    Command::None
}

/// Case-insensitive prefix match on the keyword only; the rest keeps its case.
fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let head = text.get(..keyword.len())?;
    if head.eq_ignore_ascii_case(keyword) {
        Some(&text[keyword.len()..])
    } else {
        None
    }
}
