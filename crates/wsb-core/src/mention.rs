use crate::domain::Participant;

pub const DEFAULT_TAGALL_HEADER: &str = "📢 Tag All!";

/// A mention-annotated broadcast: visible text plus ids the transport notifies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mentions {
    pub text: String,
    pub mention_ids: Vec<String>,
}

/// Build the tag-all message for `roster`.
///
/// The participant whose id equals `invoker` (the message author) is skipped.
/// The bot's own account is not filtered separately.
pub fn compose(
    roster: &[Participant],
    invoker: Option<&str>,
    custom_message: Option<&str>,
) -> Mentions {
    let mut mention_text = String::new();
    let mut mention_ids = Vec::with_capacity(roster.len());

    for p in roster {
        if invoker == Some(p.id.as_str()) {
            continue;
        }
        mention_text.push('@');
        mention_text.push_str(&p.user);
        mention_text.push(' ');
        mention_ids.push(p.id.clone());
    }

    let header = match custom_message.map(str::trim) {
        Some(m) if !m.is_empty() => m,
        _ => DEFAULT_TAGALL_HEADER,
    };

    Mentions {
        text: format!("{header}\n\n{mention_text}"),
        mention_ids,
    }
}
