//! Building the message posted for a mirror.

use tracing::warn;

use crate::bridge::links::AttachmentSummary;
use crate::bridge::persona::Persona;
use crate::bridge::transport::Transport;
use crate::common::messages::{InboundAttachment, MirrorEmbed, OutgoingFile, OutgoingMessage};
use crate::common::types::MessageId;

/// Longest title a preview block can carry.
pub const MAX_TITLE_CHARS: usize = 256;
/// Longest plain-text body before it gets cut.
pub const MAX_BODY_CHARS: usize = 1900;
const BODY_CUT_CHARS: usize = 1870;
const TRUNCATION_MARKER: &str = "\n...(truncated)";

const EMPTY_MESSAGE: &str = "(empty message)";
pub const PERSONA_FAILED_NOTE: &str = "(persona generation failed)";

/// Attachments downloaded once per inbound message and reused for every mirror.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparedAttachments {
    pub files: Vec<OutgoingFile>,
    pub summary: AttachmentSummary,
}

fn attachment_label(content_type: Option<&str>) -> &'static str {
    let content_type = content_type.unwrap_or_default().to_lowercase();
    if content_type.starts_with("image") {
        "(image)"
    } else if content_type.starts_with("video") {
        "(video)"
    } else if content_type.starts_with("audio") {
        "(audio)"
    } else {
        "(file)"
    }
}

/// Download every attachment. The first image becomes the preview image, the
/// rest are listed as notes; failed downloads leave an "unavailable" note.
pub async fn collect_attachments<T>(transport: &T, attachments: &[InboundAttachment]) -> PreparedAttachments
where
    T: Transport + ?Sized,
{
    let mut prepared = PreparedAttachments::default();

    for attachment in attachments {
        let label = attachment_label(attachment.content_type.as_deref());

        let data = match transport.download_attachment(attachment).await {
            Ok(data) => data,
            Err(e) => {
                warn!(filename = %attachment.filename, "Failed to copy attachment: {}", e);
                prepared
                    .summary
                    .notes
                    .push(format!("(attachment unavailable: {})", attachment.filename));
                continue;
            }
        };
        prepared.files.push(OutgoingFile {
            filename: attachment.filename.clone(),
            data,
        });

        if prepared.summary.image_filename.is_none() && label == "(image)" {
            prepared.summary.image_filename = Some(attachment.filename.clone());
        } else {
            prepared
                .summary
                .notes
                .push(format!("{} {}", label, attachment.url));
        }
    }

    prepared
}

/// Link to a message in the Discord client.
pub fn jump_url(guild_id: u64, channel_id: u64, message_id: MessageId) -> String {
    format!(
        "https://discord.com/channels/{}/{}/{}",
        guild_id, channel_id, message_id
    )
}

pub fn reply_annotation(url: &str) -> String {
    format!("▶ Reply to {}", url)
}

pub fn sticker_annotation(name: &str) -> String {
    format!("(sticker: {})", name)
}

/// Cut `text` to at most `max` characters, keeping `cut` characters plus the marker.
pub fn truncate_chars(text: &str, max: usize, cut: usize, marker: &str) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(cut).collect();
    truncated.push_str(marker);
    truncated
}

/// Render a mirror of `content` posted as `persona`.
///
/// Short messages become a preview block; a quote too long for a block title
/// falls back to plain text. Annotations are rendered one per line.
pub fn render_mirror(
    content: &str,
    persona: &Persona,
    annotations: &[String],
    attachments: &PreparedAttachments,
) -> OutgoingMessage {
    let title = if content.is_empty() {
        format!("> {}", EMPTY_MESSAGE)
    } else {
        format!("> {}", content)
    };
    let description = annotations
        .iter()
        .filter(|line| !line.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");
    let description = description.trim();

    if title.chars().count() <= MAX_TITLE_CHARS {
        return OutgoingMessage {
            embed: Some(MirrorEmbed {
                title,
                description: (!description.is_empty()).then(|| description.to_string()),
                author_name: persona.display_name.clone(),
                author_icon_url: persona.avatar_url.clone(),
                image_filename: attachments.summary.image_filename.clone(),
            }),
            content: None,
            files: attachments.files.clone(),
        };
    }

    let mut body = title;
    if !description.is_empty() {
        body.push('\n');
        body.push_str(description);
    }
    let body = truncate_chars(&body, MAX_BODY_CHARS, BODY_CUT_CHARS, TRUNCATION_MARKER);

    OutgoingMessage {
        embed: None,
        content: Some(format!("{}\n{}", persona.display_name, body)),
        files: attachments.files.clone(),
    }
}
