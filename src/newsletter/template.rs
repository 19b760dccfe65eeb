use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::subscriber::Subscriber;

const FALLBACK_NAME: &str = "Friend";

static STYLE_BLOCKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").unwrap());
static SCRIPT_BLOCKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").unwrap());
static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static WHITESPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// The per-recipient fields a template can reference.
#[derive(Debug, Clone, Copy)]
pub struct RecipientFields<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
}

impl<'a> From<&'a Subscriber> for RecipientFields<'a> {
    fn from(subscriber: &'a Subscriber) -> Self {
        RecipientFields {
            first_name: subscriber.first_name.as_ref(),
            last_name: subscriber.last_name.as_ref(),
            email: subscriber.email.as_ref(),
        }
    }
}

/// Substitutes `{{firstName}}`, `{{lastName}}`, `{{email}}` and `{{fullName}}`
/// placeholders. A missing first name becomes "Friend"; `{{fullName}}` is the
/// trimmed concatenation of both names, also "Friend" when there is nothing
/// to show.
pub fn render(content: &str, recipient: RecipientFields<'_>) -> String {
    let first_name = recipient.first_name.trim();
    let last_name = recipient.last_name.trim();

    let greeting_name = if first_name.is_empty() {
        FALLBACK_NAME
    } else {
        first_name
    };

    let full_name = format!("{} {}", first_name, last_name);
    let full_name = full_name.trim();
    let full_name = if full_name.is_empty() {
        FALLBACK_NAME
    } else {
        full_name
    };

    content
        .replace("{{firstName}}", greeting_name)
        .replace("{{lastName}}", last_name)
        .replace("{{email}}", recipient.email)
        .replace("{{fullName}}", full_name)
}

/// Best-effort plain-text rendition of an HTML email body, used when no
/// explicit text part is provided. Style and script blocks go first so their
/// contents never leak into the text, then the remaining tags, then
/// whitespace runs collapse to single spaces. Regex-based, not a parser;
/// malformed markup passes through best-effort.
pub fn strip_html(html: &str) -> String {
    let without_styles = STYLE_BLOCKS.replace_all(html, "");
    let without_scripts = SCRIPT_BLOCKS.replace_all(&without_styles, "");
    let without_tags = TAGS.replace_all(&without_scripts, " ");
    let collapsed = WHITESPACE_RUNS.replace_all(&without_tags, " ");

    collapsed.trim().to_string()
}
