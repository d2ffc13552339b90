//! Fixed fragments written into a mount point around converter output.

use ammonia::clean_text;

const UNKNOWN_ERROR: &str = "Unknown error";

pub(crate) fn loading_panel(text: &str) -> String {
    format!("<div class=\"loading\">{}</div>", clean_text(text))
}

pub(crate) fn empty_placeholder(text: &str) -> String {
    format!("<p class=\"empty\">{}</p>", clean_text(text))
}

pub(crate) fn error_panel(label: &str, message: &str) -> String {
    let message = if message.trim().is_empty() {
        UNKNOWN_ERROR
    } else {
        message
    };
    format!(
        "<div class=\"error\"><strong>{}</strong> {}</div>",
        clean_text(label),
        clean_text(message)
    )
}
