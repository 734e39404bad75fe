//! Email HTML from a stored template.

use crate::model::{EmailRecord, BODY_PLACEHOLDER};
use tracing::debug;

/// Replace the first `[[BODY]]` in `template` with `body`.
///
/// Later occurrences are left as they are. A template without the
/// placeholder is returned unchanged.
pub fn render_template(template: &str, body: &str) -> String {
    if !template.contains(BODY_PLACEHOLDER) {
        debug!("Template has no {} placeholder", BODY_PLACEHOLDER);
    }
    template.replacen(BODY_PLACEHOLDER, body, 1)
}

/// HTML for a stored email.
pub fn email_html(email: &EmailRecord) -> String {
    render_template(&email.template, &email.body)
}
