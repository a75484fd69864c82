// src/utils/html.rs

use ammonia;

/// Sanitizes teacher-supplied rich text (content descriptions) before it is
/// stored. Whitelist-based: harmless formatting tags survive, scripts and
/// event-handler attributes do not, so a stored description can never carry
/// XSS into the student-facing pages.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
