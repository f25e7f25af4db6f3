//! User-facing message catalog.
//!
//! Messages are keyed by a short identifier and loaded once from the bundled
//! `en_us.json`. Unknown keys fall back to the key itself so a missing entry
//! never turns into a failed request.

use std::collections::HashMap;

use once_cell::sync::Lazy;

static EN_US: &str = include_str!("../messages/en_us.json");

static CATALOG: Lazy<HashMap<String, String>> = Lazy::new(|| {
    serde_json::from_str(EN_US).unwrap_or_else(|e| {
        tracing::error!(error = %e, "message catalog is not valid JSON");
        HashMap::new()
    })
});

/// Look up a message by key.
pub fn text(key: &str) -> &str {
    CATALOG.get(key).map(String::as_str).unwrap_or(key)
}

/// Look up a message and substitute the first `{}` placeholder with `arg`.
pub fn format(key: &str, arg: impl std::fmt::Display) -> String {
    text(key).replacen("{}", &arg.to_string(), 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_parses() {
        assert!(!CATALOG.is_empty());
        assert_eq!(text("cart_not_found"), "Cart not found.");
    }

    #[test]
    fn unknown_key_falls_back_to_key() {
        assert_eq!(text("no_such_message"), "no_such_message");
    }

    #[test]
    fn format_substitutes_placeholder() {
        assert_eq!(format("user_active_sessions", 3), "Active sessions: 3.");
    }
}
