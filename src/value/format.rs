//! `${path}` substitution in label/text templates.
//!
//! Tokens of the form `${some/path}` are replaced with the current value
//! of the dataref at that path. Tokens carrying a consumer-local prefix
//! (`state:`) or an icon-font namespace (`fa:`, `wi:`) are left for the
//! rendering layer to resolve.

use log::warn;

use super::registry::DatarefRegistry;

/// Prefixes whose tokens are not datarefs and must survive substitution.
pub const SKIP_PREFIXES: &[&str] = &["state:", "fa:", "wi:"];

/// Replace every `${path}` token in `text` with the dataref's current
/// value. Unknown or empty datarefs substitute the empty string with a
/// warning; malformed tokens (unterminated brace) pass through verbatim.
pub fn substitute_values(text: &str, registry: &DatarefRegistry) -> String {
    if !text.contains('$') {
        return text.to_owned();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            // Unterminated token: keep the tail as-is.
            out.push_str(&rest[start..]);
            return out;
        };
        let token = &after[..end];
        if SKIP_PREFIXES.iter().any(|p| token.starts_with(p)) {
            out.push_str(&rest[start..start + 2 + end + 1]);
        } else {
            match registry.get(token).and_then(|d| d.value()) {
                Some(value) => out.push_str(&value.to_string()),
                None => {
                    warn!("substitute: {token} has no value");
                }
            }
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}
