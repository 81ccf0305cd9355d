//! Environment variable expansion for configuration files

use regex::Regex;
use std::env;
use std::sync::OnceLock;

fn pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::([^}]*))?\}").ok())
        .as_ref()
}

/// Expand `${VAR}` and `${VAR:default}` references
///
/// Unset variables without a default expand to an empty string.
pub fn expand_env(content: &str) -> String {
    let Some(re) = pattern().filter(|_| content.contains("${")) else {
        return content.to_string();
    };

    re.replace_all(content, |caps: &regex::Captures<'_>| {
        let default_value = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        env::var(&caps[1]).unwrap_or_else(|_| default_value.to_string())
    })
    .into_owned()
}

/// Replace `target` with the value of `var` when it is set and non-empty
pub(crate) fn override_from_env(target: &mut String, var: &str) -> bool {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => {
            *target = value;
            true
        }
        _ => false,
    }
}
