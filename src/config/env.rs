//! Environment variable substitution for identifiers.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ConfigError;

static ENV_VAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));

/// Resolves `${VAR_NAME}` patterns in a string.
///
/// Every undefined variable is reported at once.
pub fn resolve_env_vars(value: &str) -> Result<String, ConfigError> {
    let mut result = value.to_string();
    let mut missing = Vec::new();

    for cap in ENV_VAR_REGEX.captures_iter(value) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(var_value) => result = result.replace(&cap[0], &var_value),
            Err(_) => missing.push(var_name.to_string()),
        }
    }

    if missing.is_empty() {
        Ok(result)
    } else {
        Err(ConfigError::ValidationError(format!(
            "undefined environment variable{}: {}",
            if missing.len() > 1 { "s" } else { "" },
            missing.join(", ")
        )))
    }
}
