//! `${VAR}` and `${VAR:-default}` expansion for configuration strings.

use crate::ConfigError;

/// Expand environment variable references in `value`.
///
/// Only the braced forms are recognized; a bare `$VAR` passes through
/// untouched so that paths and URLs containing `$` survive.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, lookup)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })
}

/// Strict lookup: an unset variable without a default is an error.
fn lookup(var: &str) -> Result<Option<String>, UnsetVar> {
    std::env::var(var).map(Some).map_err(|_| UnsetVar {
        var_name: var.to_owned(),
    })
}

struct UnsetVar {
    var_name: String,
}
