//! Database configuration: one DSN-bearing profile per logical connection
//! name, loadable from a figment.

use std::collections::BTreeMap;
use std::time::Duration;

use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::{DbError, Result};

/// Per-profile connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProfileConfig {
    /// Connection string; `${VAR}` references are expanded from the
    /// environment before connecting.
    pub dsn: String,

    /// Timeout to acquire the connection (humantime syntax, e.g. `"30s"`).
    #[serde(default, with = "humantime_serde")]
    pub acquire_timeout: Option<Duration>,

    /// Forward statements to the sqlx logger.
    #[serde(default)]
    pub sql_logging: bool,
}

/// The `db` configuration section: profile name to connection settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DbConfig {
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileConfig>,
}

impl DbConfig {
    /// Extract the `db` section from a figment.
    ///
    /// # Errors
    /// Returns [`DbError::InvalidConfig`] when the section fails to
    /// deserialize.
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        figment
            .extract_inner::<DbConfig>("db")
            .map_err(|e| DbError::InvalidConfig(e.to_string()))
    }
}

/// Expand `${VAR}` environment references in a string.
///
/// # Errors
/// Returns an error when a referenced variable is not set.
pub fn expand_env_vars(input: &str) -> Result<String> {
    let re = regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .map_err(|e| DbError::InvalidConfig(e.to_string()))?;
    let mut result = input.to_owned();

    for caps in re.captures_iter(input) {
        let full_match = &caps[0];
        let var_name = &caps[1];
        let value = std::env::var(var_name)?;
        result = result.replace(full_match, &value);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use figment::Figment;
    use figment::providers::Serialized;

    use super::*;

    #[test]
    fn extracts_profiles_from_a_figment() {
        let figment = Figment::new().merge(Serialized::defaults(serde_json::json!({
            "db": {
                "profiles": {
                    "default": { "dsn": "sqlite::memory:" },
                    "analytics": { "dsn": "sqlite::memory:", "sql_logging": true }
                }
            }
        })));

        let cfg = DbConfig::from_figment(&figment).unwrap();
        assert_eq!(cfg.profiles.len(), 2);
        assert_eq!(cfg.profiles["default"].dsn, "sqlite::memory:");
        assert!(cfg.profiles["analytics"].sql_logging);
    }

    #[test]
    fn missing_section_is_an_invalid_config() {
        let figment = Figment::new();
        assert!(matches!(
            DbConfig::from_figment(&figment),
            Err(DbError::InvalidConfig(_))
        ));
    }

    #[test]
    fn expands_env_references() {
        // PATH is present in every test environment.
        let path = std::env::var("PATH").unwrap();
        let out = expand_env_vars("prefix:${PATH}").unwrap();
        assert_eq!(out, format!("prefix:{path}"));
    }

    #[test]
    fn unset_env_reference_errors() {
        assert!(expand_env_vars("mysql://h/${ROWKIT_TEST_DB_MISSING}").is_err());
    }

    #[test]
    fn strings_without_references_pass_through() {
        assert_eq!(expand_env_vars("sqlite::memory:").unwrap(), "sqlite::memory:");
    }
}
