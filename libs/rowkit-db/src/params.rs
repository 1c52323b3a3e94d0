//! Parameter substitution protocol for SQL templates.
//!
//! Two token grammars are recognized inside a template:
//!
//! - `:name` — a *value placeholder*. The value is handed to the driver as a
//!   native bind (`?` or `$N`), never spliced into the SQL text. Every
//!   occurrence of a bound name is replaced.
//! - `{name}` — an *identifier placeholder*. The replacement is substituted
//!   verbatim before execution and is therefore caller-trusted; use it for
//!   table and column names only.
//!
//! A `::` sequence is a SQL cast, not a placeholder. Tokens without a
//! matching entry pass through literally; a warning is emitted so latent
//! template bugs stay visible.

use std::collections::BTreeMap;

use crate::{DbEngine, DbValue};

#[derive(Debug, Clone)]
enum Entry {
    Value(DbValue),
    Ident(String),
}

/// An accumulated parameter mapping for one SQL template.
///
/// Names are stored in their token form (`:age`, `{table}`); the sigil is
/// added when missing so `bind("age", …)` and `bind(":age", …)` are
/// equivalent.
#[derive(Debug, Clone, Default)]
pub struct Params {
    entries: BTreeMap<String, Entry>,
}

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value placeholder.
    #[must_use]
    pub fn bind(mut self, name: &str, value: impl Into<DbValue>) -> Self {
        let key = if name.starts_with(':') {
            name.to_owned()
        } else {
            format!(":{name}")
        };
        self.entries.insert(key, Entry::Value(value.into()));
        self
    }

    /// Bind an identifier placeholder. The replacement is substituted
    /// verbatim into the SQL text and must come from trusted code.
    #[must_use]
    pub fn ident(mut self, name: &str, replacement: impl Into<String>) -> Self {
        let key = if name.starts_with('{') {
            name.to_owned()
        } else {
            format!("{{{name}}}")
        };
        self.entries.insert(key, Entry::Ident(replacement.into()));
        self
    }

    /// Merge `other` into `self`; entries from `other` win on collision.
    pub fn merge(&mut self, other: &Params) {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), v.clone());
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn value(&self, token: &str) -> Option<&DbValue> {
        match self.entries.get(token) {
            Some(Entry::Value(v)) => Some(v),
            _ => None,
        }
    }

    fn identifier(&self, token: &str) -> Option<&str> {
        match self.entries.get(token) {
            Some(Entry::Ident(s)) => Some(s),
            _ => None,
        }
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn native_placeholder(engine: DbEngine, ordinal: usize) -> String {
    match engine {
        DbEngine::Postgres => format!("${ordinal}"),
        DbEngine::MySql | DbEngine::Sqlite => "?".to_owned(),
    }
}

/// Expand a template into driver-native SQL plus an ordered bind list.
///
/// Identifier tokens are substituted in place; value tokens become native
/// placeholders, one bind per occurrence. Unresolved tokens are left
/// verbatim (lenient by design) and logged.
pub(crate) fn expand(template: &str, params: &Params, engine: DbEngine) -> (String, Vec<DbValue>) {
    let bytes = template.as_bytes();
    let mut out = String::with_capacity(template.len());
    let mut binds = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                let mut j = i + 1;
                while j < bytes.len() && is_word_byte(bytes[j]) {
                    j += 1;
                }
                if j > i + 1 && j < bytes.len() && bytes[j] == b'}' {
                    let token = &template[i..=j];
                    if let Some(replacement) = params.identifier(token) {
                        out.push_str(replacement);
                    } else {
                        tracing::warn!(
                            target: "rowkit_db::params",
                            token,
                            "unresolved identifier placeholder left verbatim"
                        );
                        out.push_str(token);
                    }
                    i = j + 1;
                } else {
                    out.push('{');
                    i += 1;
                }
            }
            b':' => {
                if i + 1 < bytes.len() && bytes[i + 1] == b':' {
                    // SQL cast, not a placeholder
                    out.push_str("::");
                    i += 2;
                } else {
                    let mut j = i + 1;
                    while j < bytes.len() && is_word_byte(bytes[j]) {
                        j += 1;
                    }
                    if j > i + 1 {
                        let token = &template[i..j];
                        if let Some(value) = params.value(token) {
                            binds.push(value.clone());
                            out.push_str(&native_placeholder(engine, binds.len()));
                        } else {
                            tracing::warn!(
                                target: "rowkit_db::params",
                                token,
                                "unresolved value placeholder left verbatim"
                            );
                            out.push_str(token);
                        }
                        i = j;
                    } else {
                        out.push(':');
                        i += 1;
                    }
                }
            }
            _ => {
                let start = i;
                while i < bytes.len() && bytes[i] != b'{' && bytes[i] != b':' {
                    i += 1;
                }
                out.push_str(&template[start..i]);
            }
        }
    }

    (out, binds)
}
