//! URL pattern prefixing for sites installed under a subdirectory.
//!
//! Speculation-rule path patterns are written relative to the site root
//! (`/shop/*`). When the site lives at `/blog/`, the pattern must become
//! `/blog/shop/*`. Base paths are escaped as URL pattern strings, so a `:`
//! in a base path is literal, not a named group.

use std::collections::BTreeMap;

use tracing::warn;

use crate::error::ConfigError;

/// Characters with meaning in a URL pattern component.
const PATTERN_SPECIAL_CHARS: &[char] = &['+', '*', '?', ':', '{', '}', '(', ')', '\\'];

/// Characters that make the pattern parser switch state, forcing the base
/// path into a `{...}` group.
const STATE_SWITCH_CHARS: &[char] = &[':', '?', '#'];

/// Prefixes path patterns with a per-context base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPatternPrefixer {
    /// context name => escaped base path with exactly one trailing slash.
    contexts: BTreeMap<String, String>,
}

impl UrlPatternPrefixer {
    /// Build a prefixer from `context => base_path` pairs.
    pub fn new<I, K, V>(contexts: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let contexts = contexts
            .into_iter()
            .map(|(name, path)| (name.into(), escape_pattern_string(&trailing_slash(path.as_ref()))))
            .collect();
        Self { contexts }
    }

    /// Escaped base path for a context.
    pub fn base_path(&self, context: &str) -> Option<&str> {
        self.contexts.get(context).map(String::as_str)
    }

    /// Prefix `path_pattern` with the base path of `context`.
    ///
    /// A pattern that already starts with the base path is not prefixed a
    /// second time.
    pub fn prefix_path_pattern(&self, path_pattern: &str, context: &str) -> Result<String, ConfigError> {
        let context_path = self
            .contexts
            .get(context)
            .ok_or_else(|| ConfigError::UnknownContext(context.to_string()))?;

        // The trailing slash changes what `*` matches, so it stays outside the group.
        let escaped_context_path = if context_path.contains(STATE_SWITCH_CHARS) {
            format!("{{{}}}/", &context_path[..context_path.len() - 1])
        } else {
            context_path.clone()
        };

        let path_pattern = path_pattern
            .strip_prefix(context_path.as_str())
            .unwrap_or(path_pattern);

        Ok(format!("{escaped_context_path}{}", path_pattern.trim_start_matches('/')))
    }

    /// Like [`prefix_path_pattern`](Self::prefix_path_pattern), but an unknown
    /// context is logged and the pattern is returned unchanged.
    pub fn prefix_or_passthrough(&self, path_pattern: &str, context: &str) -> String {
        self.prefix_path_pattern(path_pattern, context)
            .unwrap_or_else(|e| {
                warn!(%context, error = %e, "leaving URL pattern unprefixed");
                path_pattern.to_string()
            })
    }
}

impl Default for UrlPatternPrefixer {
    fn default() -> Self {
        Self::new([("home", "/"), ("site", "/")])
    }
}

fn trailing_slash(path: &str) -> String {
    format!("{}/", path.trim_end_matches(['/', '\\']))
}

/// Backslash-escape URL pattern syntax characters.
fn escape_pattern_string(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if PATTERN_SPECIAL_CHARS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
