//! Configuration loader and path/env helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env
//! vars. Provides helpers to expand `~` and `${VAR}`, to resolve relative
//! paths against a base directory, and to read boolean env flags.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::env;
use std::path::{Path, PathBuf};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_"));

        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}

/// Read a boolean environment flag, case-insensitively.
///
/// "1", "true", "yes" or "on" count as `true`. The original name plus its
/// upper- and lower-cased variants are all checked, so `useopenai` and
/// `USE_OPENAI` both work.
pub fn env_flag(name: &str, default: bool) -> bool {
    for key in [name.to_string(), name.to_uppercase(), name.to_lowercase()] {
        if let Ok(v) = env::var(&key) {
            return matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
    }
    default
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_flag_variant_names() {
        env::remove_var("KS_TEST_FLAG");
        env::remove_var("ks_test_flag");
        env::set_var("ks_test_flag", "1");
        assert!(env_flag("KS_TEST_FLAG", false));
        env::set_var("ks_test_flag", "0");
        assert!(!env_flag("KS_TEST_FLAG", true));
        env::remove_var("ks_test_flag");
    }

    #[test]
    fn env_flag_truthy_spellings() {
        for v in ["1", "true", "Yes", "ON"] {
            env::set_var("KS_TEST_TRUTHY", v);
            assert!(env_flag("KS_TEST_TRUTHY", false), "{v} should be truthy");
        }
        env::set_var("KS_TEST_TRUTHY", "off");
        assert!(!env_flag("KS_TEST_TRUTHY", true));
        env::remove_var("KS_TEST_TRUTHY");
    }

    #[test]
    fn env_flag_default_when_unset() {
        env::remove_var("KS_TEST_UNSET");
        assert!(env_flag("KS_TEST_UNSET", true));
        assert!(!env_flag("KS_TEST_UNSET", false));
    }
}
