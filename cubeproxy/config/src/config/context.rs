use std::{collections::HashMap, env::VarError, ops::Not};

/// Context for generating a [`ProxyConfig`](crate::ProxyConfig).
///
/// Every environment lookup made while generating the config goes through
/// [`ConfigContext::get_env`], so tests (and embedders) can override variables without touching
/// the process environment.
#[derive(Debug, Default)]
pub struct ConfigContext {
    /// Environment variables that override the process environment ([`mod@std::env`]).
    env_override: HashMap<String, String>,

    /// If true, use only [`Self::env_override`] strictly without [`mod@std::env`].
    strict_env: bool,

    /// Warnings collected during config generation.
    warnings: Vec<String>,
}

impl ConfigContext {
    /// Adds an override for an environment variable.
    ///
    /// This override will only affect [`Self::get_env`] behavior,
    /// it will **not** change the process environment.
    pub fn override_env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.env_override.insert(key.into(), value.into());
        self
    }

    /// Disables usage of [`mod@std::env`] in [`Self::get_env`].
    ///
    /// Effectively isolates config generation from process environment.
    pub fn strict_env(mut self, value: bool) -> Self {
        self.strict_env = value;
        self
    }

    /// Returns value of an environment variable with the given name.
    ///
    /// This is the only way we should read environment when generating configuration.
    pub fn get_env(&self, name: &str) -> Result<String, VarError> {
        match self.env_override.get(name) {
            Some(value) => Ok(value.clone()),
            None if self.strict_env => Err(VarError::NotPresent),
            None => std::env::var(name),
        }
    }

    /// Stores a warning produced when generating a config.
    pub fn add_warning(&mut self, warning: String) {
        tracing::warn!(%warning, "configuration warning");
        self.warnings.push(warning);
    }

    /// Returns all warnings previously stored with [`ConfigContext::add_warning`].
    pub fn into_warnings(self) -> Vec<String> {
        self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings.is_empty().not()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_over_process_env() {
        let context = ConfigContext::default()
            .override_env("PATH", "/nowhere")
            .strict_env(true);

        assert_eq!(context.get_env("PATH").unwrap(), "/nowhere");
        assert!(context.get_env("HOME").is_err());
    }
}
