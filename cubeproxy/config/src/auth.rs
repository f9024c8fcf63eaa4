use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{
    from_env::FromEnv, source::ConfigSource, ConfigContext, ConfigError, GenerateConfig, Result,
};

/// # `auth`
///
/// Credentials attached to every request sent to the cluster API.
///
/// At most one of `token`, `username`/`password` and `client_certificate` may be set.
///
/// ```json
/// {
///   "auth": { "token": "sha256~..." }
/// }
/// ```
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthFileConfig {
    pub token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,

    /// PEM bundle holding the client certificate chain and its private key.
    pub client_certificate: Option<PathBuf>,
}

impl fmt::Debug for AuthFileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthFileConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("client_certificate", &self.client_certificate)
            .finish()
    }
}

/// How requests authenticate against the cluster API.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum AuthConfig {
    #[default]
    None,

    /// `Authorization: Bearer <token>`
    Bearer { token: String },

    /// `Authorization: Basic <base64(username:password)>`
    Basic { username: String, password: String },

    /// TLS client certificate read from a PEM bundle.
    ClientCertificate { identity_pem: PathBuf },
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bearer { .. } => f
                .debug_struct("Bearer")
                .field("token", &"<redacted>")
                .finish(),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::ClientCertificate { identity_pem } => f
                .debug_struct("ClientCertificate")
                .field("identity_pem", identity_pem)
                .finish(),
        }
    }
}

impl GenerateConfig for AuthFileConfig {
    type Generated = AuthConfig;

    fn generate_config(self, context: &mut ConfigContext) -> Result<Self::Generated> {
        let token = FromEnv::<String>::new("CUBEPROXY_TOKEN")
            .or(self.token)
            .source_value(context)
            .transpose()?;
        let username = FromEnv::<String>::new("CUBEPROXY_USERNAME")
            .or(self.username)
            .source_value(context)
            .transpose()?;
        let password = FromEnv::<String>::new("CUBEPROXY_PASSWORD")
            .or(self.password)
            .source_value(context)
            .transpose()?;
        let client_certificate = FromEnv::<PathBuf>::new("CUBEPROXY_CLIENT_CERTIFICATE")
            .or(self.client_certificate)
            .source_value(context)
            .transpose()?;

        match (token, username, password, client_certificate) {
            (None, None, None, None) => Ok(AuthConfig::None),
            (Some(token), None, None, None) => Ok(AuthConfig::Bearer { token }),
            (None, Some(username), Some(password), None) => {
                Ok(AuthConfig::Basic { username, password })
            }
            (None, Some(_), None, None) => Err(ConfigError::ValueNotProvided(
                "auth",
                "password",
                Some("CUBEPROXY_PASSWORD"),
            )),
            (None, None, Some(_), None) => Err(ConfigError::ValueNotProvided(
                "auth",
                "username",
                Some("CUBEPROXY_USERNAME"),
            )),
            (None, None, None, Some(identity_pem)) => {
                Ok(AuthConfig::ClientCertificate { identity_pem })
            }
            _ => Err(ConfigError::Conflict(
                "auth",
                "only one of `token`, `username`/`password` or `client_certificate` can be set"
                    .to_owned(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ConfigContext {
        ConfigContext::default().strict_env(true)
    }

    #[test]
    fn bearer_from_env() {
        let mut context = context().override_env("CUBEPROXY_TOKEN", "abc");

        let auth = AuthFileConfig::default()
            .generate_config(&mut context)
            .unwrap();

        assert_eq!(
            auth,
            AuthConfig::Bearer {
                token: "abc".into()
            }
        );
    }

    #[test]
    fn basic_needs_both_parts() {
        let error = AuthFileConfig {
            username: Some("developer".into()),
            ..Default::default()
        }
        .generate_config(&mut context())
        .unwrap_err();

        assert!(matches!(
            error,
            ConfigError::ValueNotProvided("auth", "password", _)
        ));
    }

    #[test]
    fn modes_are_exclusive() {
        let error = AuthFileConfig {
            token: Some("abc".into()),
            client_certificate: Some("/tmp/client.pem".into()),
            ..Default::default()
        }
        .generate_config(&mut context())
        .unwrap_err();

        assert!(matches!(error, ConfigError::Conflict("auth", _)));
    }

    #[test]
    fn debug_hides_secrets() {
        let auth = AuthConfig::Basic {
            username: "developer".into(),
            password: "hunter2".into(),
        };

        let rendered = format!("{auth:?}");
        assert!(rendered.contains("developer"));
        assert!(!rendered.contains("hunter2"));
    }
}
