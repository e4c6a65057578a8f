//! Provider configuration resolution
//!
//! Values set in the provider block win over the environment. Only the URL
//! and token have environment fallbacks.

use tfplug::{AttributePath, Config, Diagnostics};

pub const URL_ENV: &str = "INFLUXDB_URL";
pub const TOKEN_ENV: &str = "INFLUXDB_TOKEN";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    Token(String),
    Password { username: String, password: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub url: String,
    pub auth: AuthMethod,
}

impl ProviderSettings {
    /// Resolves settings from the provider block and the process environment
    pub fn from_config(config: &Config, diagnostics: &mut Diagnostics) -> Option<Self> {
        Self::resolve(config, |name| std::env::var(name).ok(), diagnostics)
    }

    pub fn resolve<E>(config: &Config, env: E, diagnostics: &mut Diagnostics) -> Option<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        if config.is_unknown("url") {
            diagnostics.add_attribute_error(
                AttributePath::new("url"),
                "Unknown InfluxDB URL",
                format!(
                    "The provider cannot create the InfluxDB client as there is an unknown configuration value for the InfluxDB URL. \
                     Either target apply the source of the value first, set the value statically in the configuration, or use the {} environment variable.",
                    URL_ENV
                ),
            );
        }
        if config.is_unknown("token") {
            diagnostics.add_attribute_error(
                AttributePath::new("token"),
                "Unknown InfluxDB Token",
                format!(
                    "The provider cannot create the InfluxDB client as there is an unknown configuration value for the InfluxDB Token. \
                     Either target apply the source of the value first, set the value statically in the configuration, or use the {} environment variable.",
                    TOKEN_ENV
                ),
            );
        }
        if diagnostics.has_errors() {
            return None;
        }

        let url = config
            .get_string("url")
            .or_else(|| env(URL_ENV))
            .unwrap_or_default();
        let token = config
            .get_string("token")
            .or_else(|| env(TOKEN_ENV))
            .unwrap_or_default();
        let username = config.get_string("username").unwrap_or_default();
        let password = config.get_string("password").unwrap_or_default();

        if url.is_empty() {
            diagnostics.add_attribute_error(
                AttributePath::new("url"),
                "Missing InfluxDB URL",
                format!(
                    "The provider cannot create the InfluxDB client as there is a missing or empty value for the InfluxDB URL. \
                     Set the host value in the configuration or use the {} environment variable. \
                     If either is already set, ensure the value is not empty.",
                    URL_ENV
                ),
            );
        }
        if token.is_empty() && username.is_empty() {
            diagnostics.add_attribute_error(
                AttributePath::new("token"),
                "Missing InfluxDB Credentials",
                format!(
                    "The provider cannot create the InfluxDB client as there was no token nor username/password given. \
                     Set the token or the username and password values in the configuration or use the {} environment variable. \
                     If either is already set, ensure the value is not empty.",
                    TOKEN_ENV
                ),
            );
        }
        if diagnostics.has_errors() {
            return None;
        }

        // A username switches to session auth even when a token is present
        let auth = if username.is_empty() {
            AuthMethod::Token(token)
        } else {
            AuthMethod::Password { username, password }
        };

        Some(Self { url, auth })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::config;
    use tfplug::Dynamic;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn config_values_override_environment() {
        let mut diagnostics = Diagnostics::new();
        let settings = ProviderSettings::resolve(
            &config(&[("url", "http://config:8086".into()), ("token", "from-config".into())]),
            |name| Some(format!("env-{}", name)),
            &mut diagnostics,
        )
        .unwrap();

        assert_eq!(settings.url, "http://config:8086");
        assert_eq!(settings.auth, AuthMethod::Token("from-config".into()));
    }

    #[test]
    fn environment_fills_unset_values() {
        let mut diagnostics = Diagnostics::new();
        let settings = ProviderSettings::resolve(
            &config(&[]),
            |name| match name {
                URL_ENV => Some("http://env:8086".to_string()),
                TOKEN_ENV => Some("env-token".to_string()),
                _ => None,
            },
            &mut diagnostics,
        )
        .unwrap();

        assert_eq!(settings.url, "http://env:8086");
        assert_eq!(settings.auth, AuthMethod::Token("env-token".into()));
    }

    #[test]
    fn username_selects_password_credentials() {
        let mut diagnostics = Diagnostics::new();
        let settings = ProviderSettings::resolve(
            &config(&[
                ("url", "http://localhost:8086".into()),
                ("token", "ignored".into()),
                ("username", "admin".into()),
                ("password", "secret".into()),
            ]),
            no_env,
            &mut diagnostics,
        )
        .unwrap();

        assert_eq!(
            settings.auth,
            AuthMethod::Password {
                username: "admin".into(),
                password: "secret".into()
            }
        );
    }

    #[test]
    fn missing_url_and_credentials_are_both_reported() {
        let mut diagnostics = Diagnostics::new();
        let settings = ProviderSettings::resolve(&config(&[]), no_env, &mut diagnostics);

        assert!(settings.is_none());
        let summaries: Vec<_> = diagnostics.errors.iter().map(|d| d.summary.as_str()).collect();
        assert_eq!(summaries, ["Missing InfluxDB URL", "Missing InfluxDB Credentials"]);
        assert_eq!(diagnostics.errors[1].attribute, Some(AttributePath::new("token")));
    }

    #[test]
    fn unknown_values_stop_resolution() {
        let mut diagnostics = Diagnostics::new();
        let settings = ProviderSettings::resolve(
            &config(&[("url", Dynamic::Unknown), ("token", Dynamic::Unknown)]),
            no_env,
            &mut diagnostics,
        );

        assert!(settings.is_none());
        assert_eq!(diagnostics.errors.len(), 2);
        assert_eq!(diagnostics.errors[0].summary, "Unknown InfluxDB URL");
        assert_eq!(diagnostics.errors[1].summary, "Unknown InfluxDB Token");
    }
}
