//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::LlmConfig;
use crate::llm::DEFAULT_API_BASE;

/// Default hosted model.
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

/// Low temperature keeps the intake questions and the classification format
/// stable across turns.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

pub const DEFAULT_PORT: u16 = 8080;

/// Idle sessions older than this are dropped.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;

/// How strictly an assistant reply must match the classification format
/// before it is accepted as the session's final classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectionPolicy {
    /// Any reply containing the `ISSUE_CLUSTER:` marker.
    #[default]
    Marker,
    /// Only replies in which every labeled field is present.
    Strict,
}

impl std::str::FromStr for DetectionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "marker" => Ok(Self::Marker),
            "strict" => Ok(Self::Strict),
            other => Err(format!("expected 'marker' or 'strict', got '{other}'")),
        }
    }
}

/// Service configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub api_key: SecretString,
    pub model: String,
    pub api_base: String,
    pub temperature: f32,
    pub port: u16,
    pub detection: DetectionPolicy,
    pub session_ttl: Duration,
}

impl IntakeConfig {
    /// Load from the process environment (after `.env`, if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv_override().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GROQ_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar {
                key: "GROQ_API_KEY".to_string(),
                hint: "export GROQ_API_KEY=gsk_... or add it to .env".to_string(),
            })?;

        let model = lookup("INTAKE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "INTAKE_MODEL".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        let api_base = lookup("INTAKE_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let temperature = match lookup("INTAKE_TEMPERATURE") {
            Some(raw) => {
                let t: f32 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: "INTAKE_TEMPERATURE".to_string(),
                    message: format!("'{raw}' is not a number"),
                })?;
                if !(0.0..=2.0).contains(&t) {
                    return Err(ConfigError::InvalidValue {
                        key: "INTAKE_TEMPERATURE".to_string(),
                        message: format!("{t} is outside 0.0..=2.0"),
                    });
                }
                t
            }
            None => DEFAULT_TEMPERATURE,
        };

        let port = match lookup("INTAKE_PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "INTAKE_PORT".to_string(),
                message: format!("'{raw}' is not a valid port"),
            })?,
            None => DEFAULT_PORT,
        };

        let detection = match lookup("INTAKE_DETECTION") {
            Some(raw) => raw
                .parse()
                .map_err(|message| ConfigError::InvalidValue {
                    key: "INTAKE_DETECTION".to_string(),
                    message,
                })?,
            None => DetectionPolicy::default(),
        };

        let session_ttl = match lookup("INTAKE_SESSION_TTL_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "INTAKE_SESSION_TTL_SECS".to_string(),
                        message: format!("'{raw}' is not a positive number of seconds"),
                    });
                }
            },
            None => Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
        };

        Ok(Self {
            api_key: SecretString::from(api_key),
            model,
            api_base,
            temperature,
            port,
            detection,
            session_ttl,
        })
    }

    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig {
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            api_base: self.api_base.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn missing_api_key_fails_fast() {
        let err = IntakeConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar { ref key, .. } if key == "GROQ_API_KEY"));
    }

    #[test]
    fn blank_api_key_is_missing() {
        let err = IntakeConfig::from_lookup(lookup(&[("GROQ_API_KEY", "   ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar { .. }));
    }

    #[test]
    fn defaults_apply() {
        let config = IntakeConfig::from_lookup(lookup(&[("GROQ_API_KEY", "gsk-1")])).unwrap();
        assert_eq!(config.api_key.expose_secret(), "gsk-1");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.detection, DetectionPolicy::Marker);
        assert_eq!(config.session_ttl, Duration::from_secs(DEFAULT_SESSION_TTL_SECS));
    }

    #[test]
    fn overrides_apply() {
        let config = IntakeConfig::from_lookup(lookup(&[
            ("GROQ_API_KEY", "gsk-1"),
            ("INTAKE_MODEL", "llama-3.3-70b-versatile"),
            ("INTAKE_TEMPERATURE", "0"),
            ("INTAKE_PORT", "9000"),
            ("INTAKE_DETECTION", "Strict"),
            ("INTAKE_SESSION_TTL_SECS", "90"),
        ]))
        .unwrap();
        assert_eq!(config.model, "llama-3.3-70b-versatile");
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.port, 9000);
        assert_eq!(config.detection, DetectionPolicy::Strict);
        assert_eq!(config.session_ttl, Duration::from_secs(90));
    }

    #[test]
    fn invalid_values_are_errors() {
        for (key, value) in [
            ("INTAKE_TEMPERATURE", "warm"),
            ("INTAKE_TEMPERATURE", "3.5"),
            ("INTAKE_PORT", "99999"),
            ("INTAKE_DETECTION", "fuzzy"),
            ("INTAKE_MODEL", ""),
            ("INTAKE_SESSION_TTL_SECS", "0"),
            ("INTAKE_SESSION_TTL_SECS", "soon"),
        ] {
            let result = IntakeConfig::from_lookup(lookup(&[("GROQ_API_KEY", "gsk-1"), (key, value)]));
            assert!(
                matches!(result, Err(ConfigError::InvalidValue { .. })),
                "{key}={value} should be rejected"
            );
        }
    }
}
