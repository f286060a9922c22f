// Configuration loader with environment variable substitution

use super::types::*;
use crate::transport::BrokerAddress;
use anyhow::{bail, Context, Result};
use regex::Regex;
use serde_json::Value;
use std::path::Path;
use std::sync::OnceLock;

pub struct ConfigLoader;

fn env_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}").expect("env substitution pattern is valid")
    })
}

impl ConfigLoader {
    /// Load the plugin section from a YAML or JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<StatusPluginConfig> {
        let content = std::fs::read_to_string(path.as_ref())
            .context("Failed to read config file")?;

        // Substitute environment variables
        let content = Self::substitute_env_vars(&content);

        // YAML is a superset of JSON, so one parser covers both
        let config: StatusPluginConfig = serde_yaml::from_str(&content)
            .context("Failed to parse plugin configuration")?;

        Self::finish(config)
    }

    /// Parse the plugin section handed over by the host
    pub fn from_value(value: &Value) -> Result<StatusPluginConfig> {
        let value = Self::substitute_value(value.clone());
        let config: StatusPluginConfig = serde_json::from_value(value)
            .context("Failed to parse plugin configuration")?;

        Self::finish(config)
    }

    fn finish(mut config: StatusPluginConfig) -> Result<StatusPluginConfig> {
        config.normalize_topics();
        Self::validate(&config)?;
        Ok(config)
    }

    /// Substitute ${VAR} and ${VAR:-default} patterns with environment variables
    ///
    /// Examples:
    /// - ${MQTT_PASSWORD} -> secret
    /// - ${MQTT_BROKER:-tcp://localhost:1883} -> tcp://localhost:1883 (if MQTT_BROKER not set)
    fn substitute_env_vars(content: &str) -> String {
        let substituted = env_pattern().replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str());

            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if let Some(default) = default_value {
                        default.to_string()
                    } else {
                        // Keep original if no default and var not found
                        format!("${{{}}}", var_name)
                    }
                }
            }
        });
        substituted.to_string()
    }

    /// Apply substitution to every string leaf of a JSON tree
    fn substitute_value(value: Value) -> Value {
        match value {
            Value::String(s) => Value::String(Self::substitute_env_vars(&s)),
            Value::Array(items) => {
                Value::Array(items.into_iter().map(Self::substitute_value).collect())
            }
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Self::substitute_value(v)))
                    .collect(),
            ),
            other => other,
        }
    }

    /// Validate configuration
    fn validate(config: &StatusPluginConfig) -> Result<()> {
        if config.topic.is_empty() {
            bail!("topic cannot be empty");
        }

        if config.qos > 2 {
            bail!("qos must be 0, 1 or 2");
        }

        if config.broker.is_empty() {
            bail!("broker cannot be empty");
        }

        BrokerAddress::parse(&config.broker).context("broker is not a usable MQTT URL")?;

        if config.connect_timeout_seconds == 0 {
            bail!("connect_timeout_seconds must be > 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_env_var_substitution() {
        // Set test environment variable
        std::env::set_var("TR_STATUS_TEST_VAR", "test_value");

        let input = "password: ${TR_STATUS_TEST_VAR}";
        let output = ConfigLoader::substitute_env_vars(input);
        assert_eq!(output, "password: test_value");

        std::env::remove_var("TR_STATUS_TEST_VAR");
    }

    #[test]
    fn test_env_var_with_default() {
        std::env::remove_var("TR_STATUS_TEST_VAR2");

        let input = "broker: ${TR_STATUS_TEST_VAR2:-tcp://mqtt:1883}";
        let output = ConfigLoader::substitute_env_vars(input);
        assert_eq!(output, "broker: tcp://mqtt:1883");
    }

    #[test]
    fn test_from_value_trims_topics() {
        let config = ConfigLoader::from_value(&json!({
            "topic": "foo/",
            "unit_topic": "foo/units/",
            "qos": 1
        }))
        .unwrap();

        assert_eq!(config.topic, "foo");
        assert_eq!(config.unit_topic, "foo/units");
        assert_eq!(config.message_topic, "");
        assert_eq!(config.broker, "tcp://localhost:1883");
        assert_eq!(config.qos, 1);
    }

    #[test]
    fn test_validation_empty_topic() {
        let result = ConfigLoader::from_value(&json!({"broker": "tcp://mqtt:1883"}));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("topic"));
    }

    #[test]
    fn test_validation_invalid_qos() {
        let mut config = StatusPluginConfig {
            topic: "tr".to_string(),
            ..Default::default()
        };
        config.qos = 3;

        let result = ConfigLoader::validate(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("qos"));
    }

    #[test]
    fn test_validation_unsupported_broker() {
        for broker in ["ws://mqtt.example.com", "tcp://"] {
            let result = ConfigLoader::from_value(&json!({"broker": broker, "topic": "tr"}));
            assert!(result.is_err(), "accepted broker {}", broker);
            assert!(result.unwrap_err().to_string().contains("broker"));
        }

        let config = ConfigLoader::from_value(&json!({"broker": "mqtt.local", "topic": "tr"}));
        assert!(config.is_ok());
    }
}
