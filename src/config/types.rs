// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Configuration types for the MQTT status plugin

use crate::topic::{trim_separator, TopicResolver};
use crate::transport::derive_client_id;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Plugin section of the host configuration
///
/// Unit and message topics switch their features on by being present;
/// there are no separate enable flags.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StatusPluginConfig {
    #[serde(default = "default_broker")]
    pub broker: String,

    /// Derived from broker and topic when empty
    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub topic: String,

    #[serde(default)]
    pub unit_topic: String,

    #[serde(default)]
    pub message_topic: String,

    #[serde(default)]
    pub console_logs: bool,

    #[serde(default)]
    pub qos: u8,

    /// Seconds between unsolicited config/systems snapshots, 0 disables
    #[serde(default)]
    pub refresh: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    #[serde(default = "default_keep_alive")]
    pub keep_alive_seconds: u64,
}

impl Default for StatusPluginConfig {
    fn default() -> Self {
        Self {
            broker: default_broker(),
            client_id: String::new(),
            username: String::new(),
            password: String::new(),
            topic: String::new(),
            unit_topic: String::new(),
            message_topic: String::new(),
            console_logs: false,
            qos: 0,
            refresh: 0,
            connect_timeout_seconds: default_connect_timeout(),
            keep_alive_seconds: default_keep_alive(),
        }
    }
}

impl StatusPluginConfig {
    pub fn unit_enabled(&self) -> bool {
        !self.unit_topic.is_empty()
    }

    pub fn message_enabled(&self) -> bool {
        !self.message_topic.is_empty()
    }

    pub fn console_enabled(&self) -> bool {
        self.console_logs
    }

    /// Configured client id, or one derived from broker and topic
    pub fn effective_client_id(&self) -> String {
        if self.client_id.is_empty() {
            derive_client_id(&self.broker, trim_separator(&self.topic))
        } else {
            self.client_id.clone()
        }
    }

    pub fn topics(&self) -> TopicResolver {
        TopicResolver::new(
            &self.topic,
            self.unit_enabled().then_some(self.unit_topic.as_str()),
            self.message_enabled().then_some(self.message_topic.as_str()),
        )
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh > 0).then(|| Duration::from_secs(self.refresh))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_seconds)
    }

    /// Strip one trailing separator from every configured topic
    pub(crate) fn normalize_topics(&mut self) {
        for topic in [&mut self.topic, &mut self.unit_topic, &mut self.message_topic] {
            if topic.ends_with('/') {
                topic.pop();
            }
        }
    }
}

// Default value functions
fn default_broker() -> String { "tcp://localhost:1883".to_string() }
fn default_connect_timeout() -> u64 { 30 }
fn default_keep_alive() -> u64 { 60 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_features_follow_topic_presence() {
        let mut config = StatusPluginConfig {
            topic: "tr".to_string(),
            ..Default::default()
        };
        assert!(!config.unit_enabled());
        assert!(!config.message_enabled());
        assert_eq!(config.topics().unit_base(), None);

        config.unit_topic = "tr/units".to_string();
        config.message_topic = "tr/messages".to_string();
        assert!(config.unit_enabled());
        assert!(config.message_enabled());
        assert_eq!(config.topics().message_base(), Some("tr/messages"));
    }

    #[test]
    fn test_effective_client_id() {
        let mut config = StatusPluginConfig {
            topic: "tr/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.effective_client_id(),
            derive_client_id("tcp://localhost:1883", "tr")
        );

        config.client_id = "my-client".to_string();
        assert_eq!(config.effective_client_id(), "my-client");
    }

    #[test]
    fn test_refresh_interval() {
        let mut config = StatusPluginConfig::default();
        assert_eq!(config.refresh_interval(), None);
        config.refresh = 60;
        assert_eq!(config.refresh_interval(), Some(Duration::from_secs(60)));
    }
}
