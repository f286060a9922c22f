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

// Topic name assembly

pub const SEPARATOR: char = '/';

/// Subtopic under the base topic that carries plugin status and console output
pub const PLUGIN_SUBTOPIC: &str = "trunk_recorder";
pub const STATUS_TYPE: &str = "status";
pub const CONSOLE_TYPE: &str = "console";

/// Remove exactly one trailing separator from a configured topic
pub fn trim_separator(topic: &str) -> &str {
    topic.strip_suffix(SEPARATOR).unwrap_or(topic)
}

/// Build `base[/subtopic]/message_type`
pub fn resolve(base: &str, subtopic: Option<&str>, message_type: &str) -> String {
    let base = trim_separator(base);
    match subtopic.map(trim_separator) {
        Some(sub) if !sub.is_empty() => format!("{base}/{sub}/{message_type}"),
        _ => format!("{base}/{message_type}"),
    }
}

/// Resolved base topics for one plugin instance
///
/// `unit` and `message` are `None` when the corresponding feature is off.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicResolver {
    base: String,
    unit: Option<String>,
    message: Option<String>,
}

impl TopicResolver {
    pub fn new(base: &str, unit: Option<&str>, message: Option<&str>) -> Self {
        let non_empty = |t: &str| (!t.is_empty()).then(|| trim_separator(t).to_string());

        Self {
            base: trim_separator(base).to_string(),
            unit: unit.and_then(non_empty),
            message: message.and_then(non_empty),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn unit_base(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn message_base(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// `base/message_type`
    pub fn topic(&self, message_type: &str) -> String {
        resolve(&self.base, None, message_type)
    }

    /// `unit_base/<short_name>`, the prefix for a system's unit events, or
    /// `None` when unit topics are off
    pub fn unit_object_topic(&self, short_name: &str) -> Option<String> {
        self.unit
            .as_deref()
            .map(|unit| format!("{}/{}", unit, trim_separator(short_name)))
    }

    /// `message_base/<short_name>`
    pub fn message_object_topic(&self, short_name: &str) -> Option<String> {
        self.message
            .as_deref()
            .map(|message| format!("{}/{}", message, trim_separator(short_name)))
    }

    /// `base/trunk_recorder`, the prefix for status and console topics
    pub fn plugin_object_topic(&self) -> String {
        format!("{}/{}", self.base, PLUGIN_SUBTOPIC)
    }

    /// Retained connect/disconnect status topic
    pub fn status_topic(&self) -> String {
        resolve(&self.base, Some(PLUGIN_SUBTOPIC), STATUS_TYPE)
    }

    pub fn console_topic(&self) -> String {
        resolve(&self.base, Some(PLUGIN_SUBTOPIC), CONSOLE_TYPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_separator_trimmed_once() {
        assert_eq!(trim_separator("foo/"), "foo");
        assert_eq!(trim_separator("foo"), "foo");
        assert_eq!(trim_separator("foo//"), "foo/");
        assert_eq!(trim_separator(""), "");
    }

    #[test]
    fn test_resolve() {
        assert_eq!(resolve("foo/", None, "config"), "foo/config");
        assert_eq!(resolve("units", Some("metro/"), "on"), "units/metro/on");
        assert_eq!(resolve("units", Some(""), "on"), "units/on");
    }

    #[test]
    fn test_resolver_topics() {
        let topics = TopicResolver::new("tr/status/", Some("tr/units"), None);
        assert_eq!(topics.base(), "tr/status");
        assert_eq!(topics.topic("calls_active"), "tr/status/calls_active");
        assert_eq!(
            topics.unit_object_topic("metro").as_deref(),
            Some("tr/units/metro")
        );
        assert_eq!(topics.message_object_topic("metro"), None);
        assert_eq!(topics.plugin_object_topic(), "tr/status/trunk_recorder");
        assert_eq!(topics.status_topic(), "tr/status/trunk_recorder/status");
        assert_eq!(topics.console_topic(), "tr/status/trunk_recorder/console");
    }

    #[test]
    fn test_empty_subtopics_disable_features() {
        let topics = TopicResolver::new("tr", Some(""), None);
        assert_eq!(topics.unit_base(), None);
        assert_eq!(topics.message_base(), None);
        assert_eq!(topics.unit_object_topic("metro"), None);
    }
}
