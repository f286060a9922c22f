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

// Host-facing plugin interface and the MQTT status plugin
//
// The host drives the plugin through `Plugin` in a fixed order:
// parse_config -> init -> start -> {event callbacks, poll_one,
// setup_config, system_rates} -> stop.

use crate::config::{ConfigLoader, StatusPluginConfig};
use crate::console::{ConsoleBuffer, ConsoleLayer};
use crate::document;
use crate::host::{Call, CallData, HostConfig, Recorder, Source, System, TrunkMessage};
use crate::protocol::{ConnectionStatus, StatusMessage};
use crate::publisher::Publisher;
use crate::topic::{TopicResolver, CONSOLE_TYPE};
use crate::transport::{
    ConnectionState, MqttTransport, MqttTransportOptions, Transport, TransportError,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub const DEFAULT_INSTANCE_ID: &str = "trunk-recorder";

const CALL_RESEND_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("invalid plugin configuration: {0:#}")]
    Config(#[from] anyhow::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to serialize status message: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0} called before {1}")]
    Lifecycle(&'static str, &'static str),
}

pub type PluginResult = Result<(), PluginError>;

/// Callbacks a recorder host invokes on its plugins
///
/// Every callback has a no-op default so a plugin only implements what it
/// cares about. Callbacks take `&mut self`: the host must not call one
/// plugin instance from several threads at once.
#[allow(unused_variables)]
pub trait Plugin: Send {
    /// Called before `init` with the plugin's own configuration section
    fn parse_config(&mut self, config: &Value) -> PluginResult {
        Ok(())
    }

    fn init(
        &mut self,
        config: Arc<HostConfig>,
        sources: Vec<Arc<dyn Source>>,
        systems: Vec<Arc<dyn System>>,
    ) -> PluginResult {
        Ok(())
    }

    /// Called once the host has finished its own setup
    fn start(&mut self) -> PluginResult {
        Ok(())
    }

    fn stop(&mut self) -> PluginResult {
        Ok(())
    }

    /// Called on every pass through the host's main loop
    fn poll_one(&mut self) -> PluginResult {
        Ok(())
    }

    /// Called at the same cadence as `system_rates`, roughly every 3 seconds
    fn setup_config(
        &mut self,
        sources: &[Arc<dyn Source>],
        systems: &[Arc<dyn System>],
    ) -> PluginResult {
        Ok(())
    }

    fn setup_systems(&mut self, systems: &[Arc<dyn System>]) -> PluginResult {
        Ok(())
    }

    fn setup_system(&mut self, system: &dyn System) -> PluginResult {
        Ok(())
    }

    /// A recorder was created or changed state
    fn setup_recorder(&mut self, recorder: &dyn Recorder) -> PluginResult {
        Ok(())
    }

    /// The set of active calls changed; only invoked on call start and end
    fn calls_active(&mut self, calls: &[Arc<dyn Call>]) -> PluginResult {
        Ok(())
    }

    fn call_start(&mut self, call: &dyn Call) -> PluginResult {
        Ok(())
    }

    fn call_end(&mut self, call_info: &CallData) -> PluginResult {
        Ok(())
    }

    fn trunk_message(&mut self, messages: &[TrunkMessage], system: &dyn System) -> PluginResult {
        Ok(())
    }

    fn unit_registration(&mut self, system: &dyn System, source_id: i64) -> PluginResult {
        Ok(())
    }

    fn unit_deregistration(&mut self, system: &dyn System, source_id: i64) -> PluginResult {
        Ok(())
    }

    fn unit_acknowledge_response(&mut self, system: &dyn System, source_id: i64) -> PluginResult {
        Ok(())
    }

    fn unit_group_affiliation(
        &mut self,
        system: &dyn System,
        source_id: i64,
        talkgroup: i64,
    ) -> PluginResult {
        Ok(())
    }

    fn unit_data_grant(&mut self, system: &dyn System, source_id: i64) -> PluginResult {
        Ok(())
    }

    fn unit_answer_request(
        &mut self,
        system: &dyn System,
        source_id: i64,
        talkgroup: i64,
    ) -> PluginResult {
        Ok(())
    }

    fn unit_location(
        &mut self,
        system: &dyn System,
        source_id: i64,
        talkgroup: i64,
    ) -> PluginResult {
        Ok(())
    }

    /// Control channel decode rates, `time_diff` seconds since the last report
    fn system_rates(&mut self, systems: &[Arc<dyn System>], time_diff: f32) -> PluginResult {
        Ok(())
    }
}

/// Fires at most once per interval
#[derive(Debug, Clone)]
struct ResendTimer {
    interval: Duration,
    last: Instant,
}

impl ResendTimer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Instant::now(),
        }
    }

    fn due(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last) >= self.interval {
            self.last = now;
            true
        } else {
            false
        }
    }
}

/// Publishes host state to an MQTT broker
pub struct MqttStatusPlugin {
    config: StatusPluginConfig,
    topics: TopicResolver,
    client_id: String,
    instance_id: String,
    host_config: Option<Arc<HostConfig>>,
    sources: Vec<Arc<dyn Source>>,
    systems: Vec<Arc<dyn System>>,
    // Kept so poll_one can refresh elapsed/length between host updates
    active_calls: Vec<Arc<dyn Call>>,
    pending_transport: Option<Box<dyn Transport>>,
    publisher: Option<Publisher>,
    announced: bool,
    console: ConsoleBuffer,
    call_resend: ResendTimer,
    snapshot_resend: Option<ResendTimer>,
}

impl Default for MqttStatusPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl MqttStatusPlugin {
    /// Plugin that opens its own MQTT connection on `start`
    pub fn new() -> Self {
        Self {
            config: StatusPluginConfig::default(),
            topics: TopicResolver::default(),
            client_id: String::new(),
            instance_id: DEFAULT_INSTANCE_ID.to_string(),
            host_config: None,
            sources: Vec::new(),
            systems: Vec::new(),
            active_calls: Vec::new(),
            pending_transport: None,
            publisher: None,
            announced: false,
            console: ConsoleBuffer::default(),
            call_resend: ResendTimer::new(CALL_RESEND_INTERVAL),
            snapshot_resend: None,
        }
    }

    /// Plugin that publishes through `transport` instead of MQTT
    pub fn with_transport(transport: Box<dyn Transport>) -> Self {
        Self {
            pending_transport: Some(transport),
            ..Self::new()
        }
    }

    pub fn config(&self) -> &StatusPluginConfig {
        &self.config
    }

    pub fn topics(&self) -> &TopicResolver {
        &self.topics
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn unit_enabled(&self) -> bool {
        self.config.unit_enabled()
    }

    pub fn message_enabled(&self) -> bool {
        self.config.message_enabled()
    }

    pub fn console_enabled(&self) -> bool {
        self.config.console_enabled()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.publisher
            .as_ref()
            .map(|p| p.transport().state())
            .unwrap_or_default()
    }

    /// Tracing layer that captures log lines for the console topic
    ///
    /// Lines are only published when `console_logs` is enabled.
    pub fn console_layer(&self) -> ConsoleLayer {
        self.console.layer()
    }

    /// `poll_one` against an explicit clock
    pub fn poll_at(&mut self, now: Instant) -> PluginResult {
        self.announce_if_connected();

        if self.call_resend.due(now) {
            self.resend_calls();
        }

        self.flush_console();
        Ok(())
    }

    /// `setup_config` against an explicit clock
    pub fn refresh_at(
        &mut self,
        now: Instant,
        sources: &[Arc<dyn Source>],
        systems: &[Arc<dyn System>],
    ) -> PluginResult {
        self.send_recorders(sources);

        let snapshot_due = self
            .snapshot_resend
            .as_mut()
            .map(|timer| timer.due(now))
            .unwrap_or(false);

        if snapshot_due {
            debug!("Refreshing config and systems snapshots");
            self.send_config(sources, systems);
            self.send_systems(systems);
        }

        Ok(())
    }

    fn status_payload(&self, status: ConnectionStatus) -> Result<Vec<u8>, PluginError> {
        let message = StatusMessage::new(status, &self.instance_id, &self.client_id);
        Ok(serde_json::to_vec(&message)?)
    }

    fn transport_options(&self) -> Result<MqttTransportOptions, PluginError> {
        Ok(MqttTransportOptions {
            broker: self.config.broker.clone(),
            client_id: self.client_id.clone(),
            username: self.config.username.clone(),
            password: self.config.password.clone(),
            qos: self.config.qos,
            status_topic: self.topics.status_topic(),
            online_payload: self.status_payload(ConnectionStatus::Connected)?,
            offline_payload: self.status_payload(ConnectionStatus::Disconnected)?,
            keep_alive: self.config.keep_alive(),
            connect_timeout: self.config.connect_timeout(),
        })
    }

    fn is_connected(&self) -> bool {
        self.publisher
            .as_ref()
            .map(|p| p.transport().is_connected())
            .unwrap_or(false)
    }

    fn send<T: Serialize + ?Sized>(
        &self,
        document: &T,
        name: &str,
        message_type: &str,
        object_topic: &str,
        retained: bool,
    ) {
        if let Some(publisher) = &self.publisher {
            publisher.send(document, name, message_type, object_topic, retained);
        }
    }

    /// Send to `unit_topic/<short_name>/<event>` when unit topics are on
    fn send_unit<T: Serialize + ?Sized>(&self, document: &T, event: &str, short_name: &str) {
        if let Some(object_topic) = self.topics.unit_object_topic(short_name) {
            self.send(document, event, event, &object_topic, false);
        }
    }

    /// Publish config and systems once the connection first comes up
    ///
    /// Covers a broker that was unreachable during `start`.
    fn announce_if_connected(&mut self) {
        if self.announced || !self.is_connected() {
            return;
        }

        let sources = self.sources.clone();
        let systems = self.systems.clone();
        self.send_config(&sources, &systems);
        self.send_systems(&systems);
        self.announced = true;
    }

    fn send_config(&self, sources: &[Arc<dyn Source>], systems: &[Arc<dyn System>]) {
        let Some(host_config) = &self.host_config else {
            return;
        };
        let snapshot = document::config_snapshot(host_config, sources, systems);
        self.send(&snapshot, "config", "config", self.topics.base(), true);
    }

    fn send_systems(&self, systems: &[Arc<dyn System>]) {
        let systems = document::systems_info(systems);
        self.send(&systems, "systems", "systems", self.topics.base(), true);
    }

    fn send_recorders(&self, sources: &[Arc<dyn Source>]) {
        let recorders = document::recorders_info(sources);
        self.send(&recorders, "recorders", "recorders", self.topics.base(), false);
    }

    fn send_calls(&self, calls: &[Arc<dyn Call>]) {
        let calls = document::active_calls(calls);
        self.send(&calls, "calls", "calls_active", self.topics.base(), false);
    }

    fn resend_calls(&self) {
        self.send_calls(&self.active_calls);
    }

    fn flush_console(&self) {
        let lines = self.console.drain();
        if lines.is_empty() || !self.console_enabled() {
            return;
        }

        let object_topic = self.topics.plugin_object_topic();
        for line in &lines {
            self.send(line, CONSOLE_TYPE, CONSOLE_TYPE, &object_topic, false);
        }
    }
}

impl Plugin for MqttStatusPlugin {
    fn parse_config(&mut self, config: &Value) -> PluginResult {
        let config = ConfigLoader::from_value(config)?;

        self.topics = config.topics();
        self.client_id = config.effective_client_id();
        self.snapshot_resend = config.refresh_interval().map(ResendTimer::new);

        info!("MQTT Status Plugin Broker: {}", config.broker);
        info!("MQTT Status Plugin Client Name: {}", self.client_id);
        info!("MQTT Status Plugin Broker Username: {}", config.username);
        if !config.password.is_empty() {
            info!("MQTT Status Plugin Broker Password: ********");
        }
        info!("MQTT Status Plugin Topic: {}", self.topics.base());
        info!(
            "MQTT Unit Status Plugin Topic: {}",
            self.topics.unit_base().unwrap_or("[disabled]")
        );
        info!(
            "MQTT Trunk Message Plugin Topic: {}",
            self.topics.message_base().unwrap_or("[disabled]")
        );
        info!("MQTT Status Plugin Console Logs: {}", config.console_logs);
        info!("MQTT Status Plugin message QOS: {}", config.qos);
        if let Some(refresh) = config.refresh_interval() {
            info!("MQTT Status Plugin snapshot refresh: {:?}", refresh);
        }

        self.config = config;
        Ok(())
    }

    fn init(
        &mut self,
        config: Arc<HostConfig>,
        sources: Vec<Arc<dyn Source>>,
        systems: Vec<Arc<dyn System>>,
    ) -> PluginResult {
        self.instance_id = if config.instance_id.is_empty() {
            DEFAULT_INSTANCE_ID.to_string()
        } else {
            config.instance_id.clone()
        };

        self.host_config = Some(config);
        self.sources = sources;
        self.systems = systems;
        Ok(())
    }

    fn start(&mut self) -> PluginResult {
        if self.host_config.is_none() {
            return Err(PluginError::Lifecycle("start", "init"));
        }

        let transport: Box<dyn Transport> = match self.pending_transport.take() {
            Some(transport) => transport,
            None => Box::new(MqttTransport::new(self.transport_options()?)?),
        };

        info!(
            "MQTT Status Plugin connecting over {} transport",
            transport.transport_type()
        );

        let mut publisher = Publisher::new(transport, self.instance_id.clone());
        if let Err(e) = publisher.transport_mut().connect() {
            error!("MQTT Status Plugin - {}", e);
        }
        self.publisher = Some(publisher);

        self.announce_if_connected();
        Ok(())
    }

    fn stop(&mut self) -> PluginResult {
        let offline = self.status_payload(ConnectionStatus::Disconnected)?;

        if let Some(mut publisher) = self.publisher.take() {
            // A clean disconnect suppresses the last will, so say it ourselves
            if let Err(e) = publisher.publish_raw(self.topics.status_topic(), offline, true) {
                warn!("Failed to publish disconnected status: {}", e);
            }
            if let Err(e) = publisher.transport_mut().disconnect() {
                warn!("MQTT Status Plugin - {}", e);
            }
        }

        self.announced = false;
        Ok(())
    }

    fn poll_one(&mut self) -> PluginResult {
        self.poll_at(Instant::now())
    }

    fn setup_config(
        &mut self,
        sources: &[Arc<dyn Source>],
        systems: &[Arc<dyn System>],
    ) -> PluginResult {
        self.refresh_at(Instant::now(), sources, systems)
    }

    fn setup_systems(&mut self, systems: &[Arc<dyn System>]) -> PluginResult {
        self.send_systems(systems);
        Ok(())
    }

    fn setup_system(&mut self, system: &dyn System) -> PluginResult {
        let info = document::system_info(system);

        // Resend the full system list with each update
        self.send_systems(&self.systems);

        self.send(&info, "system", "system", self.topics.base(), false);
        Ok(())
    }

    fn setup_recorder(&mut self, recorder: &dyn Recorder) -> PluginResult {
        let info = document::recorder_info(recorder);
        self.send(&info, "recorder", "recorder", self.topics.base(), false);
        Ok(())
    }

    fn calls_active(&mut self, calls: &[Arc<dyn Call>]) -> PluginResult {
        self.active_calls = calls.to_vec();
        self.send_calls(calls);
        Ok(())
    }

    fn call_start(&mut self, call: &dyn Call) -> PluginResult {
        if self.unit_enabled() {
            let unit_call = document::unit_call(call);
            self.send_unit(&unit_call, "call", &call.short_name());
        }

        let info = document::call_info(call);
        self.send(&info, "call", "call_start", self.topics.base(), false);
        Ok(())
    }

    fn call_end(&mut self, call_info: &CallData) -> PluginResult {
        if self.unit_enabled() {
            for transmission in document::unit_transmissions(call_info) {
                self.send_unit(&transmission, "end", &call_info.short_name);
            }
        }

        let end = document::call_end(call_info);
        self.send(&end, "call", "call_end", self.topics.base(), false);
        Ok(())
    }

    fn trunk_message(&mut self, messages: &[TrunkMessage], system: &dyn System) -> PluginResult {
        let Some(object_topic) = self.topics.message_object_topic(&system.short_name()) else {
            return Ok(());
        };

        for message in messages {
            let info = document::trunk_message(system, message);
            self.send(&info, "message", "message", &object_topic, false);
        }
        Ok(())
    }

    fn unit_registration(&mut self, system: &dyn System, source_id: i64) -> PluginResult {
        if self.unit_enabled() {
            self.send_unit(&document::unit_event(system, source_id), "on", &system.short_name());
        }
        Ok(())
    }

    fn unit_deregistration(&mut self, system: &dyn System, source_id: i64) -> PluginResult {
        if self.unit_enabled() {
            self.send_unit(&document::unit_event(system, source_id), "off", &system.short_name());
        }
        Ok(())
    }

    fn unit_acknowledge_response(&mut self, system: &dyn System, source_id: i64) -> PluginResult {
        if self.unit_enabled() {
            let event = document::unit_event(system, source_id);
            self.send_unit(&event, "ackresp", &system.short_name());
        }
        Ok(())
    }

    fn unit_group_affiliation(
        &mut self,
        system: &dyn System,
        source_id: i64,
        talkgroup: i64,
    ) -> PluginResult {
        if self.unit_enabled() {
            let event = document::unit_talkgroup_event(system, source_id, talkgroup, true);
            self.send_unit(&event, "join", &system.short_name());
        }
        Ok(())
    }

    fn unit_data_grant(&mut self, system: &dyn System, source_id: i64) -> PluginResult {
        if self.unit_enabled() {
            self.send_unit(&document::unit_event(system, source_id), "data", &system.short_name());
        }
        Ok(())
    }

    fn unit_answer_request(
        &mut self,
        system: &dyn System,
        source_id: i64,
        talkgroup: i64,
    ) -> PluginResult {
        if self.unit_enabled() {
            let event = document::unit_talkgroup_event(system, source_id, talkgroup, false);
            self.send_unit(&event, "ans_req", &system.short_name());
        }
        Ok(())
    }

    fn unit_location(
        &mut self,
        system: &dyn System,
        source_id: i64,
        talkgroup: i64,
    ) -> PluginResult {
        if self.unit_enabled() {
            let event = document::unit_talkgroup_event(system, source_id, talkgroup, true);
            self.send_unit(&event, "location", &system.short_name());
        }
        Ok(())
    }

    fn system_rates(&mut self, systems: &[Arc<dyn System>], time_diff: f32) -> PluginResult {
        let rates = document::system_rates(systems, time_diff);
        self.send(&rates, "rates", "rates", self.topics.base(), false);
        Ok(())
    }
}

/// Entry point for hosts that load plugins by factory
pub fn create_plugin() -> Box<dyn Plugin> {
    Box::new(MqttStatusPlugin::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resend_timer() {
        let start = Instant::now();
        let mut timer = ResendTimer {
            interval: Duration::from_secs(1),
            last: start,
        };

        assert!(!timer.due(start + Duration::from_millis(500)));
        assert!(timer.due(start + Duration::from_secs(1)));
        assert!(!timer.due(start + Duration::from_millis(1500)));
        assert!(timer.due(start + Duration::from_secs(2)));
    }

    #[test]
    fn test_start_requires_init() {
        let mut plugin = MqttStatusPlugin::new();
        let result = plugin.start();
        assert!(matches!(result, Err(PluginError::Lifecycle("start", "init"))));
    }

    #[test]
    fn test_parse_config_derives_flags() {
        let mut plugin = MqttStatusPlugin::new();
        plugin
            .parse_config(&serde_json::json!({
                "topic": "tr/status/",
                "unit_topic": "tr/units",
                "console_logs": true
            }))
            .unwrap();

        assert!(plugin.unit_enabled());
        assert!(!plugin.message_enabled());
        assert!(plugin.console_enabled());
        assert_eq!(plugin.topics().base(), "tr/status");
        assert!(plugin.client_id().starts_with("tr-status-"));
    }

    #[test]
    fn test_parse_config_rejects_missing_topic() {
        let mut plugin = MqttStatusPlugin::new();
        let result = plugin.parse_config(&serde_json::json!({"broker": "tcp://mqtt:1883"}));
        assert!(matches!(result, Err(PluginError::Config(_))));
    }

    #[test]
    fn test_callbacks_before_start_are_silent() {
        let mut plugin = MqttStatusPlugin::new();
        assert!(plugin.calls_active(&[]).is_ok());
        assert!(plugin.poll_one().is_ok());
        assert_eq!(plugin.connection_state(), ConnectionState::Disconnected);
    }
}
