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

// MQTT status plugin for a trunked radio recorder
//
// Publishes the recorder's live state to an MQTT broker:
// - Systems, sources and recorders as they are configured and change
// - Call start/end and the set of active calls
// - Per-unit radio events and decoded control channel messages
// - Decode rates and, optionally, the host's console log
// - A retained connected/disconnected status with a last will

pub mod config;
pub mod console;
pub mod document;
pub mod host;
pub mod lookup;
pub mod plugin;
pub mod protocol;
pub mod publisher;
pub mod topic;
pub mod transport;

// Re-export main types
pub use config::{load_config, load_config_with_env, StatusPluginConfig};
pub use console::{ConsoleBuffer, ConsoleLayer};
pub use host::{Call, CallData, HostConfig, Recorder, Source, System, TrunkMessage};
pub use plugin::{create_plugin, MqttStatusPlugin, Plugin, PluginError, PluginResult};
pub use protocol::{ConnectionStatus, StatusMessage};
pub use publisher::{Delivery, Publisher};
pub use topic::TopicResolver;
pub use transport::{
    ConnectionState, MqttTransport, MqttTransportOptions, OutboundMessage, Transport,
    TransportError,
};
