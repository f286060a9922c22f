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

// Transport trait for publish-only messaging

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Connection lifecycle
///
/// `Disconnected -> Connecting -> Connected`, back to `Disconnected` when
/// the connection fails, then `Connecting` again on the next retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// A single message ready for the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub retained: bool,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid broker address '{0}': {1}")]
    InvalidBroker(String, String),

    #[error("unsupported broker scheme '{0}', expected tcp, mqtt, ssl or mqtts")]
    UnsupportedScheme(String),

    #[error("invalid QoS level {0}, expected 0, 1 or 2")]
    InvalidQos(u8),

    #[error("failed to start transport runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("no connection acknowledgement from {broker} within {timeout:?}")]
    ConnectTimeout { broker: String, timeout: Duration },

    #[error("transport is not connected")]
    NotConnected,

    #[error("MQTT client request failed: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("failed to serialize payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Outbound connection to a message broker
///
/// Implementations own their connection and any background machinery.
/// `publish` must not block the caller.
pub trait Transport: Send {
    /// Open the connection, waiting for the first acknowledgement
    fn connect(&mut self) -> Result<(), TransportError>;

    /// Current connection state
    fn state(&self) -> ConnectionState;

    /// Queue one message for delivery
    fn publish(&self, message: OutboundMessage) -> Result<(), TransportError>;

    /// Close the connection cleanly
    fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Get transport type identifier
    fn transport_type(&self) -> &str;

    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }
}
