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

// Envelope wrapping and the single publish path

use crate::protocol::envelope;
use crate::topic;
use crate::transport::{OutboundMessage, Transport, TransportError};
use serde::Serialize;
use tracing::{debug, error};

/// Outcome of a publish attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the transport
    Sent,
    /// Transport not connected; message discarded
    Dropped,
}

/// Wraps documents in the envelope and hands them to the transport
pub struct Publisher {
    transport: Box<dyn Transport>,
    instance_id: String,
}

impl Publisher {
    pub fn new(transport: Box<dyn Transport>, instance_id: String) -> Self {
        Self {
            transport,
            instance_id,
        }
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn transport_mut(&mut self) -> &mut dyn Transport {
        self.transport.as_mut()
    }

    /// Publish `document` as `<name>` in an envelope of type `message_type`
    /// on `<object_topic>/<message_type>`
    ///
    /// Messages are dropped, not queued, while the transport is not connected.
    pub fn publish<T: Serialize + ?Sized>(
        &self,
        document: &T,
        name: &str,
        message_type: &str,
        object_topic: &str,
        retained: bool,
    ) -> Result<Delivery, TransportError> {
        if !self.transport.is_connected() {
            debug!("Not connected, dropping '{}' message", message_type);
            return Ok(Delivery::Dropped);
        }

        let payload = envelope(
            name,
            message_type,
            serde_json::to_value(document)?,
            chrono::Utc::now().timestamp(),
            &self.instance_id,
        );

        self.publish_raw(
            topic::resolve(object_topic, None, message_type),
            serde_json::to_vec(&payload)?,
            retained,
        )
    }

    /// Publish a payload as-is, without an envelope
    pub fn publish_raw(
        &self,
        topic: String,
        payload: Vec<u8>,
        retained: bool,
    ) -> Result<Delivery, TransportError> {
        if !self.transport.is_connected() {
            return Ok(Delivery::Dropped);
        }

        self.transport.publish(OutboundMessage {
            topic,
            payload,
            retained,
        })?;
        Ok(Delivery::Sent)
    }

    /// Publish and log failures instead of returning them
    ///
    /// Host callbacks go through here so a broker problem never reaches the
    /// recording pipeline.
    pub fn send<T: Serialize + ?Sized>(
        &self,
        document: &T,
        name: &str,
        message_type: &str,
        object_topic: &str,
        retained: bool,
    ) {
        if let Err(e) = self.publish(document, name, message_type, object_topic, retained) {
            error!("Failed to publish '{}' to {}: {}", message_type, object_topic, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ConnectionState;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    struct FakeTransport {
        state: ConnectionState,
        fail: bool,
        sent: Arc<Mutex<Vec<OutboundMessage>>>,
    }

    impl Transport for FakeTransport {
        fn connect(&mut self) -> Result<(), TransportError> {
            self.state = ConnectionState::Connected;
            Ok(())
        }

        fn state(&self) -> ConnectionState {
            self.state
        }

        fn publish(&self, message: OutboundMessage) -> Result<(), TransportError> {
            if self.fail {
                return Err(TransportError::NotConnected);
            }
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        fn disconnect(&mut self) -> Result<(), TransportError> {
            self.state = ConnectionState::Disconnected;
            Ok(())
        }

        fn transport_type(&self) -> &str {
            "fake"
        }
    }

    fn publisher(
        state: ConnectionState,
        fail: bool) -> (Publisher, Arc<Mutex<Vec<OutboundMessage>>>,
    ) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let transport = FakeTransport {
            state,
            fail,
            sent: sent.clone(),
        };
        (Publisher::new(Box::new(transport), "tr-1".to_string()), sent)
    }

    #[test]
    fn test_publish_wraps_envelope() {
        let (publisher, sent) = publisher(ConnectionState::Connected, false);

        let delivery = publisher
            .publish(&json!({"talkgroup": 101}), "call", "call_start", "tr/status", false)
            .unwrap();
        assert_eq!(delivery, Delivery::Sent);

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].topic, "tr/status/call_start");
        assert!(!sent[0].retained);

        let payload: Value = serde_json::from_slice(&sent[0].payload).unwrap();
        assert_eq!(payload["type"], "call_start");
        assert_eq!(payload["call"]["talkgroup"], 101);
        assert_eq!(payload["instance_id"], "tr-1");
        assert!(payload["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_publish_before_connected_is_dropped() {
        for state in [ConnectionState::Disconnected, ConnectionState::Connecting] {
            let (publisher, sent) = publisher(state, false);
            let delivery = publisher
                .publish(&json!({}), "config", "config", "tr", true)
                .unwrap();
            assert_eq!(delivery, Delivery::Dropped);
            assert!(sent.lock().unwrap().is_empty());
        }
    }

    #[test]
    fn test_send_swallows_transport_errors() {
        let (publisher, sent) = publisher(ConnectionState::Connected, true);
        assert!(publisher.publish(&json!({}), "rates", "rates", "tr", false).is_err());

        // Must not panic or propagate
        publisher.send(&json!({}), "rates", "rates", "tr", false);
        assert!(sent.lock().unwrap().is_empty());
    }
}
