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

// MQTT transport backed by rumqttc
//
// The rumqttc event loop runs on a private single-worker tokio runtime so the
// host's callback thread never blocks on network I/O. Publishes go through
// `AsyncClient::try_publish`, which only enqueues the request.

use super::backend::{ConnectionState, OutboundMessage, Transport, TransportError};
use super::tls;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, LastWill, MqttOptions, Outgoing, Packet, QoS,
    TlsConfiguration, Transport as WireTransport,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub const DEFAULT_PORT: u16 = 1883;
pub const DEFAULT_TLS_PORT: u16 = 8883;

const RECONNECT_MIN: Duration = Duration::from_secs(10);
const RECONNECT_MAX: Duration = Duration::from_secs(40);
const REQUEST_CAPACITY: usize = 100;
// Config snapshots of large sites exceed the 10 KiB rumqttc default
const MAX_PACKET_SIZE: usize = 256 * 1024;
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

/// Host, port and transport security parsed from a broker URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

impl BrokerAddress {
    /// Parse `tcp://host:port`, `mqtt://`, `ssl://` or `mqtts://`
    ///
    /// A bare `host[:port]` is treated as `tcp://`.
    pub fn parse(broker: &str) -> Result<Self, TransportError> {
        let with_scheme = if broker.contains("://") {
            broker.to_string()
        } else {
            format!("tcp://{}", broker)
        };

        let url = url::Url::parse(&with_scheme)
            .map_err(|e| TransportError::InvalidBroker(broker.to_string(), e.to_string()))?;

        let tls = match url.scheme() {
            "tcp" | "mqtt" => false,
            "ssl" | "mqtts" | "tls" => true,
            other => return Err(TransportError::UnsupportedScheme(other.to_string())),
        };

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                TransportError::InvalidBroker(broker.to_string(), "missing host".to_string())
            })?
            .to_string();

        let port = url
            .port()
            .unwrap_or(if tls { DEFAULT_TLS_PORT } else { DEFAULT_PORT });

        Ok(Self { host, port, tls })
    }
}

/// Stable client id for deployments that do not configure one
///
/// Derived from the broker and topic so a redeployed instance reuses its
/// broker session name instead of colliding with another instance.
pub fn derive_client_id(broker: &str, topic: &str) -> String {
    let checksum = crc32fast::hash(format!("{}{}", broker, topic).as_bytes());
    format!("tr-status-{:08x}", checksum)
}

pub fn qos_from_level(level: u8) -> Result<QoS, TransportError> {
    match level {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(TransportError::InvalidQos(other)),
    }
}

/// Doubling reconnect delay, capped
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    initial: Duration,
    max: Duration,
    next: Duration,
}

impl Backoff {
    pub(crate) fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            next: initial,
        }
    }

    pub(crate) fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(self.max);
        delay
    }

    pub(crate) fn reset(&mut self) {
        self.next = self.initial;
    }
}

#[derive(Debug, Clone)]
pub struct MqttTransportOptions {
    /// Broker URL, e.g. `tcp://localhost:1883`
    pub broker: String,
    pub client_id: String,
    pub username: String,
    pub password: String,
    pub qos: u8,
    /// Retained status topic used for the connect message and the last will
    pub status_topic: String,
    pub online_payload: Vec<u8>,
    pub offline_payload: Vec<u8>,
    pub keep_alive: Duration,
    pub connect_timeout: Duration,
}

/// State shared with the event loop task
struct Session {
    client: AsyncClient,
    state: Arc<watch::Sender<ConnectionState>>,
    shutdown: Arc<AtomicBool>,
    broker: String,
    status_topic: String,
    online_payload: Vec<u8>,
    qos: QoS,
}

pub struct MqttTransport {
    options: MqttTransportOptions,
    address: BrokerAddress,
    qos: QoS,
    runtime: Option<Runtime>,
    client: Option<AsyncClient>,
    driver: Option<JoinHandle<()>>,
    state: Arc<watch::Sender<ConnectionState>>,
    shutdown: Arc<AtomicBool>,
}

impl MqttTransport {
    pub fn new(options: MqttTransportOptions) -> Result<Self, TransportError> {
        let address = BrokerAddress::parse(&options.broker)?;
        let qos = qos_from_level(options.qos)?;
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        info!(
            "MQTT transport for {}:{} (tls: {}, client id: {})",
            address.host, address.port, address.tls, options.client_id
        );

        Ok(Self {
            options,
            address,
            qos,
            runtime: None,
            client: None,
            driver: None,
            state: Arc::new(state),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    fn mqtt_options(&self) -> MqttOptions {
        let mut mqtt_options = MqttOptions::new(
            self.options.client_id.clone(),
            self.address.host.clone(),
            self.address.port,
        );

        mqtt_options
            .set_keep_alive(self.options.keep_alive)
            .set_clean_session(true)
            .set_max_packet_size(MAX_PACKET_SIZE, MAX_PACKET_SIZE)
            .set_last_will(LastWill::new(
                self.options.status_topic.clone(),
                self.options.offline_payload.clone(),
                self.qos,
                true,
            ));

        if !self.options.username.is_empty() && !self.options.password.is_empty() {
            info!("Setting MQTT broker username and password");
            mqtt_options.set_credentials(
                self.options.username.clone(),
                self.options.password.clone(),
            );
        }

        if self.address.tls {
            mqtt_options.set_transport(WireTransport::tls_with_config(TlsConfiguration::Rustls(
                tls::insecure_client_config(),
            )));
        }

        mqtt_options
    }
}

impl Transport for MqttTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        if self.client.is_some() {
            return Ok(());
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("tr-status-mqtt")
            .enable_all()
            .build()?;

        let (client, eventloop) = AsyncClient::new(self.mqtt_options(), REQUEST_CAPACITY);
        self.shutdown.store(false, Ordering::Release);
        self.state.send_replace(ConnectionState::Connecting);

        let session = Session {
            client: client.clone(),
            state: self.state.clone(),
            shutdown: self.shutdown.clone(),
            broker: self.options.broker.clone(),
            status_topic: self.options.status_topic.clone(),
            online_payload: self.options.online_payload.clone(),
            qos: self.qos,
        };

        info!("Connecting to MQTT broker {}", self.options.broker);
        let driver = runtime.spawn(drive(eventloop, session));

        let mut state_rx = self.state.subscribe();
        let timeout = self.options.connect_timeout;
        info!("Waiting for the connection...");
        let connected = runtime.block_on(async move {
            tokio::time::timeout(timeout, async {
                state_rx
                    .wait_for(|state| *state == ConnectionState::Connected)
                    .await
                    .is_ok()
            })
            .await
            .unwrap_or(false)
        });

        self.client = Some(client);
        self.driver = Some(driver);
        self.runtime = Some(runtime);

        if connected {
            info!("Connected to MQTT broker {}", self.options.broker);
            Ok(())
        } else {
            // The event loop keeps retrying in the background
            Err(TransportError::ConnectTimeout {
                broker: self.options.broker.clone(),
                timeout,
            })
        }
    }

    fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn publish(&self, message: OutboundMessage) -> Result<(), TransportError> {
        let client = self.client.as_ref().ok_or(TransportError::NotConnected)?;
        client.try_publish(message.topic, self.qos, message.retained, message.payload)?;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        self.shutdown.store(true, Ordering::Release);

        let result = match self.client.take() {
            Some(client) => client.try_disconnect().map_err(TransportError::from),
            None => Ok(()),
        };

        if let Some(runtime) = self.runtime.take() {
            if let Some(driver) = self.driver.take() {
                // Let the event loop flush queued publishes and the DISCONNECT packet
                if runtime
                    .block_on(async { tokio::time::timeout(DISCONNECT_GRACE, driver).await })
                    .is_err()
                {
                    warn!("MQTT event loop did not stop within {:?}", DISCONNECT_GRACE);
                }
            }
            runtime.shutdown_background();
        }

        self.state.send_replace(ConnectionState::Disconnected);
        info!("Disconnected from MQTT broker {}", self.options.broker);
        result
    }

    fn transport_type(&self) -> &str {
        "mqtt"
    }
}

impl Drop for MqttTransport {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Poll the event loop until shutdown, tracking connection state
async fn drive(mut eventloop: EventLoop, session: Session) {
    let mut backoff = Backoff::new(RECONNECT_MIN, RECONNECT_MAX);

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    backoff.reset();
                    session.state.send_replace(ConnectionState::Connected);
                    debug!("CONNACK from {}", session.broker);

                    if let Err(e) = session.client.try_publish(
                        session.status_topic.clone(),
                        session.qos,
                        true,
                        session.online_payload.clone(),
                    ) {
                        warn!("Failed to queue connected status message: {}", e);
                    }
                } else {
                    error!("MQTT broker {} refused connection: {:?}", session.broker, ack.code);
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                warn!("MQTT broker {} sent DISCONNECT", session.broker);
                session.state.send_replace(ConnectionState::Disconnected);
            }
            Ok(Event::Outgoing(Outgoing::Disconnect))
                if session.shutdown.load(Ordering::Acquire) =>
            {
                break;
            }
            Ok(_) => {}
            Err(e) => {
                session.state.send_replace(ConnectionState::Disconnected);
                if session.shutdown.load(Ordering::Acquire) {
                    break;
                }

                let delay = backoff.next_delay();
                error!(
                    "MQTT connection lost to {}: {}. Reconnecting in {:?}",
                    session.broker, e, delay
                );
                tokio::time::sleep(delay).await;
                session.state.send_replace(ConnectionState::Connecting);
            }
        }
    }

    session.state.send_replace(ConnectionState::Disconnected);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(broker: &str) -> MqttTransportOptions {
        MqttTransportOptions {
            broker: broker.to_string(),
            client_id: "tr-status".to_string(),
            username: String::new(),
            password: String::new(),
            qos: 0,
            status_topic: "tr/trunk_recorder/status".to_string(),
            online_payload: b"{\"status\":\"connected\"}".to_vec(),
            offline_payload: b"{\"status\":\"disconnected\"}".to_vec(),
            keep_alive: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_parse_broker_addresses() {
        let tcp = BrokerAddress::parse("tcp://localhost:1883").unwrap();
        assert_eq!(tcp, BrokerAddress { host: "localhost".to_string(), port: 1883, tls: false });

        let tls = BrokerAddress::parse("ssl://broker.example.net").unwrap();
        assert_eq!(tls.port, DEFAULT_TLS_PORT);
        assert!(tls.tls);

        let bare = BrokerAddress::parse("10.0.0.5:1884").unwrap();
        assert_eq!(bare.host, "10.0.0.5");
        assert_eq!(bare.port, 1884);
        assert!(!bare.tls);
    }

    #[test]
    fn test_parse_rejects_unknown_scheme() {
        let result = BrokerAddress::parse("ws://localhost:9001");
        assert!(matches!(result, Err(TransportError::UnsupportedScheme(s)) if s == "ws"));
    }

    #[test]
    fn test_derived_client_id_is_stable() {
        let a = derive_client_id("tcp://localhost:1883", "tr/status");
        let b = derive_client_id("tcp://localhost:1883", "tr/status");
        let c = derive_client_id("tcp://localhost:1883", "tr/other");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("tr-status-"));
        assert_eq!(a.len(), "tr-status-".len() + 8);
    }

    #[test]
    fn test_qos_levels() {
        assert_eq!(qos_from_level(0).unwrap(), QoS::AtMostOnce);
        assert_eq!(qos_from_level(2).unwrap(), QoS::ExactlyOnce);
        assert!(matches!(qos_from_level(3), Err(TransportError::InvalidQos(3))));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut backoff = Backoff::new(RECONNECT_MIN, RECONNECT_MAX);
        assert_eq!(backoff.next_delay(), Duration::from_secs(10));
        assert_eq!(backoff.next_delay(), Duration::from_secs(20));
        assert_eq!(backoff.next_delay(), Duration::from_secs(40));
        assert_eq!(backoff.next_delay(), Duration::from_secs(40));
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(10));
    }

    #[test]
    fn test_publish_before_connect_is_rejected() {
        let transport = MqttTransport::new(options("tcp://localhost:1883")).unwrap();
        assert_eq!(transport.state(), ConnectionState::Disconnected);
        assert!(!transport.is_connected());

        let result = transport.publish(OutboundMessage {
            topic: "tr/config".to_string(),
            payload: b"{}".to_vec(),
            retained: true,
        });
        assert!(matches!(result, Err(TransportError::NotConnected)));
    }

    #[test]
    fn test_new_rejects_invalid_qos() {
        let mut opts = options("tcp://localhost:1883");
        opts.qos = 5;
        assert!(matches!(MqttTransport::new(opts), Err(TransportError::InvalidQos(5))));
    }
}
