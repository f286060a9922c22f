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

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use trunk_status::protocol::{ConnectionStatus, StatusMessage};
use trunk_status::transport::{MqttTransport, MqttTransportOptions, OutboundMessage, Transport};
use trunk_status::{load_config_with_env, StatusPluginConfig};

/// Validate an MQTT status plugin configuration and optionally probe the broker
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the plugin configuration (YAML or JSON)
    #[arg(short, long, default_value = "mqtt_status.yaml")]
    config: PathBuf,

    /// Connect to the broker and publish a connected status
    #[arg(long)]
    connect: bool,

    /// Instance id used in the status message
    #[arg(long, default_value = "trunk-recorder")]
    instance_id: String,

    /// Log filter, e.g. `debug` or `info,rumqttc=warn`; RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&args.log_level)
            .with_context(|| format!("Invalid log level '{}'", args.log_level))?,
    };

    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config_with_env(&args.config)?;
    info!("Loaded configuration from: {:?}", args.config);

    print_topics(&config);

    if args.connect {
        probe_broker(&config, &args.instance_id)?;
    }

    Ok(())
}

fn print_topics(config: &StatusPluginConfig) {
    let topics = config.topics();

    info!("Broker: {}", config.broker);
    info!("Client id: {}", config.effective_client_id());
    info!("Status topic: {}", topics.status_topic());
    info!("Call topics: {}", topics.topic("call_start"));
    match topics.unit_object_topic("<system>") {
        Some(topic) => info!("Unit topics: {}/<event>", topic),
        None => info!("Unit topics: [disabled]"),
    }
    match topics.message_object_topic("<system>") {
        Some(topic) => info!("Message topics: {}/message", topic),
        None => info!("Message topics: [disabled]"),
    }
    if config.console_enabled() {
        info!("Console topic: {}", topics.console_topic());
    }
}

fn probe_broker(config: &StatusPluginConfig, instance_id: &str) -> Result<()> {
    let topics = config.topics();
    let client_id = config.effective_client_id();

    let status = |status| serde_json::to_vec(&StatusMessage::new(status, instance_id, &client_id));

    let options = MqttTransportOptions {
        broker: config.broker.clone(),
        client_id: client_id.clone(),
        username: config.username.clone(),
        password: config.password.clone(),
        qos: config.qos,
        status_topic: topics.status_topic(),
        online_payload: status(ConnectionStatus::Connected)?,
        offline_payload: status(ConnectionStatus::Disconnected)?,
        keep_alive: config.keep_alive(),
        connect_timeout: config.connect_timeout(),
    };

    let mut transport = MqttTransport::new(options).context("Invalid broker settings")?;
    transport
        .connect()
        .with_context(|| format!("Failed to connect to {}", config.broker))?;
    info!("Connected to {} as {}", config.broker, client_id);

    // Leave the broker with an accurate retained status
    let offline = OutboundMessage {
        topic: topics.status_topic(),
        payload: status(ConnectionStatus::Disconnected)?,
        retained: true,
    };
    if let Err(e) = transport.publish(offline) {
        warn!("Failed to publish disconnected status: {}", e);
    }

    transport.disconnect()?;
    info!("Broker check complete");
    Ok(())
}
