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

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Connection status published retained on `<topic>/trunk_recorder/status`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// Status message body; also used as the last will
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusMessage {
    pub status: ConnectionStatus,
    pub instance_id: String,
    pub client_id: String,
}

impl StatusMessage {
    pub fn new(status: ConnectionStatus, instance_id: &str, client_id: &str) -> Self {
        Self {
            status,
            instance_id: instance_id.to_string(),
            client_id: client_id.to_string(),
        }
    }
}

/// Wrap a document as `{type, <name>: document, timestamp, instance_id}`
pub fn envelope(
    name: &str,
    message_type: &str,
    document: Value,
    timestamp: i64,
    instance_id: &str,
) -> Value {
    let mut payload = Map::new();
    payload.insert("type".to_string(), Value::from(message_type));
    payload.insert(name.to_string(), document);
    payload.insert("timestamp".to_string(), Value::from(timestamp));
    payload.insert("instance_id".to_string(), Value::from(instance_id));
    Value::Object(payload)
}

/// Entry of the `systems` list and body of `system`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemInfo {
    pub sys_num: i32,
    pub sys_name: String,
    #[serde(rename = "type")]
    pub system_type: String,
    pub sysid: String,
    pub wacn: String,
    pub nac: String,
}

/// Entry of the `rates` list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemRate {
    pub sys_num: i32,
    pub sys_name: String,
    pub decoderate: f64,
    pub decoderate_interval: f32,
    pub control_channel: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceConfig {
    pub source_num: i32,
    pub rate: f64,
    pub center: f64,
    pub min_hz: f64,
    pub max_hz: f64,
    pub error: f64,
    pub driver: String,
    pub device: String,
    pub antenna: String,
    pub gain: f64,
    /// One `<stage>_gain` key per gain stage
    #[serde(flatten)]
    pub gain_stages: BTreeMap<String, f64>,
    pub analog_recorders: i32,
    pub digital_recorders: i32,
    pub debug_recorders: i32,
    pub sigmf_recorders: i32,
    pub silence_frames: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BandplanConfig {
    pub bandplan: String,
    pub bandfreq: i32,
    pub bandplan_base: f64,
    pub bandplan_high: f64,
    pub bandplan_spacing: f64,
    pub bandplan_offset: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemConfig {
    pub sys_num: i32,
    pub sys_name: String,
    pub system_type: String,
    pub talkgroups_file: String,
    pub qpsk: bool,
    pub squelch_db: f64,
    pub analog_levels: f64,
    pub digital_levels: f64,
    pub audio_archive: bool,
    pub upload_script: String,
    pub record_unknown: bool,
    pub call_log: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_channel: Option<f64>,
    pub channels: Vec<f64>,
    #[serde(flatten)]
    pub bandplan: Option<BandplanConfig>,
}

/// Body of `config`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigSnapshot {
    pub sources: Vec<SourceConfig>,
    pub systems: Vec<SystemConfig>,
    pub capture_dir: String,
    pub upload_server: String,
    pub call_timeout: i32,
    pub log_file: bool,
    pub instance_id: String,
    pub instance_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broadcast_signals: Option<bool>,
}

/// Entry of `recorders` and body of `recorder`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecorderInfo {
    pub id: String,
    pub src_num: i32,
    pub rec_num: i32,
    #[serde(rename = "type")]
    pub recorder_type: String,
    pub duration: f64,
    pub freq: f64,
    pub count: i64,
    pub rec_state: i32,
    pub rec_state_type: String,
}

/// Entry of `calls_active` and body of `call_start`
///
/// Calls without a recorder report `-1` for the recorder fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallInfo {
    pub id: String,
    pub call_num: u64,
    pub freq: f64,
    pub sys_num: i32,
    pub sys_name: String,
    pub talkgroup: i64,
    pub talkgroup_alpha_tag: String,
    pub unit: i64,
    pub unit_alpha_tag: String,
    pub elapsed: i64,
    pub length: f64,
    pub call_state: i32,
    pub call_state_type: String,
    pub mon_state: i32,
    pub mon_state_type: String,
    pub phase2: bool,
    pub conventional: bool,
    pub encrypted: bool,
    pub emergency: bool,
    pub stop_time: i64,
    pub rec_num: i32,
    pub src_num: i32,
    pub rec_state: i32,
    pub rec_state_type: String,
    pub analog: bool,
}

/// Body of `call_end`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallEnd {
    pub call_num: u64,
    pub sys_name: String,
    pub start_time: i64,
    pub stop_time: i64,
    pub length: f64,
    pub process_call_time: i64,
    pub retry_attempt: i32,
    pub error_count: i64,
    pub spike_count: i64,
    pub freq: f64,
    pub encrypted: bool,
    pub emergency: bool,
    pub tdma_slot: i32,
    pub phase2_tdma: bool,
    pub talkgroup: i64,
    pub talkgroup_tag: String,
    pub talkgroup_alpha_tag: String,
    pub talkgroup_description: String,
    pub talkgroup_group: String,
    pub talkgroup_patches: String,
    pub audio_type: String,
}

/// Unit topic `call`: the unit that opened a call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitCall {
    pub sys_num: i32,
    pub sys_name: String,
    pub call_num: u64,
    pub start_time: i64,
    pub freq: f64,
    pub unit: i64,
    pub unit_alpha_tag: String,
    pub talkgroup: i64,
    pub talkgroup_alpha_tag: String,
    pub talkgroup_patches: String,
    pub encrypted: bool,
}

/// Unit topic `end`: one transmission of a finished call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitTransmission {
    pub call_num: u64,
    pub sys_name: String,
    pub unit: i64,
    pub unit_alpha_tag: String,
    pub start_time: i64,
    pub stop_time: i64,
    pub sample_count: i64,
    pub spike_count: i64,
    pub error_count: i64,
    pub freq: f64,
    pub length: f64,
    pub transmission_filename: String,
    pub call_filename: String,
    pub position: f64,
    pub talkgroup: i64,
    pub talkgroup_alpha_tag: String,
    pub talkgroup_description: String,
    pub talkgroup_group: String,
    pub talkgroup_patches: String,
    pub encrypted: bool,
    pub emergency: bool,
    pub signal_system: String,
}

/// Unit topics `on`, `off`, `ackresp`, `data`, `join`, `ans_req`, `location`
///
/// Talkgroup fields are only present for the events that carry a talkgroup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitEvent {
    pub sys_num: i32,
    pub sys_name: String,
    pub unit: i64,
    pub unit_alpha_tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub talkgroup: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub talkgroup_alpha_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub talkgroup_patches: Option<String>,
}

/// Message topic `message`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrunkMessageInfo {
    pub sys_num: i32,
    pub sys_name: String,
    pub trunk_msg: i32,
    pub trunk_msg_type: String,
    pub opcode: String,
    pub opcode_type: String,
    pub opcode_desc: String,
}

/// One forwarded log line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsoleLine {
    pub time: String,
    pub severity: String,
    pub log_msg: String,
}
