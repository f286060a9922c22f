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

// Query interface exposed by the recorder host
//
// The host owns every object behind these traits. The plugin only reads
// them for the duration of a callback, or keeps an `Arc` handle to the
// system and source lists it is given at init.

use std::sync::Arc;

/// Global settings shared by the host with every plugin
#[derive(Debug, Clone, Default)]
pub struct HostConfig {
    pub capture_dir: String,
    pub upload_server: String,
    pub call_timeout: i32,
    pub log_file: bool,
    pub instance_id: String,
    pub instance_key: String,
    pub broadcast_signals: bool,
}

/// Identity of a system as reported by its decoder
#[derive(Debug, Clone, Default)]
pub struct SystemStats {
    pub id: i32,
    pub name: String,
    pub system_type: String,
    pub sysid: i64,
    pub wacn: i64,
    pub nac: i64,
}

/// Control channel decode rate over the last interval
#[derive(Debug, Clone, Default)]
pub struct SystemRates {
    pub id: i32,
    pub decoderate: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Talkgroup {
    pub number: i64,
    pub alpha_tag: String,
    pub description: String,
    pub group: String,
}

/// Smartnet band plan parameters
#[derive(Debug, Clone, Default)]
pub struct Bandplan {
    pub bandplan: String,
    pub bandfreq: i32,
    pub base: f64,
    pub high: f64,
    pub spacing: f64,
    pub offset: i32,
}

pub trait System: Send + Sync {
    fn sys_num(&self) -> i32;
    fn short_name(&self) -> String;
    /// "p25", "smartnet", "conventional", "conventionalP25", ...
    fn system_type(&self) -> String;
    fn talkgroups_file(&self) -> String;
    fn qpsk_mod(&self) -> bool;
    fn squelch_db(&self) -> f64;
    fn analog_levels(&self) -> f64;
    fn digital_levels(&self) -> f64;
    fn audio_archive(&self) -> bool;
    fn upload_script(&self) -> String;
    fn record_unknown(&self) -> bool;
    fn call_log(&self) -> bool;
    /// Voice channels of a conventional system
    fn channels(&self) -> Vec<f64>;
    fn control_channels(&self) -> Vec<f64>;
    /// Only meaningful for trunked systems
    fn current_control_channel(&self) -> f64;
    fn bandplan(&self) -> Option<Bandplan>;

    fn stats(&self) -> SystemStats;
    fn stats_current(&self, time_diff: f32) -> SystemRates;

    /// Alpha tag of a radio unit, empty when unknown
    fn find_unit_tag(&self, unit_id: i64) -> String;
    fn find_talkgroup(&self, talkgroup: i64) -> Option<Talkgroup>;
    /// Talkgroups patched together with `talkgroup`
    fn talkgroup_patch(&self, talkgroup: i64) -> Vec<u64>;

    fn is_conventional(&self) -> bool {
        self.system_type().contains("conventional")
    }
}

#[derive(Debug, Clone, Default)]
pub struct GainStage {
    pub stage_name: String,
    pub value: f64,
}

/// A receiver front end
pub trait Source: Send + Sync {
    fn num(&self) -> i32;
    fn rate(&self) -> f64;
    fn center(&self) -> f64;
    fn min_hz(&self) -> f64;
    fn max_hz(&self) -> f64;
    fn error(&self) -> f64;
    fn driver(&self) -> String;
    fn device(&self) -> String;
    fn antenna(&self) -> String;
    fn gain(&self) -> f64;
    fn gain_stages(&self) -> Vec<GainStage>;
    fn analog_recorder_count(&self) -> i32;
    fn digital_recorder_count(&self) -> i32;
    fn debug_recorder_count(&self) -> i32;
    fn sigmf_recorder_count(&self) -> i32;
    fn silence_frames(&self) -> i32;
    fn recorders(&self) -> Vec<Arc<dyn Recorder>>;
}

#[derive(Debug, Clone, Default)]
pub struct RecorderStats {
    pub id: String,
    pub src_num: i32,
    pub rec_num: i32,
    pub recorder_type: String,
    pub duration: f64,
    pub count: i64,
    pub state: i32,
}

pub trait Recorder: Send + Sync {
    fn stats(&self) -> RecorderStats;
    fn freq(&self) -> f64;
}

/// Recorder assigned to a call
#[derive(Debug, Clone, Default)]
pub struct CallRecorderStats {
    pub rec_num: i32,
    pub src_num: i32,
    pub rec_state: i32,
    pub analog: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CallStats {
    pub id: String,
    pub call_num: u64,
    pub freq: f64,
    pub sys_num: i32,
    pub short_name: String,
    pub talkgroup: i64,
    pub talkgroup_tag: String,
    pub src_id: i64,
    pub elapsed: i64,
    pub length: f64,
    pub state: i32,
    pub mon_state: i32,
    pub phase2: bool,
    pub conventional: bool,
    pub encrypted: bool,
    pub emergency: bool,
    pub stop_time: i64,
    pub recorder: Option<CallRecorderStats>,
}

/// An in-progress call
pub trait Call: Send + Sync {
    fn talkgroup(&self) -> i64;
    fn current_source_id(&self) -> i64;
    fn short_name(&self) -> String;
    fn system(&self) -> Arc<dyn System>;
    fn call_num(&self) -> u64;
    fn start_time(&self) -> i64;
    fn freq(&self) -> f64;
    fn talkgroup_tag(&self) -> String;
    fn encrypted(&self) -> bool;
    fn current_length(&self) -> f64;
    fn is_conventional(&self) -> bool;
    fn stats(&self) -> CallStats;
}

/// One over-the-air transmission within a finished call
#[derive(Debug, Clone, Default)]
pub struct Transmission {
    pub source: i64,
    pub start_time: i64,
    pub stop_time: i64,
    pub sample_count: i64,
    pub spike_count: i64,
    pub error_count: i64,
    pub length: f64,
    pub filename: String,
}

/// Unit information paired with a transmission
#[derive(Debug, Clone, Default)]
pub struct CallSource {
    pub source: i64,
    pub time: i64,
    pub position: f64,
    pub emergency: bool,
    pub signal_system: String,
    pub tag: String,
}

/// Snapshot handed to plugins after a call has ended
#[derive(Debug, Clone, Default)]
pub struct CallData {
    pub call_num: u64,
    pub short_name: String,
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
    pub audio_type: String,
    pub filename: String,
    pub patched_talkgroups: Vec<u64>,
    pub transmission_list: Vec<Transmission>,
    pub transmission_source_list: Vec<CallSource>,
}

/// Decoded trunking control channel message
#[derive(Debug, Clone, Default)]
pub struct TrunkMessage {
    pub message_type: i32,
    pub opcode: i32,
    pub talkgroup: i64,
    pub source: i64,
    pub freq: f64,
}
