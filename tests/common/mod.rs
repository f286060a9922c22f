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

// In-memory host objects and a recording transport for plugin tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use trunk_status::host::*;
use trunk_status::transport::{ConnectionState, OutboundMessage, Transport, TransportError};

pub struct FakeSystem {
    pub sys_num: i32,
    pub short_name: String,
    pub system_type: String,
    pub control_channels: Vec<f64>,
    pub channels: Vec<f64>,
    pub decoderate: f64,
    pub unit_tags: HashMap<i64, String>,
    pub talkgroups: HashMap<i64, Talkgroup>,
    pub patches: HashMap<i64, Vec<u64>>,
    pub bandplan: Option<Bandplan>,
}

impl FakeSystem {
    pub fn p25(sys_num: i32, short_name: &str) -> Self {
        Self {
            sys_num,
            short_name: short_name.to_string(),
            system_type: "p25".to_string(),
            control_channels: vec![851.0125e6, 851.5125e6],
            channels: Vec::new(),
            decoderate: 38.456,
            unit_tags: HashMap::new(),
            talkgroups: HashMap::new(),
            patches: HashMap::new(),
            bandplan: None,
        }
    }

    pub fn smartnet(sys_num: i32, short_name: &str) -> Self {
        Self {
            system_type: "smartnet".to_string(),
            control_channels: vec![856.2375e6],
            bandplan: Some(Bandplan {
                bandplan: "800_reband".to_string(),
                bandfreq: 800,
                base: 851.0125,
                high: 867.0,
                spacing: 0.025,
                offset: 380,
            }),
            ..Self::p25(sys_num, short_name)
        }
    }

    pub fn conventional(sys_num: i32, short_name: &str) -> Self {
        Self {
            system_type: "conventional".to_string(),
            control_channels: Vec::new(),
            channels: vec![460.025e6],
            ..Self::p25(sys_num, short_name)
        }
    }

    pub fn with_unit_tag(mut self, unit: i64, tag: &str) -> Self {
        self.unit_tags.insert(unit, tag.to_string());
        self
    }

    pub fn with_talkgroup(mut self, number: i64, alpha_tag: &str) -> Self {
        self.talkgroups.insert(
            number,
            Talkgroup {
                number,
                alpha_tag: alpha_tag.to_string(),
                ..Default::default()
            },
        );
        self
    }

    pub fn with_patch(mut self, talkgroup: i64, patched: Vec<u64>) -> Self {
        self.patches.insert(talkgroup, patched);
        self
    }
}

impl System for FakeSystem {
    fn sys_num(&self) -> i32 {
        self.sys_num
    }
    fn short_name(&self) -> String {
        self.short_name.clone()
    }
    fn system_type(&self) -> String {
        self.system_type.clone()
    }
    fn talkgroups_file(&self) -> String {
        format!("{}.csv", self.short_name)
    }
    fn qpsk_mod(&self) -> bool {
        false
    }
    fn squelch_db(&self) -> f64 {
        -160.0
    }
    fn analog_levels(&self) -> f64 {
        8.0
    }
    fn digital_levels(&self) -> f64 {
        1.0
    }
    fn audio_archive(&self) -> bool {
        true
    }
    fn upload_script(&self) -> String {
        String::new()
    }
    fn record_unknown(&self) -> bool {
        true
    }
    fn call_log(&self) -> bool {
        false
    }
    fn channels(&self) -> Vec<f64> {
        self.channels.clone()
    }
    fn control_channels(&self) -> Vec<f64> {
        self.control_channels.clone()
    }
    fn current_control_channel(&self) -> f64 {
        self.control_channels.first().copied().unwrap_or(0.0)
    }
    fn bandplan(&self) -> Option<Bandplan> {
        self.bandplan.clone()
    }
    fn stats(&self) -> SystemStats {
        SystemStats {
            id: self.sys_num,
            name: self.short_name.clone(),
            system_type: self.system_type.clone(),
            sysid: 0x3ab,
            wacn: 0xbee00,
            nac: 0x3a1,
        }
    }
    fn stats_current(&self, _time_diff: f32) -> SystemRates {
        SystemRates {
            id: self.sys_num,
            decoderate: self.decoderate,
        }
    }
    fn find_unit_tag(&self, unit_id: i64) -> String {
        self.unit_tags.get(&unit_id).cloned().unwrap_or_default()
    }
    fn find_talkgroup(&self, talkgroup: i64) -> Option<Talkgroup> {
        self.talkgroups.get(&talkgroup).cloned()
    }
    fn talkgroup_patch(&self, talkgroup: i64) -> Vec<u64> {
        self.patches.get(&talkgroup).cloned().unwrap_or_default()
    }
}

pub struct FakeRecorder {
    pub stats: RecorderStats,
    pub freq: f64,
}

impl Recorder for FakeRecorder {
    fn stats(&self) -> RecorderStats {
        self.stats.clone()
    }
    fn freq(&self) -> f64 {
        self.freq
    }
}

pub struct FakeSource {
    pub num: i32,
    pub recorders: Vec<Arc<dyn Recorder>>,
}

impl FakeSource {
    pub fn with_recorders(num: i32, count: i32) -> Self {
        let recorders = (0..count)
            .map(|rec_num| {
                Arc::new(FakeRecorder {
                    stats: RecorderStats {
                        id: format!("{}_{}", num, rec_num),
                        src_num: num,
                        rec_num,
                        recorder_type: "P25".to_string(),
                        duration: 12.3456,
                        count: 4,
                        state: 4,
                    },
                    freq: 852.3e6,
                }) as Arc<dyn Recorder>
            })
            .collect();

        Self { num, recorders }
    }
}

impl Source for FakeSource {
    fn num(&self) -> i32 {
        self.num
    }
    fn rate(&self) -> f64 {
        2_400_000.0
    }
    fn center(&self) -> f64 {
        852.0e6
    }
    fn min_hz(&self) -> f64 {
        850.8e6
    }
    fn max_hz(&self) -> f64 {
        853.2e6
    }
    fn error(&self) -> f64 {
        0.0
    }
    fn driver(&self) -> String {
        "osmosdr".to_string()
    }
    fn device(&self) -> String {
        "rtl=0".to_string()
    }
    fn antenna(&self) -> String {
        String::new()
    }
    fn gain(&self) -> f64 {
        40.0
    }
    fn gain_stages(&self) -> Vec<GainStage> {
        vec![GainStage {
            stage_name: "LNA".to_string(),
            value: 32.0,
        }]
    }
    fn analog_recorder_count(&self) -> i32 {
        0
    }
    fn digital_recorder_count(&self) -> i32 {
        self.recorders.len() as i32
    }
    fn debug_recorder_count(&self) -> i32 {
        0
    }
    fn sigmf_recorder_count(&self) -> i32 {
        0
    }
    fn silence_frames(&self) -> i32 {
        0
    }
    fn recorders(&self) -> Vec<Arc<dyn Recorder>> {
        self.recorders.clone()
    }
}

pub struct FakeCall {
    pub system: Arc<dyn System>,
    pub call_num: u64,
    pub talkgroup: i64,
    pub unit: i64,
    pub length: f64,
    pub conventional: bool,
}

impl FakeCall {
    pub fn new(system: Arc<dyn System>, call_num: u64, talkgroup: i64, unit: i64) -> Self {
        Self {
            system,
            call_num,
            talkgroup,
            unit,
            length: 1.5,
            conventional: false,
        }
    }
}

impl Call for FakeCall {
    fn talkgroup(&self) -> i64 {
        self.talkgroup
    }
    fn current_source_id(&self) -> i64 {
        self.unit
    }
    fn short_name(&self) -> String {
        self.system.short_name()
    }
    fn system(&self) -> Arc<dyn System> {
        self.system.clone()
    }
    fn call_num(&self) -> u64 {
        self.call_num
    }
    fn start_time(&self) -> i64 {
        1_700_000_000
    }
    fn freq(&self) -> f64 {
        852.3e6
    }
    fn talkgroup_tag(&self) -> String {
        format!("TG {}", self.talkgroup)
    }
    fn encrypted(&self) -> bool {
        false
    }
    fn current_length(&self) -> f64 {
        self.length
    }
    fn is_conventional(&self) -> bool {
        self.conventional
    }
    fn stats(&self) -> CallStats {
        CallStats {
            id: format!("{}_{}_{}", self.system.sys_num(), self.talkgroup, self.call_num),
            call_num: self.call_num,
            freq: self.freq(),
            sys_num: self.system.sys_num(),
            short_name: self.system.short_name(),
            talkgroup: self.talkgroup,
            talkgroup_tag: self.talkgroup_tag(),
            src_id: self.unit,
            elapsed: 2,
            length: self.length,
            state: 1,
            mon_state: 0,
            conventional: self.conventional,
            ..Default::default()
        }
    }
}

/// Transport that records every published message
///
/// `state` is shared so tests can bring the connection up or down after
/// handing the transport to the plugin.
#[derive(Clone)]
pub struct RecordingTransport {
    pub sent: Arc<Mutex<Vec<OutboundMessage>>>,
    pub state: Arc<Mutex<ConnectionState>>,
    pub connect_succeeds: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            connect_succeeds: true,
        }
    }

    /// Broker that never answers
    pub fn unreachable() -> Self {
        Self {
            connect_succeeds: false,
            ..Self::new()
        }
    }

    pub fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap() = state;
    }

    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn topics(&self) -> Vec<String> {
        self.messages().into_iter().map(|m| m.topic).collect()
    }

    pub fn on_topic(&self, topic: &str) -> Vec<OutboundMessage> {
        self.messages()
            .into_iter()
            .filter(|m| m.topic == topic)
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

impl Transport for RecordingTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        if self.connect_succeeds {
            self.set_state(ConnectionState::Connected);
            Ok(())
        } else {
            self.set_state(ConnectionState::Connecting);
            Err(TransportError::NotConnected)
        }
    }

    fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap()
    }

    fn publish(&self, message: OutboundMessage) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        self.set_state(ConnectionState::Disconnected);
        Ok(())
    }

    fn transport_type(&self) -> &str {
        "recording"
    }
}

pub fn payload(message: &OutboundMessage) -> serde_json::Value {
    serde_json::from_slice(&message.payload).unwrap()
}

pub fn host_config() -> Arc<HostConfig> {
    Arc::new(HostConfig {
        capture_dir: "/var/lib/trunk-recorder".to_string(),
        call_timeout: 3,
        instance_id: "tr-test".to_string(),
        ..Default::default()
    })
}
