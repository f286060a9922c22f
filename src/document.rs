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

// Document builders: read host objects and fill the protocol structs
//
// Builders never fail. Optional host data that is missing is reported as an
// empty string or -1, and unknown codes map to the lookup placeholders.

use crate::host::{Call, CallData, CallSource, HostConfig, Recorder, Source, System, TrunkMessage};
use crate::lookup;
use crate::protocol::*;
use std::sync::Arc;

/// Sentinel for numeric fields the host did not provide
pub const ABSENT: i32 = -1;

/// Round to two decimal places by formatting and re-parsing
///
/// Used for lengths, durations and positions so consumers do not see
/// long repeating fractions.
pub fn round_two(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}

/// Comma separated talkgroup ids, empty when there are none
pub fn patches_to_str(talkgroups: &[u64]) -> String {
    talkgroups
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

pub fn system_info(system: &dyn System) -> SystemInfo {
    let stats = system.stats();
    SystemInfo {
        sys_num: stats.id,
        sys_name: stats.name,
        system_type: stats.system_type,
        sysid: lookup::int_to_hex(stats.sysid, 0),
        wacn: lookup::int_to_hex(stats.wacn, 0),
        nac: lookup::int_to_hex(stats.nac, 0),
    }
}

pub fn systems_info(systems: &[Arc<dyn System>]) -> Vec<SystemInfo> {
    systems.iter().map(|s| system_info(s.as_ref())).collect()
}

/// Decode rates for trunked systems
///
/// Conventional systems have no control channel and are skipped.
pub fn system_rates(systems: &[Arc<dyn System>], time_diff: f32) -> Vec<SystemRate> {
    systems
        .iter()
        .filter(|system| !system.is_conventional())
        .map(|system| {
            let rates = system.stats_current(time_diff);
            SystemRate {
                sys_num: rates.id,
                sys_name: system.short_name(),
                decoderate: round_two(rates.decoderate),
                decoderate_interval: time_diff,
                control_channel: system.current_control_channel(),
            }
        })
        .collect()
}

pub fn source_config(source: &dyn Source) -> SourceConfig {
    let gain_stages = source
        .gain_stages()
        .into_iter()
        .map(|stage| (format!("{}_gain", stage.stage_name), stage.value))
        .collect();

    SourceConfig {
        source_num: source.num(),
        rate: source.rate(),
        center: source.center(),
        min_hz: source.min_hz(),
        max_hz: source.max_hz(),
        error: source.error(),
        driver: source.driver(),
        device: source.device(),
        antenna: source.antenna(),
        gain: source.gain(),
        gain_stages,
        analog_recorders: source.analog_recorder_count(),
        digital_recorders: source.digital_recorder_count(),
        debug_recorders: source.debug_recorder_count(),
        sigmf_recorders: source.sigmf_recorder_count(),
        silence_frames: source.silence_frames(),
    }
}

pub fn system_config(system: &dyn System) -> SystemConfig {
    let system_type = system.system_type();

    // Conventional systems list voice channels; trunked ones their control channels
    let conventional = system_type == "conventional" || system_type == "conventionalP25";
    let (channels, control_channel) = if conventional {
        (system.channels(), None)
    } else {
        (system.control_channels(), Some(system.current_control_channel()))
    };

    let bandplan = if system_type == "smartnet" {
        system.bandplan().map(|plan| BandplanConfig {
            bandplan: plan.bandplan,
            bandfreq: plan.bandfreq,
            bandplan_base: plan.base,
            bandplan_high: plan.high,
            bandplan_spacing: plan.spacing,
            bandplan_offset: plan.offset,
        })
    } else {
        None
    };

    SystemConfig {
        sys_num: system.sys_num(),
        sys_name: system.short_name(),
        system_type,
        talkgroups_file: system.talkgroups_file(),
        qpsk: system.qpsk_mod(),
        squelch_db: system.squelch_db(),
        analog_levels: system.analog_levels(),
        digital_levels: system.digital_levels(),
        audio_archive: system.audio_archive(),
        upload_script: system.upload_script(),
        record_unknown: system.record_unknown(),
        call_log: system.call_log(),
        control_channel,
        channels,
        bandplan,
    }
}

pub fn config_snapshot(
    config: &HostConfig,
    sources: &[Arc<dyn Source>],
    systems: &[Arc<dyn System>],
) -> ConfigSnapshot {
    ConfigSnapshot {
        sources: sources.iter().map(|s| source_config(s.as_ref())).collect(),
        systems: systems.iter().map(|s| system_config(s.as_ref())).collect(),
        capture_dir: config.capture_dir.clone(),
        upload_server: config.upload_server.clone(),
        call_timeout: config.call_timeout,
        log_file: config.log_file,
        instance_id: config.instance_id.clone(),
        instance_key: config.instance_key.clone(),
        broadcast_signals: config.broadcast_signals.then_some(true),
    }
}

pub fn recorder_info(recorder: &dyn Recorder) -> RecorderInfo {
    let stats = recorder.stats();
    RecorderInfo {
        id: stats.id,
        src_num: stats.src_num,
        rec_num: stats.rec_num,
        recorder_type: stats.recorder_type,
        duration: round_two(stats.duration),
        freq: recorder.freq(),
        count: stats.count,
        rec_state: stats.state,
        rec_state_type: lookup::call_state(stats.state).to_string(),
    }
}

/// Every recorder of every source, in source order
pub fn recorders_info(sources: &[Arc<dyn Source>]) -> Vec<RecorderInfo> {
    sources
        .iter()
        .flat_map(|source| source.recorders())
        .map(|recorder| recorder_info(recorder.as_ref()))
        .collect()
}

pub fn call_info(call: &dyn Call) -> CallInfo {
    let stats = call.stats();
    let unit_alpha_tag = call.system().find_unit_tag(stats.src_id);

    let (rec_num, src_num, rec_state, rec_state_type, analog) = match &stats.recorder {
        Some(rec) => (
            rec.rec_num,
            rec.src_num,
            rec.rec_state,
            lookup::call_state(rec.rec_state).to_string(),
            rec.analog,
        ),
        None => (ABSENT, ABSENT, ABSENT, String::new(), false),
    };

    CallInfo {
        id: stats.id,
        call_num: stats.call_num,
        freq: stats.freq,
        sys_num: stats.sys_num,
        sys_name: stats.short_name,
        talkgroup: stats.talkgroup,
        talkgroup_alpha_tag: stats.talkgroup_tag,
        unit: stats.src_id,
        unit_alpha_tag,
        elapsed: stats.elapsed,
        length: round_two(stats.length),
        call_state: stats.state,
        call_state_type: lookup::call_state(stats.state).to_string(),
        mon_state: stats.mon_state,
        mon_state_type: lookup::monitor_state(stats.mon_state).to_string(),
        phase2: stats.phase2,
        conventional: stats.conventional,
        encrypted: stats.encrypted,
        emergency: stats.emergency,
        stop_time: stats.stop_time,
        rec_num,
        src_num,
        rec_state,
        rec_state_type,
        analog,
    }
}

/// Active calls worth reporting
///
/// Conventional channels sit in a call permanently; they are only listed
/// while audio is actually being recorded.
pub fn active_calls(calls: &[Arc<dyn Call>]) -> Vec<CallInfo> {
    calls
        .iter()
        .filter(|call| call.current_length() > 0.0 || !call.is_conventional())
        .map(|call| call_info(call.as_ref()))
        .collect()
}

pub fn unit_call(call: &dyn Call) -> UnitCall {
    let system = call.system();
    let talkgroup = call.talkgroup();
    let unit = call.current_source_id();

    UnitCall {
        sys_num: system.sys_num(),
        sys_name: call.short_name(),
        call_num: call.call_num(),
        start_time: call.start_time(),
        freq: call.freq(),
        unit,
        unit_alpha_tag: system.find_unit_tag(unit),
        talkgroup,
        talkgroup_alpha_tag: call.talkgroup_tag(),
        talkgroup_patches: patches_to_str(&system.talkgroup_patch(talkgroup)),
        encrypted: call.encrypted(),
    }
}

pub fn call_end(call_info: &CallData) -> CallEnd {
    CallEnd {
        call_num: call_info.call_num,
        sys_name: call_info.short_name.clone(),
        start_time: call_info.start_time,
        stop_time: call_info.stop_time,
        length: round_two(call_info.length),
        process_call_time: call_info.process_call_time,
        retry_attempt: call_info.retry_attempt,
        error_count: call_info.error_count,
        spike_count: call_info.spike_count,
        freq: call_info.freq,
        encrypted: call_info.encrypted,
        emergency: call_info.emergency,
        tdma_slot: call_info.tdma_slot,
        phase2_tdma: call_info.phase2_tdma,
        talkgroup: call_info.talkgroup,
        talkgroup_tag: call_info.talkgroup_tag.clone(),
        talkgroup_alpha_tag: call_info.talkgroup_alpha_tag.clone(),
        talkgroup_description: call_info.talkgroup_description.clone(),
        talkgroup_group: call_info.talkgroup_group.clone(),
        talkgroup_patches: patches_to_str(&call_info.patched_talkgroups),
        audio_type: call_info.audio_type.clone(),
    }
}

/// One document per transmission of a finished call
///
/// `transmission_source_list` runs parallel to `transmission_list`; a
/// missing entry yields default unit details.
pub fn unit_transmissions(call_info: &CallData) -> Vec<UnitTransmission> {
    let patches = patches_to_str(&call_info.patched_talkgroups);
    let missing = CallSource::default();

    call_info
        .transmission_list
        .iter()
        .enumerate()
        .map(|(index, transmission)| {
            let source = call_info
                .transmission_source_list
                .get(index)
                .unwrap_or(&missing);

            UnitTransmission {
                call_num: call_info.call_num,
                sys_name: call_info.short_name.clone(),
                unit: transmission.source,
                unit_alpha_tag: source.tag.clone(),
                start_time: transmission.start_time,
                stop_time: transmission.stop_time,
                sample_count: transmission.sample_count,
                spike_count: transmission.spike_count,
                error_count: transmission.error_count,
                freq: call_info.freq,
                length: round_two(transmission.length),
                transmission_filename: transmission.filename.clone(),
                call_filename: call_info.filename.clone(),
                position: round_two(source.position),
                talkgroup: call_info.talkgroup,
                talkgroup_alpha_tag: call_info.talkgroup_alpha_tag.clone(),
                talkgroup_description: call_info.talkgroup_description.clone(),
                talkgroup_group: call_info.talkgroup_group.clone(),
                talkgroup_patches: patches.clone(),
                encrypted: call_info.encrypted,
                emergency: source.emergency,
                signal_system: source.signal_system.clone(),
            }
        })
        .collect()
}

/// Unit event without talkgroup (on, off, ackresp, data)
pub fn unit_event(system: &dyn System, unit: i64) -> UnitEvent {
    UnitEvent {
        sys_num: system.sys_num(),
        sys_name: system.short_name(),
        unit,
        unit_alpha_tag: system.find_unit_tag(unit),
        talkgroup: None,
        talkgroup_alpha_tag: None,
        talkgroup_patches: None,
    }
}

/// Unit event tied to a talkgroup (join, ans_req, location)
pub fn unit_talkgroup_event(
    system: &dyn System,
    unit: i64,
    talkgroup: i64,
    with_patches: bool,
) -> UnitEvent {
    let alpha_tag = system
        .find_talkgroup(talkgroup)
        .map(|tg| tg.alpha_tag)
        .unwrap_or_default();

    UnitEvent {
        talkgroup: Some(talkgroup),
        talkgroup_alpha_tag: Some(alpha_tag),
        talkgroup_patches: with_patches.then(|| patches_to_str(&system.talkgroup_patch(talkgroup))),
        ..unit_event(system, unit)
    }
}

pub fn trunk_message(system: &dyn System, message: &TrunkMessage) -> TrunkMessageInfo {
    let opcode = lookup::opcode(message.opcode);
    TrunkMessageInfo {
        sys_num: system.sys_num(),
        sys_name: system.short_name(),
        trunk_msg: message.message_type,
        trunk_msg_type: lookup::message_type(message.message_type).to_string(),
        opcode: lookup::int_to_hex(i64::from(message.opcode), 2),
        opcode_type: opcode.name.to_string(),
        opcode_desc: opcode.description.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Transmission;

    #[test]
    fn test_round_two_is_stable() {
        assert_eq!(round_two(12.3456), 12.35);
        assert_eq!(round_two(12.345), round_two(12.345));
        assert_eq!(round_two(3.0), 3.0);
        assert_eq!(round_two(-1.006), -1.01);
    }

    #[test]
    fn test_patches_to_str() {
        assert_eq!(patches_to_str(&[]), "");
        assert_eq!(patches_to_str(&[101]), "101");
        assert_eq!(patches_to_str(&[101, 202, 303]), "101,202,303");
    }

    #[test]
    fn test_call_end_rounds_length() {
        let data = CallData {
            call_num: 7,
            short_name: "metro".to_string(),
            length: 4.5678,
            patched_talkgroups: vec![101, 102],
            ..Default::default()
        };
        let end = call_end(&data);
        assert_eq!(end.length, 4.57);
        assert_eq!(end.talkgroup_patches, "101,102");
        assert_eq!(end.sys_name, "metro");
    }

    #[test]
    fn test_transmissions_tolerate_short_source_list() {
        let data = CallData {
            transmission_list: vec![
                Transmission {
                    source: 1,
                    length: 1.234,
                    ..Default::default()
                },
                Transmission {
                    source: 2,
                    ..Default::default()
                },
            ],
            transmission_source_list: vec![CallSource {
                source: 1,
                tag: "Engine 1".to_string(),
                position: 0.126,
                emergency: true,
                ..Default::default()
            }],
            ..Default::default()
        };

        let docs = unit_transmissions(&data);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].unit_alpha_tag, "Engine 1");
        assert_eq!(docs[0].position, 0.13);
        assert_eq!(docs[0].length, 1.23);
        assert!(docs[0].emergency);
        assert_eq!(docs[1].unit, 2);
        assert_eq!(docs[1].unit_alpha_tag, "");
        assert!(!docs[1].emergency);
    }
}
