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

// Static code-to-name tables for trunking opcodes and host enumerations

/// Short name and description of a P25 trunking opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub name: &'static str,
    pub description: &'static str,
}

/// Returned for any opcode outside the table
pub const UNIDENTIFIED_OPCODE: Opcode = Opcode {
    name: "UNK",
    description: "Unidentified",
};

/// Placeholder for unknown message types and states
pub const UNKNOWN: &str = "UNKNOWN";

const OPCODES: [(&str, &str); 64] = [
    ("GRP_V_CH_GRANT", "Group Voice Channel Grant"),
    ("RSVD_01", "Reserved 0x01"),
    ("GRP_V_CH_GRANT_UPDT", "Group Voice Channel Grant Update"),
    ("GRP_V_CH_GRANT_UPDT_EXP", "Group Voice Channel Update - Explicit"),
    ("UU_V_CH_GRANT", "Unit To Unit Voice Channel Grant"),
    ("UU_ANS_REQ", "Unit To Unit Answer Request"),
    ("UU_V_CH_GRANT_UPDT", "Unit to Unit Voice Channel Grant Update"),
    ("RSVD_07", "Reserved 0x07"),
    ("TELE_INT_CH_GRANT", "Telephone Interconnect Voice Channel Grant"),
    ("TELE_INT_CH_GRANT_UPDT", "Telephone Interconnect Voice Channel Grant Update"),
    ("TELE_INT_ANS_REQ", "Telephone Interconnect Answer Request"),
    ("RSVD_0B", "Reserved 0x0b"),
    ("RSVD_0C", "Reserved 0x0c"),
    ("RSVD_0D", "Reserved 0x0d"),
    ("RSVD_0E", "Reserved 0x0e"),
    ("RSVD_0F", "Reserved 0x0f"),
    ("OBS_10", "Obsolete 0x10"),
    ("OBS_11", "Obsolete 0x11"),
    ("OBS_12", "Obsolete 0x12"),
    ("OBS_13", "Obsolete 0x13"),
    ("SN-DATA_CHN_GNT", "SNDCP Data Channel Grant"),
    ("SN-DATA_PAGE_REQ", "SNDCP Data Page Request"),
    ("SN-DATA_CHN_ANN_EXP", "SNDCP Data Channel Announcement - Explicit"),
    ("RSVD_17", "Reserved 0x17"),
    ("STS_UPDT", "Status Update"),
    ("RSVD_19", "Reserved 0x19"),
    ("STS_Q", "Status Query"),
    ("RSVD_1B", "Reserved 0x1b"),
    ("MSG_UPDT", "Message Update"),
    ("RAD_MON_CMD", "Radio Unit Monitor Command"),
    ("RSVD_1E", "Reserved 0x1e"),
    ("CALL_ALRT", "Call Alert"),
    ("ACK_RSP_FNE", "Acknowledge Response - FNE"),
    ("QUE_RSP", "Queued Response"),
    ("RSVD_22", "Reserved 0x22"),
    ("RSVD_23", "Reserved 0x23"),
    ("EXT_FNCT_CMD", "Extended Function Command"),
    ("RSVD_25", "Reserved 0x25"),
    ("RSVD_26", "Reserved 0x26"),
    ("DENY_RSP", "Deny Response"),
    ("GRP_AFF_RSP", "Group Affiliation Response"),
    ("SCCB_EXP", "Secondary Control Channel Broadcast - Explicit"),
    ("GRP_AFF_Q", "Group Affiliation Query"),
    ("LOC_REG_RSP", "Location Registration Response"),
    ("U_REG_RSP", "Unit Registration Response"),
    ("U_REG_CMD", "Unit Registration Command"),
    ("AUTH_CMD", "Authentication Command"),
    ("U_DE_REG_ACK", "De-Registration Acknowledge"),
    ("SYNC_BCST", "Sync Broadcast / Patch"),
    ("AUTH_DMD", "Authentication Demand"),
    ("AUTH_FNE_RESP", "Authentication FNE Response"),
    ("IDEN_UP_TDMA", "Identifier Update for TDMA"),
    ("IDEN_UP_VU", "Identifier Update for VHF/UHF Bands"),
    ("TIME_DATE_ANN", "Time and Date Announcement"),
    ("ROAM_ADDR_CMD", "Roaming Address Command"),
    ("ROAM_ADDR_UPDT", "Roaming Address Update"),
    ("SYS_SRV_BCST", "System Service Broadcast"),
    ("SCCB", "Secondary Control Channel Broadcast"),
    ("RFSS_STS_BCST", "RFSS Status Broadcast"),
    ("NET_STS_BCST", "Network Status Broadcast"),
    ("ADJ_STS_BCST", "Adjacent Status Broadcast"),
    ("IDEN_UP", "Identifier Update"),
    ("P_PARM_BCST", "Protection Parameter Broadcast"),
    ("P_PARM_UPDT", "Protection Parameter Update"),
];

/// Look up a trunking opcode
pub fn opcode(code: i32) -> Opcode {
    usize::try_from(code)
        .ok()
        .and_then(|index| OPCODES.get(index))
        .map(|&(name, description)| Opcode { name, description })
        .unwrap_or(UNIDENTIFIED_OPCODE)
}

/// Name of a host trunk message category
pub fn message_type(code: i32) -> &'static str {
    match code {
        0 => "GRANT",
        1 => "STATUS",
        2 => "UPDATE",
        3 => "CONTROL_CHANNEL",
        4 => "REGISTRATION",
        5 => "DEREGISTRATION",
        6 => "AFFILIATION",
        7 => "SYSID",
        8 => "ACKNOWLEDGE",
        9 => "LOCATION",
        10 => "PATCH_ADD",
        11 => "PATCH_DELETE",
        12 => "DATA_GRANT",
        13 => "UU_ANS_REQ",
        14 => "UU_V_GRANT",
        15 => "UU_V_UPDATE",
        _ => UNKNOWN,
    }
}

/// Name of a call or recorder state
pub fn call_state(code: i32) -> &'static str {
    match code {
        0 => "MONITORING",
        1 => "RECORDING",
        2 => "INACTIVE",
        3 => "ACTIVE",
        4 => "IDLE",
        6 => "STOPPED",
        7 => "AVAILABLE",
        8 => "IGNORE",
        _ => UNKNOWN,
    }
}

/// Name of a call monitoring state
pub fn monitor_state(code: i32) -> &'static str {
    match code {
        0 => "UNSPECIFIED",
        1 => "UNKNOWN_TG",
        2 => "IGNORED_TG",
        3 => "NO_SOURCE",
        4 => "NO_RECORDER",
        5 => "ENCRYPTED",
        6 => "DUPLICATE",
        7 => "SUPERSEDED",
        _ => UNKNOWN,
    }
}

/// Uppercase hexadecimal, zero-padded to `places` digits
///
/// Values are taken as 32-bit: a negative id prints as its 8-digit two's
/// complement.
pub fn int_to_hex(value: i64, places: usize) -> String {
    format!("{:0width$X}", value as u32, width = places)
}
