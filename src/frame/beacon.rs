//! Beacon head/tail construction (§4.2). The kernel `start_ap`/`set_beacon`
//! commands (§6) take the beacon as two separately-built buffers; this
//! module builds exactly those two buffers, split where spec.md §4.2 says
//! the head ends and the tail begins (after the DSSS Parameter Set, before
//! the RSNE).

use crate::macaddr::MacAddr;
use crate::rates::RateSet;

use super::{element_id, ie, Capability, MgmtHeader, MgmtSubtype};

/// Fixed fields shared by beacons and probe responses, after the 24-byte
/// MAC header: an 8-byte all-zero Timestamp (kernel fills it in), the
/// 2-byte Beacon Interval, and the 2-byte Capability field (§4.2).
pub fn write_fixed_fields(out: &mut Vec<u8>, beacon_interval: u16, capability: Capability) {
    out.extend_from_slice(&[0u8; 8]); // timestamp
    out.extend_from_slice(&beacon_interval.to_le_bytes());
    out.extend_from_slice(&capability.to_bits().to_le_bytes());
}

/// Builds the SSID / Supported Rates / DSSS Parameter Set IEs common to
/// beacons and probe responses, in ascending Element-ID order (§4.2).
pub fn write_common_ies(out: &mut Vec<u8>, ssid: &[u8], rates: &RateSet, channel: u8) {
    ie::write_ie(out, element_id::SSID, ssid);
    ie::write_ie(out, element_id::SUPPORTED_RATES, &ie::encode_supported_rates(rates));
    ie::write_ie(out, element_id::DSSS_PARAMETER_SET, &[channel]);
}

/// Builds the beacon head: MAC header + fixed fields + SSID/Rates/DSSS IEs
/// (§4.2, §6 `start_ap`/`set_beacon`).
pub fn build_beacon_head(
    own_mac: MacAddr,
    beacon_interval: u16,
    ssid: &[u8],
    rates: &RateSet,
    channel: u8,
) -> Vec<u8> {
    let header = MgmtHeader {
        subtype: MgmtSubtype::Beacon,
        da: MacAddr::BROADCAST,
        sa: own_mac,
        bssid: own_mac,
    };
    let mut out = Vec::with_capacity(MgmtHeader::LEN + 12 + ssid.len() + 12);
    header.write(&mut out);
    write_fixed_fields(&mut out, beacon_interval, Capability { ess: true, privacy: true });
    write_common_ies(&mut out, ssid, rates, channel);
    out
}

/// Builds the beacon tail: RSNE then WSC IE (§4.2).
pub fn build_beacon_tail(
    rsne: &crate::frame::Rsne,
    pbc_active: bool,
    authorized_macs: &[MacAddr],
) -> Vec<u8> {
    let mut out = Vec::new();
    rsne.write_ie(&mut out);
    super::wsc::build_beacon_ie(&mut out, pbc_active, authorized_macs);
    out
}
