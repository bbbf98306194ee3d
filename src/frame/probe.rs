//! Probe Request parsing and Probe Response construction (§4.2, §4.6 Frame
//! dispatch "Probe Response filtering").

use crate::config::WscDeviceType;
use crate::macaddr::MacAddr;
use crate::rates::RateSet;

use super::wsc::WscProbeRequestInfo;
use super::{element_id, ie, Capability, MgmtHeader, MgmtSubtype, Rsne};

/// Element ID of the SSID List element (IEEE 802.11-2016 §9.4.2.77), a
/// sequence of nested SSID sub-elements.
const SSID_LIST: u8 = 55;

/// What this core needs out of a Probe Request to decide whether to answer
/// it and whether to feed it to the WSC registrar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequestInfo {
    /// `None` for a wildcard (empty) SSID IE.
    pub ssid: Option<Vec<u8>>,
    pub ssid_list: Vec<Vec<u8>>,
    /// DSSS Parameter Set channel, if the request carried one.
    pub channel: Option<u8>,
    pub wsc: Option<WscProbeRequestInfo>,
}

pub fn parse_probe_request(body: &[u8]) -> Result<ProbeRequestInfo, crate::error::FrameError> {
    let mut ssid = None;
    let mut ssid_list = Vec::new();
    let mut channel = None;
    let mut wsc = None;

    let mut iter = ie::TlvIterator::new(body);
    for (id, payload) in &mut iter {
        match id {
            element_id::SSID => {
                ssid = Some(if payload.is_empty() {
                    None
                } else {
                    Some(payload.to_vec())
                });
            }
            element_id::DSSS_PARAMETER_SET if payload.len() == 1 => {
                channel = Some(payload[0]);
            }
            SSID_LIST => {
                for (sub_id, sub_payload) in ie::TlvIterator::new(payload) {
                    if sub_id == element_id::SSID {
                        ssid_list.push(sub_payload.to_vec());
                    }
                }
            }
            element_id::VENDOR_SPECIFIC if payload.starts_with(&super::WSC_OUI_TYPE) => {
                wsc = super::wsc::parse_probe_request(&payload[super::WSC_OUI_TYPE.len()..]);
            }
            _ => {}
        }
    }
    if iter.truncated() {
        return Err(crate::error::FrameError::Truncated);
    }

    Ok(ProbeRequestInfo {
        ssid: ssid.flatten(),
        ssid_list,
        channel,
        wsc,
    })
}

/// Whether a probe request matches this AP's configured SSID/channel
/// (§4.6 "Probe Response filtering"). `None` from the closure means
/// "drop", consistent with the non-ACK/no-reply behavior of a silently
/// dropped probe.
pub fn matches(req: &ProbeRequestInfo, configured_ssid: &[u8], configured_channel: u8) -> bool {
    if let Some(ch) = req.channel {
        if ch != 0 && ch != configured_channel {
            return false;
        }
    }

    match &req.ssid {
        None => true, // wildcard
        Some(ssid) if ssid == configured_ssid => true,
        Some(_) => req.ssid_list.iter().any(|s| s == configured_ssid),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn build_probe_response(
    own_mac: MacAddr,
    da: MacAddr,
    beacon_interval: u16,
    ssid: &[u8],
    rates: &RateSet,
    channel: u8,
    rsne: &Rsne,
    pbc_active: bool,
    authorized_macs: &[MacAddr],
    uuid_r: &[u8; 16],
    device_type: &WscDeviceType,
    device_name: &str,
) -> Vec<u8> {
    let header = MgmtHeader {
        subtype: MgmtSubtype::ProbeResponse,
        da,
        sa: own_mac,
        bssid: own_mac,
    };
    let mut out = Vec::new();
    header.write(&mut out);
    super::beacon::write_fixed_fields(
        &mut out,
        beacon_interval,
        Capability {
            ess: true,
            privacy: true,
        },
    );
    super::beacon::write_common_ies(&mut out, ssid, rates, channel);
    rsne.write_ie(&mut out);
    super::wsc::build_probe_response_ie(
        &mut out,
        pbc_active,
        authorized_macs,
        uuid_r,
        device_type,
        device_name,
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ssid_ie(ssid: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        ie::write_ie(&mut out, element_id::SSID, ssid);
        out
    }

    #[test]
    fn wildcard_ssid_matches_any() {
        let req = parse_probe_request(&ssid_ie(b"")).unwrap();
        assert!(matches(&req, b"TestAP", 6));
    }

    #[test]
    fn exact_ssid_matches() {
        let req = parse_probe_request(&ssid_ie(b"TestAP")).unwrap();
        assert!(matches(&req, b"TestAP", 6));
    }

    #[test]
    fn wrong_ssid_does_not_match() {
        let req = parse_probe_request(&ssid_ie(b"Other")).unwrap();
        assert!(!matches(&req, b"TestAP", 6));
    }

    #[test]
    fn ssid_list_containing_ssid_matches() {
        let mut body = ssid_ie(b"Other");
        let mut sub = Vec::new();
        ie::write_ie(&mut sub, element_id::SSID, b"TestAP");
        ie::write_ie(&mut body, SSID_LIST, &sub);
        let req = parse_probe_request(&body).unwrap();
        assert!(matches(&req, b"TestAP", 6));
    }

    #[test]
    fn mismatched_dsss_channel_is_dropped() {
        let mut body = ssid_ie(b"");
        ie::write_ie(&mut body, element_id::DSSS_PARAMETER_SET, &[11]);
        let req = parse_probe_request(&body).unwrap();
        assert!(!matches(&req, b"TestAP", 6));
    }

    #[test]
    fn zero_dsss_channel_is_not_a_filter() {
        let mut body = ssid_ie(b"");
        ie::write_ie(&mut body, element_id::DSSS_PARAMETER_SET, &[0]);
        let req = parse_probe_request(&body).unwrap();
        assert!(matches(&req, b"TestAP", 6));
    }
}
