//! WSC (Wi-Fi Simple Configuration) TLV attributes carried inside a Vendor
//! Specific IE (§4.2 "WSC IE contents"). Attribute IDs and enumerated
//! values below are the ones WSC 2.0.5 and the iwd lineage this crate is
//! descended from actually use on the wire.
//!
//! Simplification: the real WSC spec nests the "Version2" indicator inside
//! a WFA Vendor Extension attribute with its own OUI and sub-element TLV;
//! this crate reproduces that nesting (see `VENDOR_EXT_WFA_OUI`) rather than
//! flattening it, since it is cheap to get right and other implementations
//! parse it that way.

use crate::error::FrameError;
use crate::macaddr::MacAddr;

use super::element_id;
use super::ie::TlvIterator;
use super::WSC_OUI_TYPE;

mod attr {
    pub const VERSION: u16 = 0x104a;
    pub const WSC_STATE: u16 = 0x1044;
    pub const UUID_E: u16 = 0x1047;
    pub const UUID_R: u16 = 0x1048;
    pub const VENDOR_EXTENSION: u16 = 0x1049;
    pub const DEVICE_NAME: u16 = 0x1011;
    pub const CONFIG_METHODS: u16 = 0x1008;
    pub const SELECTED_REGISTRAR: u16 = 0x1041;
    pub const DEVICE_PASSWORD_ID: u16 = 0x1012;
    pub const SELECTED_REGISTRAR_CONFIG_METHODS: u16 = 0x1053;
    pub const REQUEST_TYPE: u16 = 0x103a;
    pub const RESPONSE_TYPE: u16 = 0x103b;
    pub const PRIMARY_DEVICE_TYPE: u16 = 0x1054;
}

const VENDOR_EXT_WFA_OUI: [u8; 3] = [0x00, 0x37, 0x2a];
const VENDOR_EXT_SUBELEM_VERSION2: u8 = 0x00;

const WSC_VERSION_1_0: u8 = 0x10;
const WSC_VERSION2_2_0: u8 = 0x20;

/// Device Password ID values (WSC 2.0.5 §12). Only PUSH_BUTTON is produced
/// or required by this core (PBC, spec.md §1/§4.3).
pub const DEVICE_PASSWORD_ID_PUSH_BUTTON: u16 = 0x0004;

/// Config Methods bitmask (WSC 2.0.5 §12). Only the Push Button bit is ever
/// set by this core.
pub const CONFIG_METHOD_PUSH_BUTTON: u16 = 0x0080;

const WSC_STATE_NOT_CONFIGURED: u8 = 0x01;
const WSC_STATE_CONFIGURED: u8 = 0x02;

/// WSC request types (iwd naming, WSC 2.0.5 §12). Only the enrollee-acting-
/// as-802.1X-supplicant flow is supported (§4.4 WSC path).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WscRequestType {
    EnrolleeInfoOnly,
    EnrolleeOpen8021x,
    Registrar,
    WlanManagerRegistrar,
}

impl WscRequestType {
    fn value(self) -> u8 {
        match self {
            WscRequestType::EnrolleeInfoOnly => 0x00,
            WscRequestType::EnrolleeOpen8021x => 0x01,
            WscRequestType::Registrar => 0x02,
            WscRequestType::WlanManagerRegistrar => 0x03,
        }
    }

    fn from_value(v: u8) -> Option<Self> {
        Some(match v {
            0x00 => WscRequestType::EnrolleeInfoOnly,
            0x01 => WscRequestType::EnrolleeOpen8021x,
            0x02 => WscRequestType::Registrar,
            0x03 => WscRequestType::WlanManagerRegistrar,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WscResponseType {
    EnrolleeInfoOnly,
    EnrolleeOpen8021x,
    Ap,
    Registrar,
}

impl WscResponseType {
    fn value(self) -> u8 {
        match self {
            WscResponseType::EnrolleeInfoOnly => 0x00,
            WscResponseType::EnrolleeOpen8021x => 0x01,
            WscResponseType::Ap => 0x02,
            WscResponseType::Registrar => 0x03,
        }
    }
}

/// A single attribute walk over a WSC TLV body (2-byte big-endian type, 2-
/// byte big-endian length), the WSC analogue of `TlvIterator`.
struct WscAttrIterator<'a> {
    buf: &'a [u8],
}

impl<'a> Iterator for WscAttrIterator<'a> {
    type Item = (u16, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.buf.len() < 4 {
            return None;
        }
        let id = u16::from_be_bytes([self.buf[0], self.buf[1]]);
        let len = u16::from_be_bytes([self.buf[2], self.buf[3]]) as usize;
        if self.buf.len() < 4 + len {
            return None;
        }
        let payload = &self.buf[4..4 + len];
        self.buf = &self.buf[4 + len..];
        Some((id, payload))
    }
}

fn write_attr(out: &mut Vec<u8>, id: u16, payload: &[u8]) {
    out.extend_from_slice(&id.to_be_bytes());
    out.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    out.extend_from_slice(payload);
}

/// Finds this frame body's WSC Vendor Specific IE, if any, returning the
/// bytes after the WFA OUI + vendor type (i.e. the WSC attribute stream).
pub fn find_wsc_ie(body: &[u8]) -> Result<Option<&[u8]>, FrameError> {
    let mut iter = TlvIterator::new(body);
    for (id, payload) in &mut iter {
        if id == element_id::VENDOR_SPECIFIC && payload.starts_with(&WSC_OUI_TYPE) {
            return Ok(Some(&payload[WSC_OUI_TYPE.len()..]));
        }
    }
    if iter.truncated() {
        return Err(FrameError::Truncated);
    }
    Ok(None)
}

fn encode_vendor_ie(attrs: &[u8], out: &mut Vec<u8>) {
    let mut payload = Vec::with_capacity(WSC_OUI_TYPE.len() + attrs.len());
    payload.extend_from_slice(&WSC_OUI_TYPE);
    payload.extend_from_slice(attrs);
    super::ie::write_ie(out, element_id::VENDOR_SPECIFIC, &payload);
}

/// Content common to beacons and probe responses (§4.2 "Both:").
fn write_common(out: &mut Vec<u8>, pbc_active: bool, authorized_macs: &[MacAddr]) {
    write_attr(out, attr::VERSION, &[WSC_VERSION_1_0]);
    write_attr(out, attr::WSC_STATE, &[WSC_STATE_CONFIGURED]);

    if pbc_active {
        write_attr(out, attr::SELECTED_REGISTRAR, &[0x01]);
        write_attr(
            out,
            attr::DEVICE_PASSWORD_ID,
            &DEVICE_PASSWORD_ID_PUSH_BUTTON.to_be_bytes(),
        );
        write_attr(
            out,
            attr::SELECTED_REGISTRAR_CONFIG_METHODS,
            &CONFIG_METHOD_PUSH_BUTTON.to_be_bytes(),
        );
    } else {
        write_attr(out, attr::SELECTED_REGISTRAR, &[0x00]);
    }

    if !authorized_macs.is_empty() {
        let mut payload = Vec::with_capacity(authorized_macs.len() * 6);
        for mac in authorized_macs {
            payload.extend_from_slice(mac.as_ref());
        }
        // Vendor-defined "Authorized MACs" attribute, reusing the same id
        // space convention as the rest of this module's internal TLVs.
        write_attr(out, 0x1056, &payload);
    }

    let mut vendor_ext = Vec::with_capacity(3 + 3);
    vendor_ext.extend_from_slice(&VENDOR_EXT_WFA_OUI);
    vendor_ext.push(VENDOR_EXT_SUBELEM_VERSION2);
    vendor_ext.push(1);
    vendor_ext.push(WSC_VERSION2_2_0);
    write_attr(out, attr::VENDOR_EXTENSION, &vendor_ext);
}

/// Builds the beacon's WSC IE (§4.2).
pub fn build_beacon_ie(out: &mut Vec<u8>, pbc_active: bool, authorized_macs: &[MacAddr]) {
    let mut attrs = Vec::new();
    write_common(&mut attrs, pbc_active, authorized_macs);
    encode_vendor_ie(&attrs, out);
}

/// Builds the probe response's WSC IE, which carries everything the beacon
/// does plus response_type/UUID-R/device type/device name/config methods
/// (§4.2).
pub fn build_probe_response_ie(
    out: &mut Vec<u8>,
    pbc_active: bool,
    authorized_macs: &[MacAddr],
    uuid_r: &[u8; 16],
    device_type: &crate::config::WscDeviceType,
    device_name: &str,
) {
    let mut attrs = Vec::new();
    write_common(&mut attrs, pbc_active, authorized_macs);
    write_attr(&mut attrs, attr::RESPONSE_TYPE, &[WscResponseType::Ap.value()]);
    write_attr(&mut attrs, attr::UUID_R, uuid_r);

    let mut dev_type_bytes = Vec::with_capacity(8);
    dev_type_bytes.extend_from_slice(&device_type.category.to_be_bytes());
    dev_type_bytes.extend_from_slice(&device_type.oui);
    dev_type_bytes.extend_from_slice(&device_type.subcategory.to_be_bytes());
    write_attr(&mut attrs, attr::PRIMARY_DEVICE_TYPE, &dev_type_bytes);

    write_attr(
        &mut attrs,
        attr::DEVICE_NAME,
        &device_name.as_bytes()[..device_name.len().min(32)],
    );
    write_attr(
        &mut attrs,
        attr::CONFIG_METHODS,
        &CONFIG_METHOD_PUSH_BUTTON.to_be_bytes(),
    );

    encode_vendor_ie(&attrs, out);
}

/// Builds the minimal WSC IE carried in a WSC-only association response
/// (§4.2 "Association Response").
pub fn build_assoc_response_ie(out: &mut Vec<u8>) {
    let mut attrs = Vec::new();
    write_attr(&mut attrs, attr::VERSION, &[WSC_VERSION_1_0]);
    write_attr(&mut attrs, attr::RESPONSE_TYPE, &[WscResponseType::Ap.value()]);
    encode_vendor_ie(&attrs, out);
}

/// What this core needs out of a Probe Request's WSC IE (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WscProbeRequestInfo {
    pub config_methods: u16,
    pub device_password_id: u16,
    /// UUID-E, when the enrollee included it (not all enrollees do on a
    /// bare probe request; §3 ProbeRecord still has a slot for it).
    pub uuid_e: Option<[u8; 16]>,
}

/// Parses a Probe Request's WSC attribute stream. Returns `None` if the
/// required attributes are absent rather than erroring — an AP without WSC
/// enabled still answers ordinary probes (§4.6 dispatch table).
pub fn parse_probe_request(payload: &[u8]) -> Option<WscProbeRequestInfo> {
    let mut config_methods = None;
    let mut device_password_id = None;
    let mut uuid_e = None;
    for (id, value) in (WscAttrIterator { buf: payload }) {
        match id {
            attr::CONFIG_METHODS if value.len() == 2 => {
                config_methods = Some(u16::from_be_bytes([value[0], value[1]]));
            }
            attr::DEVICE_PASSWORD_ID if value.len() == 2 => {
                device_password_id = Some(u16::from_be_bytes([value[0], value[1]]));
            }
            attr::UUID_E if value.len() == 16 => {
                uuid_e = Some(value.try_into().unwrap());
            }
            _ => {}
        }
    }
    Some(WscProbeRequestInfo {
        config_methods: config_methods?,
        device_password_id: device_password_id?,
        uuid_e,
    })
}

/// What this core needs out of an Association Request's WSC IE (§4.4 WSC
/// path).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WscAssocRequestInfo {
    pub request_type: WscRequestType,
    pub uuid_e: Option<[u8; 16]>,
    pub version2: bool,
}

pub fn parse_assoc_request(payload: &[u8]) -> Result<WscAssocRequestInfo, FrameError> {
    let mut request_type = None;
    let mut uuid_e = None;
    let mut version2 = false;

    for (id, value) in (WscAttrIterator { buf: payload }) {
        match id {
            attr::REQUEST_TYPE if value.len() == 1 => {
                request_type = WscRequestType::from_value(value[0]);
            }
            attr::UUID_E if value.len() == 16 => {
                uuid_e = Some(value.try_into().unwrap());
            }
            attr::VENDOR_EXTENSION if value.len() >= 3 && value[..3] == VENDOR_EXT_WFA_OUI => {
                let mut sub = &value[3..];
                while sub.len() >= 2 {
                    let sub_id = sub[0];
                    let sub_len = sub[1] as usize;
                    if sub.len() < 2 + sub_len {
                        break;
                    }
                    if sub_id == VENDOR_EXT_SUBELEM_VERSION2 && sub_len == 1 {
                        version2 = sub[2] >= WSC_VERSION2_2_0;
                    }
                    sub = &sub[2 + sub_len..];
                }
            }
            _ => {}
        }
    }

    let request_type = request_type.ok_or(FrameError::MissingIe("WSC Request Type"))?;
    Ok(WscAssocRequestInfo {
        request_type,
        uuid_e,
        version2,
    })
}

/// Builds a full Probe Request WSC Vendor Specific IE (Config Methods +
/// Device Password ID, optionally UUID-E), for tests elsewhere in the crate
/// that need a PBC probe fixture without reaching into this module's
/// private attribute writer.
#[cfg(any(test, feature = "testing"))]
pub(crate) fn test_probe_request_wsc_ie(out: &mut Vec<u8>, uuid_e: Option<[u8; 16]>) {
    let mut attrs = Vec::new();
    write_attr(&mut attrs, attr::CONFIG_METHODS, &CONFIG_METHOD_PUSH_BUTTON.to_be_bytes());
    write_attr(
        &mut attrs,
        attr::DEVICE_PASSWORD_ID,
        &DEVICE_PASSWORD_ID_PUSH_BUTTON.to_be_bytes(),
    );
    if let Some(uuid) = uuid_e {
        write_attr(&mut attrs, attr::UUID_E, &uuid);
    }
    encode_vendor_ie(&attrs, out);
}

/// Builds a full Association Request WSC Vendor Specific IE (Request Type,
/// optionally UUID-E), for the same reason as `test_probe_request_wsc_ie`.
#[cfg(any(test, feature = "testing"))]
pub(crate) fn test_assoc_request_wsc_ie(
    out: &mut Vec<u8>,
    request_type: WscRequestType,
    uuid_e: Option<[u8; 16]>,
) {
    let mut attrs = Vec::new();
    write_attr(&mut attrs, attr::REQUEST_TYPE, &[request_type.value()]);
    if let Some(uuid) = uuid_e {
        write_attr(&mut attrs, attr::UUID_E, &uuid);
    }
    encode_vendor_ie(&attrs, out);
}
