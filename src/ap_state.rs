//! Station Table & State Machine (C4): §4.4.
//!
//! `ApState` owns the Station table and the synchronous decision logic for
//! Authentication, (Re)Association, Disassociation and Deauthentication.
//! These methods are pure state transitions over `self`; they return a
//! decision for the caller (`engine.rs`) to act on — sending a frame,
//! starting a handshake, emitting an `Event` — keeping the protocol logic
//! testable without a kernel transport (§8).
//!
//! Callers are expected to have already verified the frame's BSSID equals
//! `own_mac` (§4.4 validation step 1) before reaching these methods; that
//! check is cheap and frame-parsing-adjacent, so `engine.rs` does it
//! up front for every subtype at once.

use std::collections::HashMap;

use crate::config::ApConfig;
use crate::crypto::derive_uuid_r;
use crate::frame::assoc::AssocRequestInfo;
use crate::frame::auth::{self, AuthRequestInfo};
use crate::frame::wsc::WscRequestType;
use crate::frame::{Rsne, StatusCode};
use crate::macaddr::MacAddr;
use crate::rates::{choose_ciphers, choose_rates, Akm, Cipher, GroupCipher, PairwiseCipherMask, RateSet, WiphyCipherCaps};
use crate::station::{Station, StationState};
use crate::wsc_registrar::WscRegistrar;

/// Beacon interval in TU (100 ms units), fixed per §4.6 Start.
pub const BEACON_INTERVAL_TU: u16 = 100;
const DEFAULT_CHANNEL: u8 = 6;

pub struct ApState {
    pub own_mac: MacAddr,
    pub config: ApConfig,
    pub pairwise_ciphers: PairwiseCipherMask,
    pub group_cipher: GroupCipher,
    pub beacon_interval: u16,
    pub rates: RateSet,
    pub channel: u8,
    pub gtk: Vec<u8>,
    pub gtk_index: u8,
    pub gtk_set: bool,
    pub last_aid: u16,
    pub sta_states: HashMap<MacAddr, Station>,
    pub wsc: WscRegistrar,
    pub uuid_r: [u8; 16],
    pub started: bool,
    pub stopping: bool,
}

impl ApState {
    /// §4.6 Start, step 1-2: resolve ciphers/rates, default channel, derive
    /// UUID-R. Does not talk to the kernel; that is `engine.rs`'s job.
    pub fn new(own_mac: MacAddr, config: ApConfig, wiphy_caps: WiphyCipherCaps) -> Self {
        let (pairwise_ciphers, group_cipher) = choose_ciphers(wiphy_caps);
        let rates = choose_rates(config.no_cck_rates());
        let channel = if config.channel() == 0 {
            DEFAULT_CHANNEL
        } else {
            config.channel()
        };
        let uuid_r = derive_uuid_r(own_mac.as_bytes());
        ApState {
            own_mac,
            config,
            pairwise_ciphers,
            group_cipher,
            beacon_interval: BEACON_INTERVAL_TU,
            rates,
            channel,
            gtk: Vec::new(),
            gtk_index: 1,
            gtk_set: false,
            last_aid: 0,
            sta_states: HashMap::new(),
            wsc: WscRegistrar::new(),
            uuid_r,
            started: false,
            stopping: false,
        }
    }

    /// The RSNE this AP advertises in beacons/probe responses/association
    /// responses (§4.2).
    pub fn advertised_rsne(&self) -> Rsne {
        let pairwise: Vec<Cipher> = self.pairwise_ciphers.iter().collect();
        Rsne::for_ap_multi(&pairwise, self.group_cipher)
    }

    /// §4.4 "Authentication" (Open System only).
    pub fn handle_authentication(&mut self, sender: MacAddr, info: AuthRequestInfo) -> bool {
        if info.algorithm != auth::ALGORITHM_OPEN_SYSTEM || info.transaction_sequence != 1 {
            return false;
        }
        if !self.config.is_authorized(&sender) {
            return false;
        }
        // "If a Station already exists... leave its state unchanged... reply
        // SUCCESS" — `entry().or_insert_with()` does exactly that.
        self.sta_states
            .entry(sender)
            .or_insert_with(|| Station::new(sender));
        true
    }

    /// §4.4 "Association / Reassociation". Returns the status to reply
    /// with; `Success` means the caller must send a success response and,
    /// once it is ACKed, call `confirm_association`. Any non-`Success`
    /// status is a final answer — nothing more to do for this Station.
    pub fn handle_association(
        &mut self,
        sender: MacAddr,
        is_reassoc: bool,
        info: &AssocRequestInfo,
    ) -> (StatusCode, Option<AssocAcceptance>) {
        macro_rules! reject {
            ($status:expr) => {{
                if let Some(sta) = self.sta_states.get_mut(&sender) {
                    if matches!(sta.state, StationState::RsnaEstablished) {
                        sta.demote_to_authenticated();
                    }
                }
                return ($status, None);
            }};
        }

        let sta_exists = self.sta_states.contains_key(&sender);
        if is_reassoc {
            let already_assoc = self
                .sta_states
                .get(&sender)
                .map(Station::is_associated)
                .unwrap_or(false);
            if !already_assoc {
                reject!(StatusCode::Unspecified);
            }
        } else if !sta_exists {
            reject!(StatusCode::Unspecified);
        }

        if info.ssid != self.config.ssid() {
            reject!(StatusCode::Unspecified);
        }

        match self.rates.basic_rate() {
            Some(basic) if info.rates.contains(basic) => {}
            _ => reject!(StatusCode::Unspecified),
        }

        let has_rsne = info.rsne.is_some();
        let has_wsc = info.wsc.is_some();
        if !has_rsne && !has_wsc {
            reject!(StatusCode::InvalidIe);
        }

        // WSC preempts RSNE if both are present (§4.4 validation step 5).
        let mut wsc_accept: Option<([u8; 16], bool)> = None;
        if has_wsc {
            let wsc_info = info.wsc.as_ref().unwrap();
            if wsc_info.request_type != WscRequestType::EnrolleeOpen8021x {
                reject!(StatusCode::Unspecified);
            }
            let matching_probes = self
                .wsc
                .probe_records()
                .iter()
                .filter(|r| r.mac == sender)
                .count();
            if !self.wsc.is_pbc_active() || matching_probes != 1 {
                reject!(StatusCode::Unspecified);
            }
            wsc_accept = Some((wsc_info.uuid_e.unwrap_or([0; 16]), wsc_info.version2));
        } else {
            let rsne = info.rsne.as_ref().unwrap();
            if rsne.capabilities.mfpr && rsne.capabilities.spp_a_msdu_required {
                reject!(StatusCode::Unspecified);
            }
            if rsne.pairwise_ciphers.len() != 1 {
                reject!(StatusCode::InvalidPairwiseCipher);
            }
            let chosen = rsne.pairwise_ciphers[0];
            if !self.pairwise_ciphers.contains(chosen) {
                reject!(StatusCode::InvalidPairwiseCipher);
            }
            if rsne.akms != vec![Akm::Psk] {
                reject!(StatusCode::InvalidAkmp);
            }
        }

        // §4.4: "If Station was already in RSNA, drop the RSNA first. If
        // associated but no RSNA, stop any stale handshake."
        let stale_handshake = {
            let sta = self.sta_states.get_mut(&sender).unwrap();
            let had_handshake = sta.handshake_active;
            sta.handshake_active = false;
            had_handshake
        };

        let sta = self.sta_states.get_mut(&sender).unwrap();
        let aid = match sta.aid {
            Some(aid) => aid,
            None => {
                self.last_aid += 1;
                let aid = self.last_aid;
                let sta = self.sta_states.get_mut(&sender).unwrap();
                sta.aid = Some(aid);
                aid
            }
        };

        let sta = self.sta_states.get_mut(&sender).unwrap();
        sta.capability = info.capability;
        sta.listen_interval = info.listen_interval;
        sta.rates = info.rates.clone();
        sta.assoc_ies = info.assoc_ies.clone();
        sta.assoc_rsne = info.rsne.clone();
        let mut registration_start = false;
        if let Some((uuid_e, v2)) = wsc_accept {
            sta.wsc_uuid_e = Some(uuid_e);
            sta.wsc_v2 = v2;
            registration_start = true;
        }

        (
            StatusCode::Success,
            Some(AssocAcceptance {
                aid,
                is_wsc: registration_start,
                assoc_ies: sta.assoc_ies.clone(),
                stale_handshake_stopped: stale_handshake,
            }),
        )
    }

    /// §4.4 "On the response-ACK callback". `acked = false` demotes an
    /// already-associated Station or removes a first-time one; `acked =
    /// true` transitions to `Associated`, ready for §4.5.
    pub fn confirm_association(&mut self, mac: MacAddr, acked: bool) -> AckOutcome {
        let Some(sta) = self.sta_states.get_mut(&mac) else {
            return AckOutcome::StationGone;
        };
        if acked {
            sta.state = StationState::Associated;
            AckOutcome::Installed
        } else if sta.is_associated() {
            sta.demote_to_authenticated();
            AckOutcome::Demoted
        } else {
            self.sta_states.remove(&mac);
            AckOutcome::Removed
        }
    }

    /// §4.4 "Disassociation": demote to Authenticated, cancel pending
    /// response.
    pub fn handle_disassociation(&mut self, sender: MacAddr) {
        if let Some(sta) = self.sta_states.get_mut(&sender) {
            if sta.is_associated() {
                sta.demote_to_authenticated();
            }
            sta.pending_response = None;
        }
    }

    /// §4.4 "Deauthentication": remove the Station entirely. Returns the
    /// removed Station so the caller can cancel its pending kernel tokens
    /// (§5 "Cancellation") and build `Event::StationRemoved`.
    pub fn handle_deauthentication(&mut self, sender: MacAddr) -> Option<Station> {
        self.sta_states.remove(&sender)
    }

    /// §4.6 "Failure semantics": unsolicited kernel `NEW_STATION` (hardware
    /// auto-association) synthesizes a Station already in `Associated`,
    /// skipping the Authentication/(Re)Association/ACK dance entirely —
    /// the driver already did it. Always assigns a fresh `aid`, matching
    /// "proceed directly to §4.5" (there is no prior Station to reuse one
    /// from).
    pub fn synthesize_associated_station(
        &mut self,
        mac: MacAddr,
        info: &AssocRequestInfo,
    ) -> AssocAcceptance {
        self.last_aid += 1;
        let aid = self.last_aid;

        let mut sta = Station::new(mac);
        sta.state = StationState::Associated;
        sta.aid = Some(aid);
        sta.capability = info.capability;
        sta.listen_interval = info.listen_interval;
        sta.rates = info.rates.clone();
        sta.assoc_ies = info.assoc_ies.clone();
        sta.assoc_rsne = info.rsne.clone();

        let is_wsc = info.wsc.is_some();
        if let Some(wsc_info) = &info.wsc {
            sta.wsc_uuid_e = wsc_info.uuid_e;
            sta.wsc_v2 = wsc_info.version2;
        }
        let assoc_ies = sta.assoc_ies.clone();
        self.sta_states.insert(mac, sta);

        AssocAcceptance {
            aid,
            is_wsc,
            assoc_ies,
            stale_handshake_stopped: false,
        }
    }
}

/// What a successful `handle_association` call produced, for the caller to
/// build the response frame and, post-ACK, drive §4.5.
pub struct AssocAcceptance {
    pub aid: u16,
    pub is_wsc: bool,
    pub assoc_ies: Vec<u8>,
    pub stale_handshake_stopped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    Installed,
    Demoted,
    Removed,
    StationGone,
}
