//! AP Engine (C6): §4.6.
//!
//! Ties the frame parser (C2), the station state machine (C4), the WSC PBC
//! registrar (C3) and the handshake orchestrator (C5) together behind a
//! single-threaded, cooperatively-suspending loop (§5). Every suspension
//! point named in §5 — kernel commands, frame sends, handshake events — is
//! an `.await` here; nothing in this module runs concurrently with itself,
//! so there is no internal locking.

use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::mpsc;

use crate::ap_state::{AckOutcome, ApState};
use crate::crypto::generate_gtk;
use crate::error::{ApError, DeauthReason};
use crate::events::Event;
use crate::frame::wsc::{CONFIG_METHOD_PUSH_BUTTON, DEVICE_PASSWORD_ID_PUSH_BUTTON};
use crate::frame::{assoc, auth, beacon, probe, wsc, MgmtHeader, MgmtSubtype, StatusCode};
use crate::handshake::{
    Eapol4WayHandshake, EapWsc, HandshakeEvent, HandshakeHandle, HandshakeParams, WscNotify,
    WscParams,
};
use crate::kernel::{CommandToken, DelStationMode, GtkRsc, KernelTransport, StartApParams, StationFlags};
use crate::macaddr::MacAddr;
use crate::rates::GroupCipher;
use crate::station::StationState;
use crate::wsc_registrar::{ProbeOutcome, PushButtonOutcome, SessionOverlap};

/// Management subtypes subscribed at Start and unsubscribed at Stop
/// (§4.6 Start step 3, Stop).
/// Marks `Station::pending_response` while a (re)association response is
/// in flight (§5 "at most one outstanding (re)association response per
/// Station"). The value itself is never interpreted — only its presence —
/// matching `CommandToken`'s own doc comment; this core never gets a real
/// token back until the send's ACK outcome is already known, so there is
/// nothing to store here but a marker.
const PENDING_RESPONSE_TOKEN: CommandToken = CommandToken(u64::MAX);

const SUBSCRIBED_SUBTYPES: [MgmtSubtype; 6] = [
    MgmtSubtype::ProbeRequest,
    MgmtSubtype::Authentication,
    MgmtSubtype::AssociationRequest,
    MgmtSubtype::ReassociationRequest,
    MgmtSubtype::Disassociation,
    MgmtSubtype::Deauthentication,
];

/// The AP Engine for one instance, generic over its kernel transport and
/// handshake collaborators so the real netlink/EAPoL implementations stay
/// out of this crate (spec.md §1).
pub struct Engine<K, H, W> {
    pub ifindex: u32,
    pub state: ApState,
    transport: K,
    handshake: H,
    eap_wsc: W,
    events: mpsc::UnboundedSender<Event>,
    handshake_4way: HashMap<MacAddr, HandshakeHandle>,
    handshake_wsc: HashMap<MacAddr, HandshakeHandle>,
}

impl<K, H, W> Engine<K, H, W>
where
    K: KernelTransport,
    H: Eapol4WayHandshake,
    W: EapWsc,
{
    pub fn new(
        ifindex: u32,
        state: ApState,
        transport: K,
        handshake: H,
        eap_wsc: W,
        events: mpsc::UnboundedSender<Event>,
    ) -> Self {
        Engine {
            ifindex,
            state,
            transport,
            handshake,
            eap_wsc,
            events,
            handshake_4way: HashMap::new(),
            handshake_wsc: HashMap::new(),
        }
    }

    fn emit(&self, event: Event) {
        let _ = self.events.send(event);
    }

    /// §4.6 Start.
    pub async fn start(&mut self) -> Result<(), ApError> {
        for subtype in SUBSCRIBED_SUBTYPES {
            if let Err(e) = self
                .transport
                .register_frame(self.ifindex, subtype.value(), &[])
                .await
            {
                log::error!("register_frame({subtype:?}) failed: {e}");
                self.emit(Event::StartFailed);
                return Ok(());
            }
        }

        let head = beacon::build_beacon_head(
            self.state.own_mac,
            self.state.beacon_interval,
            self.state.config.ssid(),
            &self.state.rates,
            self.state.channel,
        );
        let rsne = self.state.advertised_rsne();
        let tail = beacon::build_beacon_tail(
            &rsne,
            self.state.wsc.is_pbc_active(),
            self.state.config.authorized_macs(),
        );

        let params = StartApParams {
            ifindex: self.ifindex,
            beacon_head: &head,
            beacon_tail: &tail,
            ssid: self.state.config.ssid(),
            hidden: false,
            dtim: 3,
            beacon_interval: self.state.beacon_interval,
            channel: self.state.channel,
            width_mhz: 20,
            pairwise_ciphers: self.state.pairwise_ciphers.iter().collect(),
            group_cipher: self.state.group_cipher,
            wpa_version: 2,
            control_port_over_nl: false,
        };

        match self.transport.start_ap(params).await {
            Ok(_) => {
                self.state.started = true;
                self.emit(Event::Started);
                Ok(())
            }
            Err(e) => {
                log::error!("start_ap failed: {e}");
                self.emit(Event::StartFailed);
                Ok(())
            }
        }
    }

    /// §4.6 Stop.
    pub async fn stop(&mut self) {
        self.state.stopping = true;
        self.emit(Event::Stopping);

        for subtype in SUBSCRIBED_SUBTYPES {
            let _ = self
                .transport
                .unregister_frame(self.ifindex, subtype.value())
                .await;
        }
        if self.state.gtk_set {
            let _ = self
                .transport
                .del_key(self.ifindex, self.state.gtk_index, None)
                .await;
        }
        let _ = self.transport.stop_ap(self.ifindex).await;

        self.state.sta_states.clear();
        self.handshake_4way.clear();
        self.handshake_wsc.clear();
        self.state.gtk.iter_mut().for_each(|b| *b = 0);
        self.state.gtk_set = false;
        self.state.config.zero_psk();
    }

    async fn refresh_beacon(&mut self) {
        let head = beacon::build_beacon_head(
            self.state.own_mac,
            self.state.beacon_interval,
            self.state.config.ssid(),
            &self.state.rates,
            self.state.channel,
        );
        let rsne = self.state.advertised_rsne();
        let tail = beacon::build_beacon_tail(
            &rsne,
            self.state.wsc.is_pbc_active(),
            self.state.config.authorized_macs(),
        );
        if let Err(e) = self.transport.set_beacon(self.ifindex, &head, &tail).await {
            log::warn!("set_beacon failed: {e}");
        }
    }

    /// Entry point for `push_button()` (§4.3), driven by the caller (not a
    /// frame event).
    pub async fn push_button(&mut self) -> Result<(), ApError> {
        match self.state.wsc.push_button(Instant::now()) {
            Ok(PushButtonOutcome::Armed) => {
                self.refresh_beacon().await;
                Ok(())
            }
            Ok(PushButtonOutcome::Reset) => Ok(()),
            Err(SessionOverlap) => Err(ApError::SessionOverlap),
        }
    }

    /// Walk-time timer callback (§5 "Timer firings").
    pub async fn poll_walk_time(&mut self) {
        if self.state.wsc.poll_walk_time(Instant::now()) {
            self.emit(Event::PbcModeExit);
            self.refresh_beacon().await;
        }
    }

    /// §4.6 "Frame dispatch". `header.bssid` is checked against the AP's
    /// own MAC here, matching §4.4 validation step 1 for every subtype at
    /// once.
    pub async fn on_frame(&mut self, header: MgmtHeader, body: &[u8]) {
        if header.bssid != self.state.own_mac {
            return;
        }
        match header.subtype {
            MgmtSubtype::ProbeRequest => self.on_probe_request(header.sa, body).await,
            MgmtSubtype::Authentication => self.on_authentication(header.sa, body).await,
            MgmtSubtype::AssociationRequest => self.on_assoc_request(header.sa, body, false).await,
            MgmtSubtype::ReassociationRequest => self.on_assoc_request(header.sa, body, true).await,
            MgmtSubtype::Disassociation => self.on_disassoc(header.sa, body).await,
            MgmtSubtype::Deauthentication => self.on_deauth(header.sa, body).await,
            _ => {}
        }
    }

    async fn on_probe_request(&mut self, sender: MacAddr, body: &[u8]) {
        let req = match probe::parse_probe_request(body) {
            Ok(r) => r,
            Err(_) => return,
        };
        if !probe::matches(&req, self.state.config.ssid(), self.state.channel) {
            return;
        }

        if let Some(wsc_info) = &req.wsc {
            let is_pbc = wsc_info.config_methods & CONFIG_METHOD_PUSH_BUTTON != 0
                && wsc_info.device_password_id == DEVICE_PASSWORD_ID_PUSH_BUTTON;
            if is_pbc {
                let now = Instant::now();
                let outcome = self
                    .state
                    .wsc
                    .handle_pbc_probe(sender, wsc_info.uuid_e, now);
                if let ProbeOutcome::SessionOverlap {
                    evict,
                    pbc_was_active,
                } = outcome
                {
                    // §4.3 step 4: only a real PBC-mode exit is reported —
                    // two enrollees probing with no prior `push_button()`
                    // queue up without ever toggling PBC mode.
                    if pbc_was_active {
                        self.emit(Event::PbcModeExit);
                        self.refresh_beacon().await;
                    }
                    if let Some(evict_mac) = evict {
                        self.fail_wsc_station(evict_mac, DeauthReason::DISASSOC_AP_BUSY)
                            .await;
                    }
                }
            }
        }

        let rsne = self.state.advertised_rsne();
        let resp = probe::build_probe_response(
            self.state.own_mac,
            sender,
            self.state.beacon_interval,
            self.state.config.ssid(),
            &self.state.rates,
            self.state.channel,
            &rsne,
            self.state.wsc.is_pbc_active(),
            self.state.config.authorized_macs(),
            &self.state.uuid_r,
            &self.state.config.wsc().primary_device_type,
            &self.state.config.wsc().device_name,
        );
        let _ = self
            .transport
            .send_mgmt_frame(self.ifindex, 0, &resp, false, self.state.config.no_cck_rates())
            .await;
    }

    /// Evicts a STA whose in-progress EAP-WSC handshake conflicts with a
    /// new PBC session (§4.3 step 4). Only acts when the named MAC is an
    /// associated, RSNE-less (WSC-only) Station that is currently mid
    /// EAP-WSC — a probe-only MAC with no Station entry, or an
    /// RSN-associated Station, must not be deauthenticated here.
    async fn fail_wsc_station(&mut self, mac: MacAddr, reason: DeauthReason) {
        let eligible = self
            .state
            .sta_states
            .get(&mac)
            .map(|sta| sta.is_associated() && sta.assoc_rsne.is_none())
            .unwrap_or(false)
            && self.handshake_wsc.contains_key(&mac);
        if !eligible {
            return;
        }

        if let Some(handle) = self.handshake_wsc.remove(&mac) {
            self.eap_wsc.stop(handle).await;
        }
        let _ = self
            .transport
            .del_station(self.ifindex, mac, reason, DelStationMode::Deauthenticate)
            .await;
        if self.state.sta_states.remove(&mac).is_some() {
            self.emit(Event::StationRemoved { mac, reason });
        }
    }

    async fn on_authentication(&mut self, sender: MacAddr, body: &[u8]) {
        let info = match auth::parse_auth_request(body) {
            Ok(i) => i,
            Err(_) => return,
        };
        let accepted = self.state.handle_authentication(sender, info);
        let status = if accepted {
            StatusCode::Success
        } else {
            StatusCode::Unspecified
        };
        let resp = auth::build_auth_response(self.state.own_mac, sender, status);
        let _ = self
            .transport
            .send_mgmt_frame(self.ifindex, 0, &resp, false, false)
            .await;
    }

    async fn on_assoc_request(&mut self, sender: MacAddr, body: &[u8], is_reassoc: bool) {
        if let Some(sta) = self.state.sta_states.get(&sender) {
            if sta.pending_response.is_some() {
                // §5: at most one outstanding (re)association response per
                // Station; further requests are ignored until resolution.
                return;
            }
        }

        let info = match assoc::parse_assoc_request(body, is_reassoc) {
            Ok(i) => i,
            Err(e) => {
                let resp = assoc::build_assoc_response(
                    self.state.own_mac,
                    sender,
                    is_reassoc,
                    e.status_code(),
                    0,
                    &self.state.rates,
                    None,
                );
                let _ = self
                    .transport
                    .send_mgmt_frame(self.ifindex, 0, &resp, true, false)
                    .await;
                return;
            }
        };

        let (status, accept) = self.state.handle_association(sender, is_reassoc, &info);

        let wsc_ie_buf = accept.as_ref().filter(|a| a.is_wsc).map(|_| {
            let mut buf = Vec::new();
            wsc::build_assoc_response_ie(&mut buf);
            buf
        });
        let aid = accept.as_ref().map(|a| a.aid).unwrap_or(0);

        let resp = assoc::build_assoc_response(
            self.state.own_mac,
            sender,
            is_reassoc,
            status,
            aid,
            &self.state.rates,
            wsc_ie_buf.as_deref(),
        );

        if let Some(sta) = self.state.sta_states.get_mut(&sender) {
            sta.pending_response = Some(PENDING_RESPONSE_TOKEN);
        }

        // §5: sending with "wait for ACK" suspends this Station's
        // association workflow until the ACK outcome is known; modeled
        // directly as awaiting the send.
        let ack_result = self
            .transport
            .send_mgmt_frame(self.ifindex, 0, &resp, true, false)
            .await;

        if let Some(sta) = self.state.sta_states.get_mut(&sender) {
            sta.pending_response = None;
        }

        if !status.is_success() {
            return;
        }
        let Some(accept) = accept else { return };

        if accept.is_wsc {
            self.emit(Event::RegistrationStart {
                mac: sender,
                assoc_ies: accept.assoc_ies.clone(),
            });
            self.state.wsc.exit_pbc_mode();
            self.refresh_beacon().await;
        }

        let acked = ack_result.is_ok();
        match self.state.confirm_association(sender, acked) {
            AckOutcome::Installed => {
                let rates = self.state.rates.clone();
                let _ = self
                    .transport
                    .new_station(
                        self.ifindex,
                        sender,
                        StationFlags {
                            authenticated: true,
                            associated: true,
                        },
                        aid,
                        &rates,
                        info.listen_interval,
                    )
                    .await;
                self.start_handshake(sender, accept.is_wsc).await;
            }
            AckOutcome::Demoted | AckOutcome::Removed | AckOutcome::StationGone => {}
        }
    }

    /// §4.5 "On Station → Associated".
    async fn start_handshake(&mut self, mac: MacAddr, is_wsc: bool) {
        if is_wsc {
            let Some(sta) = self.state.sta_states.get(&mac) else {
                return;
            };
            let params = WscParams {
                sta: mac,
                ssid: self.state.config.ssid(),
                psk: *self.state.config.psk(),
                uuid_e: sta.wsc_uuid_e.unwrap_or([0; 16]),
                uuid_r: self.state.uuid_r,
            };
            let handle = self.eap_wsc.start(params).await;
            self.handshake_wsc.insert(mac, handle);
            if let Some(sta) = self.state.sta_states.get_mut(&mac) {
                sta.handshake_active = true;
            }
            return;
        }

        self.ensure_gtk().await;
        let gtk_rsc = self.query_gtk_rsc().await;

        let Some(supplicant_ie) = self
            .state
            .sta_states
            .get(&mac)
            .and_then(|sta| sta.assoc_rsne.clone())
        else {
            return;
        };
        let authenticator_ie = self.state.advertised_rsne();
        let params = HandshakeParams {
            sta: mac,
            pmk: *self.state.config.psk(),
            supplicant_ie: &supplicant_ie,
            authenticator_ie: &authenticator_ie,
            gtk: &self.state.gtk,
            gtk_index: self.state.gtk_index,
            gtk_rsc,
        };
        let handle = self.handshake.start(params).await;
        self.handshake_4way.insert(mac, handle);
        if let Some(sta) = self.state.sta_states.get_mut(&mac) {
            sta.handshake_active = true;
        }
    }

    /// §4.5 "ensure GTK exists" (RSN association, step 1).
    async fn ensure_gtk(&mut self) {
        if self.state.gtk_set {
            return;
        }
        let GroupCipher::Cipher(cipher) = self.state.group_cipher else {
            return;
        };
        let gtk = generate_gtk(cipher);
        if self
            .transport
            .new_key_group(self.ifindex, cipher, self.state.gtk_index, &gtk, GtkRsc::ZERO)
            .await
            .is_ok()
        {
            let _ = self
                .transport
                .set_key_default_group(self.ifindex, self.state.gtk_index)
                .await;
            self.state.gtk = gtk;
            self.state.gtk_set = true;
        }
    }

    /// §4.5 step 2, §9 Open Question: always queried, never assumed zero.
    async fn query_gtk_rsc(&mut self) -> GtkRsc {
        self.transport
            .get_group_tx_rsc(self.ifindex, self.state.gtk_index)
            .await
            .unwrap_or(GtkRsc::ZERO)
    }

    async fn on_disassoc(&mut self, sender: MacAddr, body: &[u8]) {
        if auth::parse_reason(body).is_err() {
            return;
        }
        self.state.handle_disassociation(sender);
    }

    async fn on_deauth(&mut self, sender: MacAddr, body: &[u8]) {
        let reason = auth::parse_reason(body).unwrap_or(DeauthReason::UNSPECIFIED);
        if let Some(handle) = self.handshake_4way.remove(&sender) {
            self.handshake.stop(handle).await;
        }
        if let Some(handle) = self.handshake_wsc.remove(&sender) {
            self.eap_wsc.stop(handle).await;
        }
        if self.state.handle_deauthentication(sender).is_some() {
            self.emit(Event::StationRemoved { mac: sender, reason });
        }
    }

    /// §4.5 "Key rekey on 4-Way Handshake retry": the EAPoL component calls
    /// this when it re-drives message 3 installation; the orchestrator's
    /// only job is to re-query the GTK RSC and pass the fresh value back in
    /// (§9 Open Question: never assume it is still zero).
    pub async fn on_handshake_retry(&mut self, mac: MacAddr) {
        let Some(&handle) = self.handshake_4way.get(&mac) else {
            return;
        };
        let gtk_rsc = self.query_gtk_rsc().await;
        self.handshake.rekey_gtk(handle, gtk_rsc).await;
    }

    /// Unsolicited kernel `NEW_STATION` (§4.6 "Failure semantics": hardware
    /// auto-association). `ies` is the association IE block the driver
    /// bundled with the notification. Malformed IEs are dropped silently —
    /// there is no requester to answer with a status code.
    pub async fn on_kernel_new_station(&mut self, mac: MacAddr, ies: &[u8]) {
        let Ok(info) = assoc::parse_ies(ies) else {
            return;
        };
        let accept = self.state.synthesize_associated_station(mac, &info);
        self.start_handshake(mac, accept.is_wsc).await;
    }

    /// Unsolicited kernel `STOP_AP` (§4.6 "Failure semantics"): the kernel
    /// tore the AP down out-of-band. Mirrors `stop()`'s cleanup but does not
    /// re-issue `stop_ap`/unregister the frame subscriptions — the kernel
    /// already dropped them along with the interface's AP state.
    pub async fn on_kernel_stop_ap(&mut self) {
        self.emit(Event::Stopping);
        self.state.sta_states.clear();
        self.handshake_4way.clear();
        self.handshake_wsc.clear();
        self.state.gtk.iter_mut().for_each(|b| *b = 0);
        self.state.gtk_set = false;
        self.state.config.zero_psk();
        self.state.stopping = true;
    }

    /// §4.5 "Handshake events": fed in by the caller as the external EAPoL
    /// component reports them (it is out of scope for this crate itself).
    pub async fn on_handshake_event(&mut self, mac: MacAddr, event: HandshakeEvent) {
        match event {
            HandshakeEvent::Complete => {
                if let Some(sta) = self.state.sta_states.get_mut(&mac) {
                    sta.state = StationState::RsnaEstablished;
                    let assoc_ies = sta.assoc_ies.clone();
                    self.emit(Event::StationAdded { mac, assoc_ies });
                }
            }
            HandshakeEvent::Failed(reason) => {
                if self.handshake_wsc.remove(&mac).is_some() {
                    // §4.5 WSC path: tear down the handshake object only;
                    // the STA remains Associated but unauthorized, and the
                    // AP never auto-deauthenticates it.
                    if let Some(sta) = self.state.sta_states.get_mut(&mac) {
                        sta.handshake_active = false;
                    }
                    let _ = self.transport.set_station_unauthorized(self.ifindex, mac).await;
                } else if self.handshake_4way.remove(&mac).is_some() {
                    let _ = self
                        .transport
                        .del_station(self.ifindex, mac, reason, DelStationMode::Deauthenticate)
                        .await;
                    if self.state.sta_states.remove(&mac).is_some() {
                        self.emit(Event::StationRemoved { mac, reason });
                    }
                }
            }
            HandshakeEvent::SettingKeysFailed => {
                self.handshake_4way.remove(&mac);
                if self.state.sta_states.remove(&mac).is_some() {
                    self.emit(Event::StationRemoved {
                        mac,
                        reason: DeauthReason::UNSPECIFIED,
                    });
                }
            }
            HandshakeEvent::EapNotify(WscNotify::CredentialSent) => {
                self.state.wsc.clear_probes_for(mac);
                self.emit(Event::RegistrationSuccess { mac });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApConfig;
    use crate::frame::wsc::WscRequestType;
    use crate::frame::{element_id, ie, Capability, Rsne};
    use crate::rates::{choose_rates, Cipher, WiphyCipherCaps};
    use crate::testing::{FakeEapWsc, FakeHandshake, FakeKernelTransport};

    type TestEngine = Engine<FakeKernelTransport, FakeHandshake, FakeEapWsc>;

    fn test_engine() -> (TestEngine, mpsc::UnboundedReceiver<Event>) {
        let own_mac = MacAddr::new([9; 6]);
        let config = ApConfig::builder()
            .with_ssid(b"TestAP".to_vec())
            .with_psk([0x42; 32])
            .build()
            .unwrap();
        let caps = WiphyCipherCaps {
            ccmp: true,
            tkip: false,
            group_traffic: true,
        };
        let state = ApState::new(own_mac, config, caps);
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Engine::new(
            1,
            state,
            FakeKernelTransport::new(),
            FakeHandshake::new(),
            FakeEapWsc::new(),
            tx,
        );
        (engine, rx)
    }

    fn auth_request_frame(sta: MacAddr, own_mac: MacAddr) -> (MgmtHeader, Vec<u8>) {
        let header = MgmtHeader {
            subtype: MgmtSubtype::Authentication,
            da: own_mac,
            sa: sta,
            bssid: own_mac,
        };
        (header, crate::testing::auth_request_body())
    }

    fn assoc_request_frame(
        sta: MacAddr,
        own_mac: MacAddr,
        rsne: Option<&Rsne>,
        wsc_request_type: Option<WscRequestType>,
    ) -> (MgmtHeader, Vec<u8>) {
        let header = MgmtHeader {
            subtype: MgmtSubtype::AssociationRequest,
            da: own_mac,
            sa: sta,
            bssid: own_mac,
        };
        let mut body = Vec::new();
        let cap = Capability {
            ess: true,
            privacy: true,
        };
        body.extend_from_slice(&cap.to_bits().to_le_bytes());
        body.extend_from_slice(&10u16.to_le_bytes());
        ie::write_ie(&mut body, element_id::SSID, b"TestAP");
        ie::write_ie(
            &mut body,
            element_id::SUPPORTED_RATES,
            &ie::encode_supported_rates(&choose_rates(false)),
        );
        if let Some(rsne) = rsne {
            rsne.write_ie(&mut body);
        }
        if let Some(request_type) = wsc_request_type {
            crate::frame::wsc::test_assoc_request_wsc_ie(&mut body, request_type, Some([7u8; 16]));
        }
        (header, body)
    }

    fn probe_request_frame(sta: MacAddr, own_mac: MacAddr, pbc: bool) -> (MgmtHeader, Vec<u8>) {
        let header = MgmtHeader {
            subtype: MgmtSubtype::ProbeRequest,
            da: MacAddr::BROADCAST,
            sa: sta,
            bssid: own_mac,
        };
        let mut body = Vec::new();
        ie::write_ie(&mut body, element_id::SSID, &[]);
        if pbc {
            crate::frame::wsc::test_probe_request_wsc_ie(&mut body, Some([sta.as_bytes()[5]; 16]));
        }
        (header, body)
    }

    #[tokio::test]
    async fn pending_response_blocks_a_second_assoc_request_until_resolved() {
        let (mut engine, _events) = test_engine();
        engine.start().await.unwrap();

        let sta = MacAddr::new([1; 6]);
        let own_mac = engine.state.own_mac;
        let (hdr, body) = auth_request_frame(sta, own_mac);
        engine.on_frame(hdr, &body).await;

        // Simulate a response already in flight for this Station (§5: at
        // most one outstanding (re)association response per Station).
        engine.state.sta_states.get_mut(&sta).unwrap().pending_response =
            Some(PENDING_RESPONSE_TOKEN);

        let rsne = Rsne::for_ap(Cipher::Ccmp, GroupCipher::Cipher(Cipher::Ccmp));
        let (hdr, body) = assoc_request_frame(sta, own_mac, Some(&rsne), None);
        engine.on_frame(hdr, &body).await;

        // The request was ignored outright: no response sent, no state
        // change.
        assert!(engine
            .transport
            .calls
            .iter()
            .all(|c| !matches!(c, crate::testing::KernelCall::SendMgmtFrame { .. })));
        assert!(!engine.state.sta_states.get(&sta).unwrap().is_associated());
    }

    #[tokio::test]
    async fn pending_response_token_is_cleared_once_the_response_is_sent() {
        let (mut engine, _events) = test_engine();
        engine.start().await.unwrap();

        let sta = MacAddr::new([1; 6]);
        let own_mac = engine.state.own_mac;
        let (hdr, body) = auth_request_frame(sta, own_mac);
        engine.on_frame(hdr, &body).await;

        let rsne = Rsne::for_ap(Cipher::Ccmp, GroupCipher::Cipher(Cipher::Ccmp));
        let (hdr, body) = assoc_request_frame(sta, own_mac, Some(&rsne), None);
        engine.on_frame(hdr, &body).await;

        assert!(engine
            .state
            .sta_states
            .get(&sta)
            .unwrap()
            .pending_response
            .is_none());
    }

    #[tokio::test]
    async fn happy_psk_association_reaches_rsna_established() {
        let (mut engine, mut events) = test_engine();
        engine.start().await.unwrap();
        assert_eq!(events.recv().await, Some(Event::Started));

        let sta = MacAddr::new([1; 6]);
        let own_mac = engine.state.own_mac;

        let (hdr, body) = auth_request_frame(sta, own_mac);
        engine.on_frame(hdr, &body).await;

        let rsne = Rsne::for_ap(Cipher::Ccmp, GroupCipher::Cipher(Cipher::Ccmp));
        let (hdr, body) = assoc_request_frame(sta, own_mac, Some(&rsne), None);
        engine.on_frame(hdr, &body).await;

        assert_eq!(
            engine.state.sta_states.get(&sta).unwrap().state,
            StationState::Associated
        );
        assert!(engine.handshake_4way.contains_key(&sta));
        assert!(engine
            .transport
            .calls
            .iter()
            .any(|c| matches!(c, crate::testing::KernelCall::NewStation { mac, .. } if *mac == sta)));

        let handle = engine.handshake_4way[&sta];
        engine.on_handshake_event(sta, HandshakeEvent::Complete).await;
        assert_eq!(
            engine.state.sta_states.get(&sta).unwrap().state,
            StationState::RsnaEstablished
        );
        match events.recv().await {
            Some(Event::StationAdded { mac, .. }) => assert_eq!(mac, sta),
            other => panic!("expected StationAdded, got {other:?}"),
        }
        let _ = handle;
    }

    #[tokio::test]
    async fn wrong_ssid_is_rejected_without_accept() {
        let (mut engine, _events) = test_engine();
        let sta = MacAddr::new([1; 6]);
        let own_mac = engine.state.own_mac;

        let (hdr, body) = auth_request_frame(sta, own_mac);
        engine.on_frame(hdr, &body).await;

        let rsne = Rsne::for_ap(Cipher::Ccmp, GroupCipher::Cipher(Cipher::Ccmp));
        let header = MgmtHeader {
            subtype: MgmtSubtype::AssociationRequest,
            da: own_mac,
            sa: sta,
            bssid: own_mac,
        };
        let mut body = Vec::new();
        let cap = Capability {
            ess: true,
            privacy: true,
        };
        body.extend_from_slice(&cap.to_bits().to_le_bytes());
        body.extend_from_slice(&10u16.to_le_bytes());
        ie::write_ie(&mut body, element_id::SSID, b"WrongSSID");
        ie::write_ie(
            &mut body,
            element_id::SUPPORTED_RATES,
            &ie::encode_supported_rates(&choose_rates(false)),
        );
        rsne.write_ie(&mut body);

        engine.on_frame(header, &body).await;

        assert!(!engine
            .state
            .sta_states
            .get(&sta)
            .unwrap()
            .is_associated());
        assert!(engine.handshake_4way.is_empty());
    }

    #[tokio::test]
    async fn akm_mismatch_is_rejected_with_invalid_akmp() {
        let (mut engine, _events) = test_engine();
        let sta = MacAddr::new([1; 6]);
        let own_mac = engine.state.own_mac;

        let (hdr, body) = auth_request_frame(sta, own_mac);
        engine.on_frame(hdr, &body).await;

        let mut rsne = Rsne::for_ap(Cipher::Ccmp, GroupCipher::Cipher(Cipher::Ccmp));
        rsne.akms.clear(); // no AKM proposed at all, so it cannot equal [Psk]
        let (hdr, body) = assoc_request_frame(sta, own_mac, Some(&rsne), None);
        engine.on_frame(hdr, &body).await;

        assert!(!engine
            .state
            .sta_states
            .get(&sta)
            .unwrap()
            .is_associated());
        assert!(engine
            .transport
            .calls
            .iter()
            .all(|c| !matches!(c, crate::testing::KernelCall::NewStation { .. })));
    }

    #[tokio::test]
    async fn wsc_pbc_association_starts_eap_wsc_and_reports_registration_events() {
        let (mut engine, mut events) = test_engine();
        engine.start().await.unwrap();
        assert_eq!(events.recv().await, Some(Event::Started));

        let sta = MacAddr::new([2; 6]);
        let own_mac = engine.state.own_mac;

        engine.push_button().await.unwrap();

        let (hdr, body) = probe_request_frame(sta, own_mac, true);
        engine.on_frame(hdr, &body).await;
        assert!(engine.state.wsc.probe_records().iter().any(|r| r.mac == sta));

        let (hdr, body) = auth_request_frame(sta, own_mac);
        engine.on_frame(hdr, &body).await;

        let (hdr, body) =
            assoc_request_frame(sta, own_mac, None, Some(WscRequestType::EnrolleeOpen8021x));
        engine.on_frame(hdr, &body).await;

        let mut saw_registration_start = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, Event::RegistrationStart { mac, .. } if mac == sta) {
                saw_registration_start = true;
            }
        }
        assert!(saw_registration_start);
        assert!(engine.handshake_wsc.contains_key(&sta));
        assert!(!engine.state.wsc.is_pbc_active());

        engine
            .on_handshake_event(sta, HandshakeEvent::EapNotify(WscNotify::CredentialSent))
            .await;
        assert!(engine.state.wsc.probe_records().is_empty());
    }

    #[tokio::test]
    async fn second_pbc_session_overlap_exits_pbc_with_no_station_to_evict() {
        let (mut engine, mut events) = test_engine();
        engine.start().await.unwrap();
        assert_eq!(events.recv().await, Some(Event::Started));

        let own_mac = engine.state.own_mac;
        let first = MacAddr::new([3; 6]);
        let second = MacAddr::new([4; 6]);

        engine.push_button().await.unwrap();

        let (hdr, body) = probe_request_frame(first, own_mac, true);
        engine.on_frame(hdr, &body).await;

        let (hdr, body) = probe_request_frame(second, own_mac, true);
        engine.on_frame(hdr, &body).await;

        let mut saw_exit = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, Event::PbcModeExit) {
                saw_exit = true;
            }
        }
        assert!(saw_exit);
        assert!(!engine.state.wsc.is_pbc_active());
        // `first` never authenticated/associated, so there is no Station to
        // evict — no del_station/StationRemoved should have been produced.
        assert!(engine
            .transport
            .calls
            .iter()
            .all(|c| !matches!(c, crate::testing::KernelCall::DelStation { .. })));
    }

    #[tokio::test]
    async fn overlap_without_prior_push_button_does_not_emit_pbc_mode_exit() {
        let (mut engine, mut events) = test_engine();
        engine.start().await.unwrap();
        assert_eq!(events.recv().await, Some(Event::Started));

        let own_mac = engine.state.own_mac;
        let first = MacAddr::new([3; 6]);
        let second = MacAddr::new([4; 6]);

        // Two enrollees probe with no `push_button()` ever called: PBC mode
        // was never active, so the overlap must not surface as a spurious
        // `PbcModeExit` (§4.3 step 4 only exits "if PBC mode is active").
        let (hdr, body) = probe_request_frame(first, own_mac, true);
        engine.on_frame(hdr, &body).await;
        let (hdr, body) = probe_request_frame(second, own_mac, true);
        engine.on_frame(hdr, &body).await;

        let mut saw_exit = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, Event::PbcModeExit) {
                saw_exit = true;
            }
        }
        assert!(!saw_exit);
    }

    #[tokio::test]
    async fn overlap_evicts_a_mid_handshake_wsc_only_station() {
        let (mut engine, mut events) = test_engine();
        engine.start().await.unwrap();
        assert_eq!(events.recv().await, Some(Event::Started));
        let own_mac = engine.state.own_mac;

        // `wsc_sta` completes a WSC-only association and is still mid
        // EAP-WSC; its probe record is never cleared by association itself
        // (only a successful registration clears it), so it stays the
        // queue's sole/first entry afterwards.
        let wsc_sta = MacAddr::new([3; 6]);
        engine.push_button().await.unwrap();
        let (hdr, body) = probe_request_frame(wsc_sta, own_mac, true);
        engine.on_frame(hdr, &body).await;
        let (hdr, body) = auth_request_frame(wsc_sta, own_mac);
        engine.on_frame(hdr, &body).await;
        let (hdr, body) =
            assoc_request_frame(wsc_sta, own_mac, None, Some(WscRequestType::EnrolleeOpen8021x));
        engine.on_frame(hdr, &body).await;
        assert!(engine.handshake_wsc.contains_key(&wsc_sta));
        while events.try_recv().is_ok() {}

        // A fresh PBC session plus a second enrollee's probe now names
        // `wsc_sta` as the overlap's eviction candidate: it is associated,
        // has no RSNE, and is still mid EAP-WSC, so it must be evicted.
        engine.push_button().await.unwrap();
        let second = MacAddr::new([6; 6]);
        let (hdr, body) = probe_request_frame(second, own_mac, true);
        engine.on_frame(hdr, &body).await;

        assert!(!engine.state.sta_states.contains_key(&wsc_sta));
        assert!(!engine.handshake_wsc.contains_key(&wsc_sta));
        assert!(engine
            .transport
            .calls
            .iter()
            .any(|c| matches!(c, crate::testing::KernelCall::DelStation { mac, .. } if *mac == wsc_sta)));
        let mut saw_removed = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, Event::StationRemoved { mac, .. } if mac == wsc_sta) {
                saw_removed = true;
            }
        }
        assert!(saw_removed);
    }

    #[tokio::test]
    async fn overlap_does_not_evict_an_rsn_associated_station() {
        let (mut engine, mut events) = test_engine();
        engine.start().await.unwrap();
        assert_eq!(events.recv().await, Some(Event::Started));
        let own_mac = engine.state.own_mac;

        // `rsn_sta` probes with a WSC PBC IE once (e.g. exploratory
        // firmware behavior) but then associates normally via RSN, not
        // WSC. Its stale probe record remains the queue's sole entry.
        let rsn_sta = MacAddr::new([5; 6]);
        engine.push_button().await.unwrap();
        let (hdr, body) = probe_request_frame(rsn_sta, own_mac, true);
        engine.on_frame(hdr, &body).await;
        let (hdr, body) = auth_request_frame(rsn_sta, own_mac);
        engine.on_frame(hdr, &body).await;
        let rsne = Rsne::for_ap(Cipher::Ccmp, GroupCipher::Cipher(Cipher::Ccmp));
        let (hdr, body) = assoc_request_frame(rsn_sta, own_mac, Some(&rsne), None);
        engine.on_frame(hdr, &body).await;
        assert!(engine.state.sta_states.get(&rsn_sta).unwrap().is_associated());
        while events.try_recv().is_ok() {}

        // A fresh PBC session plus a second enrollee's probe names
        // `rsn_sta` as the overlap candidate again, but it is RSN-
        // associated (has an `assoc_rsne`) and not in `handshake_wsc`, so
        // it must survive untouched.
        engine.push_button().await.unwrap();
        let second = MacAddr::new([6; 6]);
        let (hdr, body) = probe_request_frame(second, own_mac, true);
        engine.on_frame(hdr, &body).await;

        assert!(engine.state.sta_states.get(&rsn_sta).unwrap().is_associated());
        assert!(!engine
            .transport
            .calls
            .iter()
            .any(|c| matches!(c, crate::testing::KernelCall::DelStation { mac, .. } if *mac == rsn_sta)));
    }

    #[tokio::test]
    async fn handshake_retry_requeries_gtk_rsc_and_forwards_it() {
        let (mut engine, mut events) = test_engine();
        engine.start().await.unwrap();
        assert_eq!(events.recv().await, Some(Event::Started));
        engine.transport.group_tx_rsc = GtkRsc([7, 0, 0, 0, 0, 0]);

        let sta = MacAddr::new([1; 6]);
        let own_mac = engine.state.own_mac;
        let (hdr, body) = auth_request_frame(sta, own_mac);
        engine.on_frame(hdr, &body).await;
        let rsne = Rsne::for_ap(Cipher::Ccmp, GroupCipher::Cipher(Cipher::Ccmp));
        let (hdr, body) = assoc_request_frame(sta, own_mac, Some(&rsne), None);
        engine.on_frame(hdr, &body).await;

        let handle = engine.handshake_4way[&sta];
        engine.on_handshake_retry(sta).await;

        assert_eq!(
            engine.handshake.rekeyed.last(),
            Some(&(handle, GtkRsc([7, 0, 0, 0, 0, 0])))
        );
    }

    #[tokio::test]
    async fn unsolicited_new_station_synthesizes_associated_and_starts_handshake() {
        let (mut engine, mut events) = test_engine();
        engine.start().await.unwrap();
        assert_eq!(events.recv().await, Some(Event::Started));

        let sta = MacAddr::new([6; 6]);
        let rsne = Rsne::for_ap(Cipher::Ccmp, GroupCipher::Cipher(Cipher::Ccmp));
        let mut ies = Vec::new();
        ie::write_ie(&mut ies, element_id::SSID, b"TestAP");
        ie::write_ie(
            &mut ies,
            element_id::SUPPORTED_RATES,
            &ie::encode_supported_rates(&choose_rates(false)),
        );
        rsne.write_ie(&mut ies);

        engine.on_kernel_new_station(sta, &ies).await;

        assert_eq!(
            engine.state.sta_states.get(&sta).unwrap().state,
            StationState::Associated
        );
        assert_eq!(engine.state.sta_states.get(&sta).unwrap().aid, Some(1));
        assert!(engine.handshake_4way.contains_key(&sta));
    }

    #[tokio::test]
    async fn unsolicited_stop_ap_clears_stations_and_emits_stopping() {
        let (mut engine, mut events) = test_engine();
        engine.start().await.unwrap();
        assert_eq!(events.recv().await, Some(Event::Started));

        let sta = MacAddr::new([1; 6]);
        let own_mac = engine.state.own_mac;
        let (hdr, body) = auth_request_frame(sta, own_mac);
        engine.on_frame(hdr, &body).await;
        assert!(engine.state.sta_states.contains_key(&sta));

        engine.on_kernel_stop_ap().await;

        assert!(engine.state.sta_states.is_empty());
        assert!(engine.state.stopping);
        assert_eq!(events.recv().await, Some(Event::Stopping));
    }

    #[tokio::test]
    async fn deauthentication_during_rsna_emits_station_removed() {
        let (mut engine, mut events) = test_engine();
        engine.start().await.unwrap();
        assert_eq!(events.recv().await, Some(Event::Started));

        let sta = MacAddr::new([5; 6]);
        let own_mac = engine.state.own_mac;

        let (hdr, body) = auth_request_frame(sta, own_mac);
        engine.on_frame(hdr, &body).await;
        let rsne = Rsne::for_ap(Cipher::Ccmp, GroupCipher::Cipher(Cipher::Ccmp));
        let (hdr, body) = assoc_request_frame(sta, own_mac, Some(&rsne), None);
        engine.on_frame(hdr, &body).await;
        engine.on_handshake_event(sta, HandshakeEvent::Complete).await;
        while events.try_recv().is_ok() {}

        let header = MgmtHeader {
            subtype: MgmtSubtype::Deauthentication,
            da: own_mac,
            sa: sta,
            bssid: own_mac,
        };
        let mut body = Vec::new();
        body.extend_from_slice(&DeauthReason::UNSPECIFIED.0.to_le_bytes());
        engine.on_frame(header, &body).await;

        assert!(!engine.state.sta_states.contains_key(&sta));
        let mut saw_removed = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, Event::StationRemoved { mac, .. } if mac == sta) {
                saw_removed = true;
            }
        }
        assert!(saw_removed);
    }
}
