//! In-memory fakes and frame fixtures for this crate's own tests (§6.1).
//! Feature-gated so a downstream crate gluing in a real `KernelTransport`
//! can still reuse these for its own integration tests.

use std::collections::HashMap;

use crate::error::DeauthReason;
use crate::frame::{ie, MgmtHeader};
use crate::handshake::{
    Eapol4WayHandshake, EapWsc, HandshakeHandle, HandshakeParams, WscParams,
};
use crate::kernel::{
    CommandToken, DelStationMode, GtkRsc, KernelError, KernelTransport, StartApParams,
    StationFlags,
};
use crate::macaddr::MacAddr;
use crate::rates::RateSet;

/// One call recorded by `FakeKernelTransport`, for assertions in scenario
/// tests without hand-rolling a mock per test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelCall {
    StartAp,
    StopAp,
    SetBeacon,
    RegisterFrame(u8),
    UnregisterFrame(u8),
    SendMgmtFrame { subtype: u8, wait_for_ack: bool },
    NewStation { mac: MacAddr, aid: u16 },
    SetStationAssociated(MacAddr),
    SetStationAuthorized(MacAddr),
    SetStationUnauthorized(MacAddr),
    DelStation { mac: MacAddr, mode: DelStationMode },
    NewKeyGroup { key_id: u8 },
    SetKeyDefaultGroup(u8),
    DelKey(u8),
    GetGroupTxRsc(u8),
    NewKeyPairwise(MacAddr),
    SetKeyDefaultPairwise(MacAddr),
}

/// A `KernelTransport` fake that records every call and answers with
/// canned success, so scenario tests in `engine.rs` can drive the whole
/// frame-dispatch/handshake-orchestration pipeline without a real netlink
/// socket.
#[derive(Default)]
pub struct FakeKernelTransport {
    pub calls: Vec<KernelCall>,
    next_token: u64,
    pub fail_start_ap: bool,
    pub fail_send_mgmt_frame: bool,
    pub group_tx_rsc: GtkRsc,
}

impl FakeKernelTransport {
    pub fn new() -> Self {
        FakeKernelTransport {
            group_tx_rsc: GtkRsc::ZERO,
            ..Default::default()
        }
    }

    fn token(&mut self) -> CommandToken {
        self.next_token += 1;
        CommandToken(self.next_token)
    }
}

impl KernelTransport for FakeKernelTransport {
    async fn start_ap(&mut self, _params: StartApParams<'_>) -> Result<CommandToken, KernelError> {
        self.calls.push(KernelCall::StartAp);
        if self.fail_start_ap {
            return Err(KernelError {
                command: "start_ap",
                message: "fake failure".into(),
            });
        }
        Ok(self.token())
    }

    async fn stop_ap(&mut self, _ifindex: u32) -> Result<CommandToken, KernelError> {
        self.calls.push(KernelCall::StopAp);
        Ok(self.token())
    }

    async fn set_beacon(
        &mut self,
        _ifindex: u32,
        _head: &[u8],
        _tail: &[u8],
    ) -> Result<CommandToken, KernelError> {
        self.calls.push(KernelCall::SetBeacon);
        Ok(self.token())
    }

    async fn register_frame(
        &mut self,
        _ifindex: u32,
        subtype: u8,
        _prefix: &[u8],
    ) -> Result<CommandToken, KernelError> {
        self.calls.push(KernelCall::RegisterFrame(subtype));
        Ok(self.token())
    }

    async fn unregister_frame(&mut self, _ifindex: u32, subtype: u8) -> Result<CommandToken, KernelError> {
        self.calls.push(KernelCall::UnregisterFrame(subtype));
        Ok(self.token())
    }

    async fn send_mgmt_frame(
        &mut self,
        _ifindex: u32,
        _freq: u32,
        frame: &[u8],
        wait_for_ack: bool,
        _no_cck: bool,
    ) -> Result<CommandToken, KernelError> {
        let (header, _) = MgmtHeader::parse(frame).expect("fixture frame always parses");
        self.calls.push(KernelCall::SendMgmtFrame {
            subtype: header.subtype.value(),
            wait_for_ack,
        });
        if self.fail_send_mgmt_frame {
            return Err(KernelError {
                command: "send_mgmt_frame",
                message: "fake failure".into(),
            });
        }
        Ok(self.token())
    }

    async fn new_station(
        &mut self,
        _ifindex: u32,
        mac: MacAddr,
        _flags: StationFlags,
        aid: u16,
        _rates: &RateSet,
        _listen_interval: u16,
    ) -> Result<CommandToken, KernelError> {
        self.calls.push(KernelCall::NewStation { mac, aid });
        Ok(self.token())
    }

    async fn set_station_associated(
        &mut self,
        _ifindex: u32,
        mac: MacAddr,
        _aid: u16,
    ) -> Result<CommandToken, KernelError> {
        self.calls.push(KernelCall::SetStationAssociated(mac));
        Ok(self.token())
    }

    async fn set_station_authorized(
        &mut self,
        _ifindex: u32,
        mac: MacAddr,
    ) -> Result<CommandToken, KernelError> {
        self.calls.push(KernelCall::SetStationAuthorized(mac));
        Ok(self.token())
    }

    async fn set_station_unauthorized(
        &mut self,
        _ifindex: u32,
        mac: MacAddr,
    ) -> Result<CommandToken, KernelError> {
        self.calls.push(KernelCall::SetStationUnauthorized(mac));
        Ok(self.token())
    }

    async fn del_station(
        &mut self,
        _ifindex: u32,
        mac: MacAddr,
        _reason: DeauthReason,
        mode: DelStationMode,
    ) -> Result<CommandToken, KernelError> {
        self.calls.push(KernelCall::DelStation { mac, mode });
        Ok(self.token())
    }

    async fn new_key_group(
        &mut self,
        _ifindex: u32,
        _cipher: crate::rates::Cipher,
        key_id: u8,
        _key: &[u8],
        _rsc: GtkRsc,
    ) -> Result<CommandToken, KernelError> {
        self.calls.push(KernelCall::NewKeyGroup { key_id });
        Ok(self.token())
    }

    async fn set_key_default_group(
        &mut self,
        _ifindex: u32,
        key_id: u8,
    ) -> Result<CommandToken, KernelError> {
        self.calls.push(KernelCall::SetKeyDefaultGroup(key_id));
        Ok(self.token())
    }

    async fn del_key(
        &mut self,
        _ifindex: u32,
        key_id: u8,
        _mac: Option<MacAddr>,
    ) -> Result<CommandToken, KernelError> {
        self.calls.push(KernelCall::DelKey(key_id));
        Ok(self.token())
    }

    async fn get_group_tx_rsc(&mut self, _ifindex: u32, key_id: u8) -> Result<GtkRsc, KernelError> {
        self.calls.push(KernelCall::GetGroupTxRsc(key_id));
        Ok(self.group_tx_rsc)
    }

    async fn new_key_pairwise(
        &mut self,
        _ifindex: u32,
        _cipher: crate::rates::Cipher,
        mac: MacAddr,
        _key: &[u8],
    ) -> Result<CommandToken, KernelError> {
        self.calls.push(KernelCall::NewKeyPairwise(mac));
        Ok(self.token())
    }

    async fn set_key_default_pairwise(
        &mut self,
        _ifindex: u32,
        mac: MacAddr,
    ) -> Result<CommandToken, KernelError> {
        self.calls.push(KernelCall::SetKeyDefaultPairwise(mac));
        Ok(self.token())
    }
}

/// A 4-Way Handshake fake that never completes on its own; scenario tests
/// drive completion/failure explicitly via `Engine::on_handshake_event`.
#[derive(Default)]
pub struct FakeHandshake {
    next_handle: u64,
    pub started: Vec<MacAddr>,
    pub stopped: Vec<HandshakeHandle>,
    pub rekeyed: Vec<(HandshakeHandle, GtkRsc)>,
}

impl FakeHandshake {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&mut self) -> HandshakeHandle {
        self.next_handle += 1;
        HandshakeHandle(self.next_handle)
    }
}

impl Eapol4WayHandshake for FakeHandshake {
    async fn start(&mut self, params: HandshakeParams<'_>) -> HandshakeHandle {
        self.started.push(params.sta);
        self.handle()
    }

    async fn stop(&mut self, handle: HandshakeHandle) {
        self.stopped.push(handle);
    }

    async fn rekey_gtk(&mut self, handle: HandshakeHandle, gtk_rsc: GtkRsc) {
        self.rekeyed.push((handle, gtk_rsc));
    }
}

/// An EAP-WSC fake, analogous to `FakeHandshake`.
#[derive(Default)]
pub struct FakeEapWsc {
    next_handle: u64,
    pub started: Vec<MacAddr>,
    pub stopped: Vec<HandshakeHandle>,
}

impl FakeEapWsc {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&mut self) -> HandshakeHandle {
        self.next_handle += 1;
        HandshakeHandle(self.next_handle)
    }
}

impl EapWsc for FakeEapWsc {
    async fn start(&mut self, params: WscParams<'_>) -> HandshakeHandle {
        self.started.push(params.sta);
        self.handle()
    }

    async fn stop(&mut self, handle: HandshakeHandle) {
        self.stopped.push(handle);
    }
}

/// Builds a bare 802.11 management frame body (no fixed fields) carrying
/// just the given IEs, for fixtures that only need the IE block.
pub fn ies_only(push: impl FnOnce(&mut Vec<u8>)) -> Vec<u8> {
    let mut out = Vec::new();
    push(&mut out);
    out
}

/// Builds an Open System Authentication Request body (transaction sequence
/// 1), the frame a Station sends before (re)association.
pub fn auth_request_body() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0u16.to_le_bytes()); // open system
    out.extend_from_slice(&1u16.to_le_bytes()); // transaction sequence 1
    out
}

/// Builds a minimal Probe Request body carrying only a wildcard SSID IE.
pub fn wildcard_probe_request_body() -> Vec<u8> {
    let mut out = Vec::new();
    ie::write_ie(&mut out, crate::frame::element_id::SSID, &[]);
    out
}
