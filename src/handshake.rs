//! Handshake Orchestrator (C5) collaborator surface: §4.5.
//!
//! The 4-Way Handshake and EAP-WSC state machines themselves are out of
//! scope for this core (spec.md §1) — a caller supplies an implementation
//! of `Eapol4WayHandshake` and/or `EapWsc` backed by a real EAPoL engine.
//! This module only defines the boundary: what the orchestrator hands the
//! collaborator to start a session, and the single event stream it reads
//! back.

use crate::error::DeauthReason;
use crate::frame::Rsne;
use crate::kernel::GtkRsc;
use crate::macaddr::MacAddr;

/// Opaque handle to a running handshake session, used only to stop it
/// (Station removal, idle-hook teardown on WSC `FAILED`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeHandle(pub u64);

/// What the orchestrator hands a 4-Way Handshake collaborator to start a
/// session (§4.5 "RSN association", step 3).
pub struct HandshakeParams<'a> {
    pub sta: MacAddr,
    /// 32-byte PMK (the AP's PSK).
    pub pmk: [u8; 32],
    /// The STA's advertised RSNE from its (re)association request.
    pub supplicant_ie: &'a Rsne,
    /// The AP's own advertised RSNE.
    pub authenticator_ie: &'a Rsne,
    pub gtk: &'a [u8],
    pub gtk_index: u8,
    pub gtk_rsc: GtkRsc,
}

/// What the orchestrator hands an EAP-WSC collaborator to start a PBC
/// registration (§4.5 "WSC association").
pub struct WscParams<'a> {
    pub sta: MacAddr,
    pub ssid: &'a [u8],
    pub psk: [u8; 32],
    pub uuid_e: [u8; 16],
    pub uuid_r: [u8; 16],
}

/// WSC EAP-Notify subtypes the orchestrator cares about (§4.5: only
/// `CREDENTIAL_SENT` drives behavior; others are ignored).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WscNotify {
    CredentialSent,
}

/// The single event stream both collaborators report through (spec.md §9
/// "variadic handshake-event callback").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeEvent {
    /// 4-Way Handshake completed; Station may transition to
    /// `RsnaEstablished`.
    Complete,
    /// Handshake failed; forward `reason` to the kernel as a deauth and
    /// remove the Station.
    Failed(DeauthReason),
    /// Key installation failed after a successful handshake; remove the
    /// Station without a specific deauth reason.
    SettingKeysFailed,
    /// EAP-WSC notification, e.g. credential delivery.
    EapNotify(WscNotify),
}

/// Authenticator side of the 4-Way Handshake (§4.5 "RSN association").
#[allow(async_fn_in_trait)]
pub trait Eapol4WayHandshake {
    async fn start(&mut self, params: HandshakeParams<'_>) -> HandshakeHandle;
    async fn stop(&mut self, handle: HandshakeHandle);
    /// Re-drives GTK (re)installation on a 4-Way Handshake retry (§4.5
    /// "Key rekey"); the orchestrator re-queries the GTK RSC and passes the
    /// fresh value through.
    async fn rekey_gtk(&mut self, handle: HandshakeHandle, gtk_rsc: GtkRsc);
}

/// Registrar side of EAP-WSC (§4.5 "WSC association").
#[allow(async_fn_in_trait)]
pub trait EapWsc {
    async fn start(&mut self, params: WscParams<'_>) -> HandshakeHandle;
    async fn stop(&mut self, handle: HandshakeHandle);
}
