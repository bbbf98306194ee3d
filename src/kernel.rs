//! Kernel command surface (§6): the abstract operations this core issues
//! against a netlink-backed driver. The real transport (genetlink/nl80211)
//! is out of scope (spec.md §1); callers supply an implementation of
//! `KernelTransport`.

use std::fmt;

use crate::macaddr::MacAddr;
use crate::rates::{Cipher, GroupCipher, RateSet};

/// Opaque handle returned by every suspending `KernelTransport` method.
/// The core only ever compares these for equality when cancelling pending
/// commands on Station removal (§5 "Cancellation"); it never interprets
/// the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandToken(pub u64);

/// Tx Receive-Sequence-Counter queried back from the kernel after a GTK
/// install (§4.5 point 2, §9 Open Question: "GTK RSC query" — always
/// queried, never assumed zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GtkRsc(pub [u8; 6]);

impl GtkRsc {
    pub const ZERO: GtkRsc = GtkRsc([0; 6]);
}

/// A failure reported back from the kernel transport for a single command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelError {
    pub command: &'static str,
    pub message: String,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.command, self.message)
    }
}

impl std::error::Error for KernelError {}

/// Whether `del_station` should deauthenticate or merely disassociate
/// (§6 "del_station(ifindex, mac, reason, disassoc|deauth)").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelStationMode {
    Disassociate,
    Deauthenticate,
}

/// `new_station` flags (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StationFlags {
    pub authenticated: bool,
    pub associated: bool,
}

/// Parameters for starting the AP (§4.6 Start, step 4).
pub struct StartApParams<'a> {
    pub ifindex: u32,
    pub beacon_head: &'a [u8],
    pub beacon_tail: &'a [u8],
    pub ssid: &'a [u8],
    pub hidden: bool,
    pub dtim: u8,
    pub beacon_interval: u16,
    pub channel: u8,
    pub width_mhz: u16,
    pub pairwise_ciphers: Vec<Cipher>,
    pub group_cipher: GroupCipher,
    pub wpa_version: u8,
    pub control_port_over_nl: bool,
}

/// The kernel command surface (§6), realized as async methods of a trait a
/// caller implements over their netlink transport. Every method returns a
/// `CommandToken` alongside its eventual result so the engine can cancel it
/// per §5's Station-removal rule.
#[allow(async_fn_in_trait)]
pub trait KernelTransport {
    async fn start_ap(&mut self, params: StartApParams<'_>) -> Result<CommandToken, KernelError>;
    async fn stop_ap(&mut self, ifindex: u32) -> Result<CommandToken, KernelError>;
    async fn set_beacon(
        &mut self,
        ifindex: u32,
        head: &[u8],
        tail: &[u8],
    ) -> Result<CommandToken, KernelError>;
    async fn register_frame(
        &mut self,
        ifindex: u32,
        subtype: u8,
        prefix: &[u8],
    ) -> Result<CommandToken, KernelError>;
    /// Not itemized as its own line in §6, but implied by Stop's
    /// "unregister frame subscriptions" — the inverse of `register_frame`.
    async fn unregister_frame(&mut self, ifindex: u32, subtype: u8) -> Result<CommandToken, KernelError>;
    async fn send_mgmt_frame(
        &mut self,
        ifindex: u32,
        freq: u32,
        frame: &[u8],
        wait_for_ack: bool,
        no_cck: bool,
    ) -> Result<CommandToken, KernelError>;

    async fn new_station(
        &mut self,
        ifindex: u32,
        mac: MacAddr,
        flags: StationFlags,
        aid: u16,
        rates: &RateSet,
        listen_interval: u16,
    ) -> Result<CommandToken, KernelError>;
    async fn set_station_associated(
        &mut self,
        ifindex: u32,
        mac: MacAddr,
        aid: u16,
    ) -> Result<CommandToken, KernelError>;
    async fn set_station_authorized(
        &mut self,
        ifindex: u32,
        mac: MacAddr,
    ) -> Result<CommandToken, KernelError>;
    async fn set_station_unauthorized(
        &mut self,
        ifindex: u32,
        mac: MacAddr,
    ) -> Result<CommandToken, KernelError>;
    async fn del_station(
        &mut self,
        ifindex: u32,
        mac: MacAddr,
        reason: crate::error::DeauthReason,
        mode: DelStationMode,
    ) -> Result<CommandToken, KernelError>;

    async fn new_key_group(
        &mut self,
        ifindex: u32,
        cipher: Cipher,
        key_id: u8,
        key: &[u8],
        rsc: GtkRsc,
    ) -> Result<CommandToken, KernelError>;
    async fn set_key_default_group(
        &mut self,
        ifindex: u32,
        key_id: u8,
    ) -> Result<CommandToken, KernelError>;
    async fn del_key(
        &mut self,
        ifindex: u32,
        key_id: u8,
        mac: Option<MacAddr>,
    ) -> Result<CommandToken, KernelError>;
    async fn get_group_tx_rsc(
        &mut self,
        ifindex: u32,
        key_id: u8,
    ) -> Result<GtkRsc, KernelError>;

    async fn new_key_pairwise(
        &mut self,
        ifindex: u32,
        cipher: Cipher,
        mac: MacAddr,
        key: &[u8],
    ) -> Result<CommandToken, KernelError>;
    async fn set_key_default_pairwise(
        &mut self,
        ifindex: u32,
        mac: MacAddr,
    ) -> Result<CommandToken, KernelError>;
}
