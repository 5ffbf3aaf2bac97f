//! Local pairing address resolution.
//!
//! The pairing code encodes the tablet's own LAN address so the handset
//! knows where to connect.  Resolution is a pure query over the host's
//! network interfaces: the first non-loopback IPv4 address wins.  IPv6
//! addresses are skipped; the handset-side scanner expects a dotted-quad
//! string with no colon characters.

use thiserror::Error;
use tracing::debug;

/// Sentinel returned when no routable IPv4 address exists (e.g. Wi-Fi off).
pub const FALLBACK_ADDRESS: &str = "0.0.0.0";

/// Errors that can occur while resolving the pairing address.
#[derive(Debug, Error)]
pub enum AddressError {
    /// The OS interface enumeration itself failed.
    #[error("failed to enumerate network interfaces: {0}")]
    Enumerate(#[from] std::io::Error),
}

/// Returns the first non-loopback IPv4 address of this host, or the
/// [`FALLBACK_ADDRESS`] sentinel when no interface carries one.
///
/// # Errors
///
/// Returns [`AddressError::Enumerate`] when the interface list cannot be
/// read at all.  Callers treat this as recoverable: record the error and
/// fall back to the sentinel.
pub fn resolve_local_ipv4() -> Result<String, AddressError> {
    let interfaces = if_addrs::get_if_addrs()?;

    for interface in &interfaces {
        if interface.is_loopback() {
            continue;
        }
        let ip = interface.ip();
        if ip.is_ipv4() {
            debug!("pairing address resolved to {ip} on {}", interface.name);
            return Ok(ip.to_string());
        }
    }

    debug!("no non-loopback IPv4 interface found; using {FALLBACK_ADDRESS}");
    Ok(FALLBACK_ADDRESS.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
