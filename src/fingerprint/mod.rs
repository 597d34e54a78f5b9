//! Device identity generation.
//!
//! Derives a stable, opaque digest from multiple hardware signals so that
//! the same machine always produces the same id and a different machine
//! produces a different one. No single source is trusted on its own, and
//! no volatile signal (IP address, hostname, clock) ever enters the digest.

use sha2::{Digest, Sha256};

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "windows")]
mod windows;

#[cfg(target_os = "linux")]
pub use linux::LinuxProbe as PlatformProbe;
#[cfg(target_os = "macos")]
pub use macos::MacosProbe as PlatformProbe;
#[cfg(target_os = "windows")]
pub use windows::WindowsProbe as PlatformProbe;

/// Fallback probe for platforms without a dedicated implementation. Every
/// slot degrades to its deterministic fallback; the digest is still
/// producible, just with lower uniqueness confidence.
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
#[derive(Debug, Default)]
pub struct PlatformProbe;

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
impl HardwareProbe for PlatformProbe {
    fn processor_id(&self) -> Option<String> {
        None
    }
    fn board_id(&self) -> Option<String> {
        None
    }
    fn storage_ids(&self) -> Vec<String> {
        Vec::new()
    }
    fn network_ids(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Opaque device identifier: a SHA-256 digest over the collected hardware
/// descriptors, rendered as grouped hex for readability.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(digest: impl Into<String>) -> Self {
        DeviceId(digest.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One hardware descriptor source per slot, implemented per platform.
///
/// Returning `None` / an empty list means the source is unavailable on this
/// machine (permissions, missing tooling); the collector substitutes a
/// deterministic fallback rather than aborting.
pub trait HardwareProbe {
    fn processor_id(&self) -> Option<String>;
    fn board_id(&self) -> Option<String>;
    /// Serial numbers of fixed storage devices.
    fn storage_ids(&self) -> Vec<String>;
    /// MAC addresses of physical network interfaces. Implementations must
    /// exclude loopback and virtual interfaces.
    fn network_ids(&self) -> Vec<String>;
}

/// The collected descriptor set, one string per slot, fallbacks already
/// substituted. The digest concatenates the slots in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintComponents {
    pub processor: String,
    pub board: String,
    pub storage: String,
    pub network: String,
    pub platform: String,
}

impl FingerprintComponents {
    /// Collect all descriptors from the given probe. Lists are sorted so
    /// enumeration order never changes the digest.
    pub fn collect(probe: &dyn HardwareProbe) -> Self {
        let platform = format!(
            "{}_{}",
            std::env::consts::OS,
            std::env::consts::ARCH
        );

        let processor = probe
            .processor_id()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("unknown_cpu_{}", platform));

        let board = probe
            .board_id()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("unknown_board_{}", platform));

        let mut storage_ids = probe.storage_ids();
        storage_ids.retain(|s| !s.is_empty());
        storage_ids.sort();
        storage_ids.dedup();
        let storage = if storage_ids.is_empty() {
            format!("unknown_storage_{}", platform)
        } else {
            storage_ids.join("|")
        };

        let mut macs = probe.network_ids();
        macs.retain(|m| !m.is_empty());
        macs.sort();
        macs.dedup();
        let network = if macs.is_empty() {
            format!("unknown_mac_{}", platform)
        } else {
            macs.join("|")
        };

        FingerprintComponents {
            processor,
            board,
            storage,
            network,
            platform,
        }
    }

    /// Reduce the components to the final digest:
    /// `sha256(processor|board|storage|network|platform)` formatted as
    /// `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`.
    pub fn digest(&self) -> DeviceId {
        let combined = [
            self.processor.as_str(),
            self.board.as_str(),
            self.storage.as_str(),
            self.network.as_str(),
            self.platform.as_str(),
        ]
        .join("|");

        let mut hasher = Sha256::new();
        hasher.update(combined.as_bytes());
        let hash = hex::encode(hasher.finalize());

        DeviceId(format!(
            "{}-{}-{}-{}-{}",
            &hash[..8],
            &hash[8..12],
            &hash[12..16],
            &hash[16..20],
            &hash[20..32]
        ))
    }

    /// Component-by-component similarity against another collected set, in
    /// `[0.0, 1.0]`. A network-only difference still scores high because
    /// NICs get swapped far more often than boards or CPUs. Only a
    /// diagnostic aid; the login path uses the opaque digest alone.
    pub fn match_confidence(&self, other: &FingerprintComponents) -> f32 {
        let slots = [
            (&self.processor, &other.processor),
            (&self.board, &other.board),
            (&self.storage, &other.storage),
            (&self.network, &other.network),
            (&self.platform, &other.platform),
        ];
        let matched = slots.iter().filter(|(a, b)| a == b).count();
        matched as f32 / slots.len() as f32
    }
}

/// Compute this machine's device identifier using the platform probe.
///
/// Reads local hardware metadata only; never touches the network.
pub fn compute_device_id() -> DeviceId {
    let components = FingerprintComponents::collect(&PlatformProbe::default());
    let id = components.digest();
    tracing::debug!(device_id = %id, "computed device fingerprint");
    id
}

/// Collect the raw component set, for diagnostics and confidence scoring.
pub fn collect_components() -> FingerprintComponents {
    FingerprintComponents::collect(&PlatformProbe::default())
}

/// MAC prefixes of common virtual interfaces (docker bridges, hyper-v,
/// vmware). These change when containers or VMs are created, so they are
/// never part of the digest.
const VIRTUAL_MAC_PREFIXES: [&str; 3] = ["02:42:", "00:15:5d:", "00:50:56:"];

pub(crate) fn is_physical_mac(mac: &str) -> bool {
    let mac = mac.to_ascii_lowercase();
    if mac.is_empty() || mac == "00:00:00:00:00:00" {
        return false;
    }
    !VIRTUAL_MAC_PREFIXES.iter().any(|p| mac.starts_with(p))
}

/// Run an external probe command, returning trimmed stdout on success.
#[allow(dead_code)]
pub(crate) fn run_probe_command(program: &str, args: &[&str]) -> Option<String> {
    let output = std::process::Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn physical_mac_filter_rejects_virtual_prefixes() {
        assert!(is_physical_mac("f4:5c:89:aa:bb:cc"));
        assert!(!is_physical_mac("02:42:ac:11:00:02"));
        assert!(!is_physical_mac("00:15:5D:01:02:03"));
        assert!(!is_physical_mac("00:50:56:9a:bb:cc"));
        assert!(!is_physical_mac("00:00:00:00:00:00"));
        assert!(!is_physical_mac(""));
    }
}
