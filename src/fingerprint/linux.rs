use std::fs;
use std::path::Path;

use super::{is_physical_mac, HardwareProbe};

const DMI_PLACEHOLDERS: [&str; 3] = ["", "To be filled by O.E.M.", "None"];

/// Linux hardware probe. Everything comes from procfs/sysfs reads, no
/// subprocesses and no elevated privileges required (board serials that
/// need root simply degrade to the next source).
#[derive(Debug, Default)]
pub struct LinuxProbe;

impl HardwareProbe for LinuxProbe {
    fn processor_id(&self) -> Option<String> {
        let cpuinfo = fs::read_to_string("/proc/cpuinfo").ok()?;

        // ARM SoCs expose a hardware serial; x86 does not, so fall back to
        // the model name, which is stable for a given machine.
        for line in cpuinfo.lines() {
            if let Some(value) = field_value(line, "Serial") {
                return Some(value);
            }
        }
        cpuinfo
            .lines()
            .find_map(|line| field_value(line, "model name"))
    }

    fn board_id(&self) -> Option<String> {
        for path in [
            "/sys/class/dmi/id/board_serial",
            "/sys/class/dmi/id/product_uuid",
            "/sys/class/dmi/id/board_name",
        ] {
            if let Ok(data) = fs::read_to_string(path) {
                let data = data.trim();
                if !DMI_PLACEHOLDERS.contains(&data) {
                    return Some(data.to_string());
                }
            }
        }
        None
    }

    fn storage_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();

        // /dev/disk/by-id names embed the device serial and exist without
        // any special permissions. Partitions are skipped: they duplicate
        // the parent disk's serial.
        if let Ok(entries) = fs::read_dir("/dev/disk/by-id") {
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().into_owned();
                if (name.starts_with("ata-") || name.starts_with("nvme-"))
                    && !name.contains("-part")
                {
                    ids.push(name);
                }
            }
        }

        if !ids.is_empty() {
            return ids;
        }

        // Fallback: sysfs block device serials (virtio and some nvme).
        if let Ok(entries) = fs::read_dir("/sys/block") {
            for entry in entries.flatten() {
                let serial_path = entry.path().join("device/serial");
                if let Ok(serial) = fs::read_to_string(serial_path) {
                    let serial = serial.trim();
                    if !serial.is_empty() {
                        ids.push(serial.to_string());
                    }
                }
            }
        }

        ids
    }

    fn network_ids(&self) -> Vec<String> {
        let mut macs = Vec::new();

        let Ok(entries) = fs::read_dir("/sys/class/net") else {
            return macs;
        };

        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == "lo" {
                continue;
            }
            // Interfaces without a backing device node are virtual (veth,
            // bridges, tunnels).
            if !Path::new(&format!("/sys/class/net/{}/device", name)).exists() {
                continue;
            }
            if let Ok(address) = fs::read_to_string(entry.path().join("address")) {
                let mac = address.trim().to_ascii_lowercase();
                if is_physical_mac(&mac) {
                    macs.push(mac);
                }
            }
        }

        macs
    }
}

fn field_value(line: &str, key: &str) -> Option<String> {
    let (name, value) = line.split_once(':')?;
    if name.trim().eq_ignore_ascii_case(key) {
        let value = value.trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }
    None
}
