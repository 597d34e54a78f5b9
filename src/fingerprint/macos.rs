use super::{is_physical_mac, run_probe_command, HardwareProbe};

/// macOS hardware probe, backed by `sysctl`, `ioreg` and `ifconfig`.
#[derive(Debug, Default)]
pub struct MacosProbe;

impl HardwareProbe for MacosProbe {
    fn processor_id(&self) -> Option<String> {
        run_probe_command("sysctl", &["-n", "machdep.cpu.brand_string"])
    }

    fn board_id(&self) -> Option<String> {
        let output = run_probe_command("ioreg", &["-rd1", "-c", "IOPlatformExpertDevice"])?;
        ioreg_value(&output, "IOPlatformUUID")
            .or_else(|| ioreg_value(&output, "IOPlatformSerialNumber"))
    }

    fn storage_ids(&self) -> Vec<String> {
        let Some(output) = run_probe_command("system_profiler", &["SPStorageDataType"]) else {
            return Vec::new();
        };

        output
            .lines()
            .filter_map(|line| {
                let (key, value) = line.split_once(':')?;
                if key.trim() == "Device / Media Name" {
                    let value = value.trim();
                    (!value.is_empty()).then(|| value.to_string())
                } else {
                    None
                }
            })
            .collect()
    }

    fn network_ids(&self) -> Vec<String> {
        let Some(output) = run_probe_command("ifconfig", &[]) else {
            return Vec::new();
        };

        output
            .lines()
            .filter_map(|line| {
                let rest = line.trim_start().strip_prefix("ether ")?;
                let mac = rest.split_whitespace().next()?.to_ascii_lowercase();
                is_physical_mac(&mac).then_some(mac)
            })
            .collect()
    }
}

/// Extract a quoted value from `ioreg -rd1` output, e.g.
/// `"IOPlatformUUID" = "xxxx-..."`.
fn ioreg_value(output: &str, key: &str) -> Option<String> {
    for line in output.lines() {
        if !line.contains(key) {
            continue;
        }
        let (_, value) = line.split_once('=')?;
        let value = value.trim().trim_matches('"');
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }
    None
}
