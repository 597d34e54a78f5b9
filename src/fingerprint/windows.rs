use super::{is_physical_mac, run_probe_command, HardwareProbe};

const WMIC_PLACEHOLDERS: [&str; 3] = ["", "To be filled by O.E.M.", "(null)"];

/// Windows hardware probe, backed by `wmic` and `getmac`.
#[derive(Debug, Default)]
pub struct WindowsProbe;

impl HardwareProbe for WindowsProbe {
    fn processor_id(&self) -> Option<String> {
        wmic_single_value("cpu", "ProcessorId")
    }

    fn board_id(&self) -> Option<String> {
        // Motherboard serial first, BIOS UUID as the fallback; OEMs ship
        // boards with placeholder serials.
        wmic_single_value("baseboard", "serialnumber")
            .or_else(|| wmic_single_value("csproduct", "uuid"))
    }

    fn storage_ids(&self) -> Vec<String> {
        let Some(output) = run_probe_command("wmic", &["diskdrive", "get", "serialnumber"]) else {
            return Vec::new();
        };

        output
            .lines()
            .skip(1) // column header
            .filter_map(|line| {
                let serial = line.trim();
                (!WMIC_PLACEHOLDERS.contains(&serial)).then(|| serial.to_string())
            })
            .collect()
    }

    fn network_ids(&self) -> Vec<String> {
        let Some(output) = run_probe_command("getmac", &["/fo", "csv", "/nh"]) else {
            return Vec::new();
        };

        output
            .lines()
            .filter_map(|line| {
                let first = line.split(',').next()?;
                let mac = first.trim_matches('"').replace('-', ":").to_ascii_lowercase();
                (mac != "n/a" && is_physical_mac(&mac)).then_some(mac)
            })
            .collect()
    }
}

/// Run `wmic <class> get <property>` and return the single data row below
/// the column header, filtering OEM placeholder values.
fn wmic_single_value(class: &str, property: &str) -> Option<String> {
    let output = run_probe_command("wmic", &[class, "get", property])?;
    let value = output.lines().nth(1)?.trim();
    if WMIC_PLACEHOLDERS.contains(&value) || value.eq_ignore_ascii_case(property) {
        return None;
    }
    Some(value.to_string())
}
