use tether_auth::fingerprint::{
    collect_components, compute_device_id, FingerprintComponents, HardwareProbe,
};

/// Probe with fully controlled descriptor sources.
#[derive(Default)]
struct StubProbe {
    processor: Option<String>,
    board: Option<String>,
    storage: Vec<String>,
    network: Vec<String>,
}

impl HardwareProbe for StubProbe {
    fn processor_id(&self) -> Option<String> {
        self.processor.clone()
    }
    fn board_id(&self) -> Option<String> {
        self.board.clone()
    }
    fn storage_ids(&self) -> Vec<String> {
        self.storage.clone()
    }
    fn network_ids(&self) -> Vec<String> {
        self.network.clone()
    }
}

fn full_probe() -> StubProbe {
    StubProbe {
        processor: Some("BFEBFBFF000906EA".to_string()),
        board: Some("L1HF65E00X9".to_string()),
        storage: vec!["S4EVNF0M612345".to_string(), "nvme-WDS100T2B0C".to_string()],
        network: vec![
            "f4:5c:89:aa:bb:cc".to_string(),
            "a0:36:9f:11:22:33".to_string(),
        ],
    }
}

fn digest_format_ok(id: &str) -> bool {
    let groups: Vec<&str> = id.split('-').collect();
    groups.len() == 5
        && [8, 4, 4, 4, 12]
            .iter()
            .zip(&groups)
            .all(|(len, g)| g.len() == *len && g.chars().all(|c| c.is_ascii_hexdigit()))
}

#[test]
fn same_hardware_always_yields_the_same_digest() {
    let a = FingerprintComponents::collect(&full_probe()).digest();
    let b = FingerprintComponents::collect(&full_probe()).digest();
    assert_eq!(a, b);
    assert!(digest_format_ok(a.as_str()), "digest: {}", a);
}

#[test]
fn descriptor_order_does_not_change_the_digest() {
    let mut shuffled = full_probe();
    shuffled.storage.reverse();
    shuffled.network.reverse();

    let a = FingerprintComponents::collect(&full_probe()).digest();
    let b = FingerprintComponents::collect(&shuffled).digest();
    assert_eq!(a, b, "list ordering must not affect the digest");
}

#[test]
fn different_hardware_yields_a_different_digest() {
    let mut other = full_probe();
    other.board = Some("DIFFERENT-BOARD".to_string());

    let a = FingerprintComponents::collect(&full_probe()).digest();
    let b = FingerprintComponents::collect(&other).digest();
    assert_ne!(a, b);
}

#[test]
fn digest_is_producible_with_every_source_unavailable() {
    let degraded = FingerprintComponents::collect(&StubProbe::default());
    let id = degraded.digest();
    assert!(digest_format_ok(id.as_str()));

    // Degradation is deterministic too.
    let again = FingerprintComponents::collect(&StubProbe::default()).digest();
    assert_eq!(id, again);
}

#[test]
fn fallback_slots_are_marked_and_platform_scoped() {
    let degraded = FingerprintComponents::collect(&StubProbe::default());
    assert!(degraded.processor.starts_with("unknown_cpu_"));
    assert!(degraded.board.starts_with("unknown_board_"));
    assert!(degraded.storage.starts_with("unknown_storage_"));
    assert!(degraded.network.starts_with("unknown_mac_"));
}

#[test]
fn match_confidence_scores_component_overlap() {
    let base = FingerprintComponents::collect(&full_probe());

    assert_eq!(base.match_confidence(&base), 1.0);

    // NIC swap only: 4 of 5 slots still agree.
    let mut nic_swapped = full_probe();
    nic_swapped.network = vec!["de:ad:be:ef:00:01".to_string()];
    let nic_swapped = FingerprintComponents::collect(&nic_swapped);
    assert_eq!(base.match_confidence(&nic_swapped), 0.8);

    // Entirely different machine: only the platform slot can agree.
    let other = FingerprintComponents::collect(&StubProbe::default());
    assert!(base.match_confidence(&other) <= 0.2);
}

#[test]
fn real_machine_digest_is_stable_within_a_run() {
    let first = compute_device_id();
    let second = compute_device_id();
    assert_eq!(first, second);
    assert!(digest_format_ok(first.as_str()), "digest: {}", first);
}

#[test]
fn real_machine_components_do_not_contain_volatile_signals() {
    let components = collect_components();

    // Hostname must never leak into the digest inputs.
    if let Ok(hostname) = std::env::var("HOSTNAME") {
        if !hostname.is_empty() {
            for slot in [
                &components.processor,
                &components.board,
                &components.storage,
                &components.network,
            ] {
                assert!(!slot.contains(&hostname));
            }
        }
    }

    // The platform slot is os_arch, nothing else.
    assert_eq!(
        components.platform,
        format!("{}_{}", std::env::consts::OS, std::env::consts::ARCH)
    );
}
