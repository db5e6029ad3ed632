//! Property tests for registry invariants.

use device_registry::{Device, DeviceId, DevicePatch, DeviceRegistry, DeviceStatus, LIVE_STREAM_TRACK};
use proptest::prelude::*;

fn status_strategy() -> impl Strategy<Value = DeviceStatus> {
    prop_oneof![Just(DeviceStatus::Online), Just(DeviceStatus::Offline)]
}

#[derive(Debug, Clone)]
enum Op {
    Volume(usize, u8),
    SetVolume(usize, u8),
    Status(usize, DeviceStatus),
    Select(usize),
    Delete(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..8, any::<u8>()).prop_map(|(i, v)| Op::Volume(i, v)),
        (0usize..8, any::<u8>()).prop_map(|(i, v)| Op::SetVolume(i, v)),
        (0usize..8, status_strategy()).prop_map(|(i, s)| Op::Status(i, s)),
        (0usize..8).prop_map(Op::Select),
        (0usize..8).prop_map(Op::Delete),
    ]
}

proptest! {
    #[test]
    fn volume_stays_in_range(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let registry = DeviceRegistry::new();
        let ids: Vec<DeviceId> = (0..8)
            .map(|i| {
                let device = Device::new(&format!("10.0.0.{i}"), None, DeviceStatus::Online);
                let id = device.id.clone();
                registry.add(device).unwrap();
                id
            })
            .collect();

        for op in ops {
            match op {
                Op::Volume(i, v) => { registry.update(&ids[i], DevicePatch::new().volume(v)); }
                Op::SetVolume(i, v) => { let _ = registry.set_volume(&ids[i], v); }
                Op::Status(i, s) => { registry.update(&ids[i], DevicePatch::new().status(s)); }
                Op::Select(i) => { registry.select(&ids[i]); }
                Op::Delete(i) => { registry.delete(&ids[i]); }
            }

            for device in registry.list() {
                prop_assert!(device.volume <= 100);
            }

            // Selection never points at a removed device
            if let Some(selected) = registry.selected_id() {
                prop_assert!(registry.contains(&selected));
            }
        }
    }

    #[test]
    fn default_name_contains_address(octet in 1u8..255) {
        let address = format!("192.168.0.{octet}");
        let device = Device::new(&address, Some(""), DeviceStatus::Offline);
        prop_assert!(device.name.contains(&address));
    }

    #[test]
    fn select_online_plays_live_stream(status in status_strategy(), playing in any::<bool>()) {
        let registry = DeviceRegistry::new();
        let mut device = Device::new("10.9.9.9", None, status);
        device.is_playing = playing;
        let id = device.id.clone();
        registry.add(device).unwrap();

        let selected = registry.select(&id).unwrap();
        if status.is_online() {
            prop_assert!(selected.is_playing);
            prop_assert_eq!(selected.current_track.as_deref(), Some(LIVE_STREAM_TRACK));
        } else {
            prop_assert_eq!(selected.is_playing, playing);
            prop_assert!(selected.current_track.is_none());
        }
    }

    #[test]
    fn status_counts_sum_to_total(statuses in prop::collection::vec(status_strategy(), 0..20)) {
        let registry = DeviceRegistry::new();
        let mut results = Vec::new();
        for (i, status) in statuses.iter().enumerate() {
            let device = Device::new(&format!("10.1.0.{i}"), None, DeviceStatus::Offline);
            results.push((device.id.clone(), *status));
            registry.add(device).unwrap();
        }

        prop_assert_eq!(registry.apply_statuses(&results), statuses.len());
        let online = registry.online_count();
        let offline = registry.list().iter().filter(|d| !d.is_online()).count();
        prop_assert_eq!(online + offline, statuses.len());
        prop_assert_eq!(online, statuses.iter().filter(|s| s.is_online()).count());
    }
}
