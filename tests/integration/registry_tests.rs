//! End-to-end registry behavior: ingest, change detection and listener
//! fan-out across the public API.

use std::collections::HashMap;

use simdeck::value::{DatarefRegistry, RawValue};

use crate::mock::CountingListener;

fn ingest_one(registry: &mut DatarefRegistry, path: &str, value: f64) {
    registry.ingest(std::iter::once((path.to_owned(), RawValue::Number(value))));
    registry.detect_changed();
}

#[test]
fn change_notifications_reach_monitored_listeners() {
    let mut registry = DatarefRegistry::new();
    registry.end_startup();
    let path = registry.register("sim/cockpit/autopilot/heading").unwrap();
    let listener = CountingListener::new();
    let id = registry.register_listener(listener.clone());
    registry.add_listener(&path, id);
    registry.add_to_monitor([path.as_str()]);

    ingest_one(&mut registry, &path, 270.0);
    assert_eq!(listener.changed_count(), 1); // None -> value transition
    assert_eq!(listener.updated_count(), 1);

    ingest_one(&mut registry, &path, 270.0);
    // Same value as last seen: skipped entirely.
    assert_eq!(listener.changed_count(), 1);
    assert_eq!(listener.updated_count(), 1);

    ingest_one(&mut registry, &path, 275.0);
    assert_eq!(listener.changed_count(), 2);
}

#[test]
fn unmonitored_paths_update_silently() {
    let mut registry = DatarefRegistry::new();
    registry.end_startup();
    let path = registry.register("sim/time/zulu_time_sec").unwrap();
    let listener = CountingListener::new();
    let id = registry.register_listener(listener.clone());
    registry.add_listener(&path, id);
    // Never added to monitoring: values are stored but no change cascade.

    ingest_one(&mut registry, &path, 43_200.0);
    assert_eq!(listener.changed_count(), 0);
    assert_eq!(
        registry.get_value(&path),
        Some(RawValue::Number(43_200.0))
    );
}

#[test]
fn late_subscriber_sees_last_known_value() {
    let mut registry = DatarefRegistry::new();
    registry.end_startup();
    let path = registry.register("sim/flightmodel/position/indicated_airspeed").unwrap();
    registry.add_to_monitor([path.as_str()]);
    ingest_one(&mut registry, &path, 250.0);

    // A page attaching later reads the stored value directly.
    let listener = CountingListener::new();
    let id = registry.register_listener(listener.clone());
    registry.add_listener(&path, id);
    assert_eq!(registry.get_value(&path), Some(RawValue::Number(250.0)));

    ingest_one(&mut registry, &path, 251.0);
    assert_eq!(listener.changed_count(), 1);
}

#[test]
fn rounding_acts_as_deadband() {
    let mut registry = DatarefRegistry::new();
    registry.end_startup();
    let mut roundings = HashMap::new();
    roundings.insert("sim/weather/barometer_sealevel_inhg".to_owned(), 1);
    registry.set_roundings(roundings);

    let path = registry.register("sim/weather/barometer_sealevel_inhg").unwrap();
    let listener = CountingListener::new();
    let id = registry.register_listener(listener.clone());
    registry.add_listener(&path, id);
    registry.add_to_monitor([path.as_str()]);

    ingest_one(&mut registry, &path, 29.92);
    assert_eq!(listener.changed_count(), 1);
    // 29.92 -> 29.93 both round to 29.9: updated, not changed.
    ingest_one(&mut registry, &path, 29.93);
    assert_eq!(listener.changed_count(), 1);
    assert_eq!(listener.updated_count(), 2);
    // 29.97 rounds to 30.0: a real change.
    ingest_one(&mut registry, &path, 29.97);
    assert_eq!(listener.changed_count(), 2);
}

#[test]
fn monitor_refcount_survives_shared_use() {
    let mut registry = DatarefRegistry::new();
    registry.end_startup();
    let path = registry.register("sim/cockpit/radios/com1_freq").unwrap();

    // Two pages monitor the same path; one leaving keeps it live.
    registry.add_to_monitor([path.as_str()]);
    registry.add_to_monitor([path.as_str()]);
    assert_eq!(registry.monitor_count(&path), 2);

    registry.remove_from_monitor([path.as_str()]);
    assert_eq!(registry.monitor_count(&path), 1);

    let listener = CountingListener::new();
    let id = registry.register_listener(listener.clone());
    registry.add_listener(&path, id);
    ingest_one(&mut registry, &path, 118.5);
    assert_eq!(listener.changed_count(), 1);

    registry.remove_from_monitor([path.as_str()]);
    assert_eq!(registry.monitor_count(&path), 0);
}

#[test]
fn unregistered_listener_stops_receiving() {
    let mut registry = DatarefRegistry::new();
    registry.end_startup();
    let path = registry.register("sim/cockpit/gear/handle").unwrap();
    let listener = CountingListener::new();
    let id = registry.register_listener(listener.clone());
    registry.add_listener(&path, id);
    registry.add_to_monitor([path.as_str()]);

    ingest_one(&mut registry, &path, 1.0);
    assert_eq!(listener.changed_count(), 1);

    assert!(registry.unregister_listener(id));
    ingest_one(&mut registry, &path, 0.0);
    assert_eq!(listener.changed_count(), 1);
    assert_eq!(registry.listener_count(), 0);
}

#[test]
fn array_siblings_share_declared_length() {
    let mut registry = DatarefRegistry::new();
    registry.end_startup();
    let third = registry.register("sim/flightmodel/engine/n1[3]").unwrap();
    let first = registry.register("sim/flightmodel/engine/n1[0]").unwrap();
    // The higher index already raised the shared length for the base.
    let d = registry.get(&first).unwrap();
    assert!(d.length().is_some_and(|len| len >= 4));
    let d = registry.get(&third).unwrap();
    assert!(d.length().is_some_and(|len| len >= 4));
}

#[test]
fn internal_paths_are_never_monitored() {
    let mut registry = DatarefRegistry::new();
    registry.end_startup();
    let path = registry.register("data:page/current").unwrap();
    registry.add_to_monitor([path.as_str()]);
    assert_eq!(registry.monitor_count(&path), 0);

    // Internal values still store and notify.
    let listener = CountingListener::new();
    let id = registry.register_listener(listener.clone());
    registry.add_listener(&path, id);
    ingest_one(&mut registry, &path, 2.0);
    assert_eq!(registry.get_value(&path), Some(RawValue::Number(2.0)));
}

#[test]
fn concurrent_ingest_from_many_threads() {
    let mut registry = DatarefRegistry::new();
    registry.end_startup();
    let paths: Vec<String> = (0..8)
        .map(|i| registry.register(&format!("sim/test/value_{i}")).unwrap())
        .collect();
    let listener = CountingListener::new();
    let id = registry.register_listener(listener.clone());
    for path in &paths {
        registry.add_listener(path, id);
        registry.add_to_monitor([path.as_str()]);
    }

    std::thread::scope(|scope| {
        for (i, path) in paths.iter().enumerate() {
            let registry = &registry;
            scope.spawn(move || {
                for round in 0..50 {
                    registry.ingest(std::iter::once((
                        path.clone(),
                        RawValue::Number((i * 1000 + round) as f64),
                    )));
                }
            });
        }
    });

    registry.detect_changed();
    // Exactly one change per path: the detector sees only the final
    // snapshot state, whatever the interleaving was.
    assert_eq!(listener.changed_count(), paths.len());
    for (i, path) in paths.iter().enumerate() {
        assert_eq!(
            registry.get_value(path),
            Some(RawValue::Number((i * 1000 + 49) as f64))
        );
    }
}

#[test]
fn text_values_flow_like_numbers() {
    let mut registry = DatarefRegistry::new();
    registry.end_startup();
    let path = registry.register("sim/aircraft/view/acf_tailnum:s").unwrap();
    let listener = CountingListener::new();
    let id = registry.register_listener(listener.clone());
    registry.add_listener(&path, id);
    registry.add_to_monitor([path.as_str()]);

    registry.ingest(std::iter::once((
        path.clone(),
        RawValue::Text("N12345".to_owned()),
    )));
    registry.detect_changed();
    assert_eq!(listener.changed_count(), 1);
    let change = listener.last_change.lock().unwrap().clone();
    assert_eq!(
        change,
        Some((path, Some(RawValue::Text("N12345".to_owned()))))
    );
}
