//! Property-Based Tests for Snapshot Construction
//!
//! # Test Properties
//!
//! 1. **Ordering**: used never exceeds total for memory and disk
//! 2. **Range**: CPU always lands in `[0, 100]`
//! 3. **Degradation**: a failed query zeroes exactly its own fields

#![cfg(test)]

use proptest::prelude::*;

use super::ports::{DiskUsage, MemoryUsage, Metrics, StatQuery};

fn memory_strategy() -> impl Strategy<Value = Option<MemoryUsage>> {
    prop::option::of((any::<u64>(), any::<u64>()).prop_map(|(u, t)| MemoryUsage::new(u, t)))
}

fn disk_strategy() -> impl Strategy<Value = Option<DiskUsage>> {
    prop::option::of((any::<u64>(), any::<u64>()).prop_map(|(u, t)| DiskUsage::new(u, t)))
}

fn cpu_strategy() -> impl Strategy<Value = Option<f64>> {
    prop::option::of(prop_oneof![
        -1000.0f64..1000.0,
        Just(f64::NAN),
        Just(f64::INFINITY),
    ])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_used_never_exceeds_total(
        cpu in cpu_strategy(),
        memory in memory_strategy(),
        disk in disk_strategy(),
    ) {
        let m = Metrics::from_readings(cpu, memory, disk);
        prop_assert!(m.memory_used_mb <= m.memory_total_mb);
        prop_assert!(m.disk_used_gb <= m.disk_total_gb);
    }

    #[test]
    fn prop_cpu_in_range(cpu in cpu_strategy()) {
        let m = Metrics::from_readings(cpu, None, None);
        prop_assert!(m.cpu_usage_percent >= 0.0);
        prop_assert!(m.cpu_usage_percent <= 100.0);
    }

    #[test]
    fn prop_failure_only_zeroes_own_fields(
        used in 0u64..1 << 40,
        extra in 0u64..1 << 40,
    ) {
        let disk = DiskUsage::new(used, used + extra);
        let m = Metrics::from_readings(Some(50.0), None, Some(disk));
        let expected = Metrics::from_readings(Some(50.0), Some(MemoryUsage::default()), Some(disk));

        prop_assert_eq!(m.memory_used_mb, 0);
        prop_assert_eq!(m.memory_total_mb, 0);
        prop_assert_eq!(m.disk_used_gb, expected.disk_used_gb);
        prop_assert_eq!(m.disk_total_gb, expected.disk_total_gb);
        prop_assert_eq!(m.unavailable, vec![StatQuery::Memory]);
    }
}
