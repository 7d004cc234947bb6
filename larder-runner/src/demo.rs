//! Built-in demonstration jobs.

use std::collections::BTreeMap;

use crate::job::{InventoryCommand, InventoryJob};

/// Two jobs showing the cache and guard layers at work.
///
/// The first runs lazy + cache over a slow store: a miss, a hit, a write
/// that evicts, a miss, then a wait past the TTL and one more miss. The
/// second runs a guard with writes disabled: the read passes and both
/// writes are denied.
pub fn demo_jobs() -> Vec<InventoryJob> {
    vec![
        InventoryJob {
            initial_stock: BTreeMap::from([("SKU-001".to_string(), 10), ("SKU-003".to_string(), 7)]),
            latency_ms: Some(400),
            use_lazy: Some(true),
            use_cache: Some(true),
            ttl_ms: Some(1500),
            use_guard: Some(false),
            can_write: Some(true),
            commands: vec![
                InventoryCommand::get("SKU-001"),
                InventoryCommand::get("SKU-001"),
                InventoryCommand {
                    action: "add".to_string(),
                    ..InventoryCommand::increase("SKU-001", 3)
                },
                InventoryCommand::get("SKU-001"),
                InventoryCommand::wait(1600),
                InventoryCommand::get("SKU-001"),
            ],
        },
        InventoryJob {
            initial_stock: BTreeMap::from([("SKU-002".to_string(), 5)]),
            latency_ms: Some(100),
            use_lazy: Some(false),
            use_cache: Some(false),
            ttl_ms: None,
            use_guard: Some(true),
            can_write: Some(false),
            commands: vec![
                InventoryCommand::get("SKU-002"),
                InventoryCommand::increase("SKU-002", 3),
                InventoryCommand::reserve("SKU-002", 2),
            ],
        },
    ]
}
