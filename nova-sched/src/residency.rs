//! Residency tracking for named assets
//!
//! Records when each asset was last used and, when callers know it, where
//! it lives (CPU/GPU) and how big it is. Observation only: nothing here
//! loads, evicts or pins anything.
//!
//! The table only grows; eviction and a capacity bound are deferred to the
//! phase that starts acting on residency.

use nova_common::time::now_ms;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Coarse residency state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetState {
    #[default]
    Unloaded,
    CpuMmap,
    CpuHot,
    GpuFull,
    GpuPartial,
}

/// One tracked asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidencyAsset {
    pub asset_id: String,
    pub state: AssetState,
    pub bytes_total: u64,
    pub bytes_gpu_resident: u64,
    /// Epoch milliseconds of the latest touch
    pub last_used_ts_ms: i64,
    pub pin_priority: i32,
}

impl ResidencyAsset {
    fn new(asset_id: &str) -> Self {
        Self {
            asset_id: asset_id.to_string(),
            state: AssetState::Unloaded,
            bytes_total: 0,
            bytes_gpu_resident: 0,
            last_used_ts_ms: 0,
            pin_priority: 0,
        }
    }
}

/// Fields a touch may set; `None` leaves the stored value alone
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetUpdate {
    pub state: Option<AssetState>,
    pub bytes_total: Option<u64>,
    pub bytes_gpu_resident: Option<u64>,
    pub pin_priority: Option<i32>,
}

impl AssetUpdate {
    pub fn state(mut self, state: AssetState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn bytes_total(mut self, bytes: u64) -> Self {
        self.bytes_total = Some(bytes);
        self
    }

    pub fn bytes_gpu_resident(mut self, bytes: u64) -> Self {
        self.bytes_gpu_resident = Some(bytes);
        self
    }

    pub fn pin_priority(mut self, priority: i32) -> Self {
        self.pin_priority = Some(priority);
        self
    }
}

/// Point-in-time copy of the residency table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidencySnapshot {
    pub assets: Vec<ResidencyAsset>,
    pub asset_count: usize,
}

#[derive(Debug, Default)]
struct Table {
    // Insertion order is kept so snapshots list assets in first-touch order
    assets: Vec<ResidencyAsset>,
    index: HashMap<String, usize>,
}

/// Residency table keyed by asset id
#[derive(Debug, Default)]
pub struct ResidencyGraph {
    table: Mutex<Table>,
}

impl ResidencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Upsert `asset_id` and refresh its last-used time
    ///
    /// Unknown ids are created in state `unloaded`. The timestamp never moves
    /// backwards even if the wall clock does.
    pub fn touch(&self, asset_id: &str, update: AssetUpdate) {
        self.touch_at(asset_id, update, now_ms());
    }

    fn touch_at(&self, asset_id: &str, update: AssetUpdate, now: i64) {
        let mut table = self.lock();
        let existing = table.index.get(asset_id).copied();
        let slot = match existing {
            Some(slot) => slot,
            None => {
                let slot = table.assets.len();
                table.assets.push(ResidencyAsset::new(asset_id));
                table.index.insert(asset_id.to_string(), slot);
                slot
            }
        };

        let asset = &mut table.assets[slot];
        if let Some(state) = update.state {
            asset.state = state;
        }
        if let Some(bytes) = update.bytes_total {
            asset.bytes_total = bytes;
        }
        if let Some(bytes) = update.bytes_gpu_resident {
            asset.bytes_gpu_resident = bytes;
        }
        if let Some(priority) = update.pin_priority {
            asset.pin_priority = priority;
        }
        asset.last_used_ts_ms = asset.last_used_ts_ms.max(now);
    }

    /// Owned copy of the table as it is right now
    pub fn snapshot(&self) -> ResidencySnapshot {
        let table = self.lock();
        ResidencySnapshot {
            assets: table.assets.clone(),
            asset_count: table.assets.len(),
        }
    }

    pub fn get(&self, asset_id: &str) -> Option<ResidencyAsset> {
        let table = self.lock();
        table.index.get(asset_id).map(|&slot| table.assets[slot].clone())
    }

    pub fn len(&self) -> usize {
        self.lock().assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_first_touch_creates_unloaded() {
        let graph = ResidencyGraph::new();
        graph.touch("node:1", AssetUpdate::default());

        let asset = graph.get("node:1").unwrap();
        assert_eq!(asset.state, AssetState::Unloaded);
        assert_eq!(asset.bytes_total, 0);
        assert_eq!(asset.bytes_gpu_resident, 0);
        assert_eq!(asset.pin_priority, 0);
        assert!(asset.last_used_ts_ms > 0);
    }

    #[test]
    fn test_touch_updates_only_supplied_fields() {
        let graph = ResidencyGraph::new();
        graph.touch(
            "model:sdxl",
            AssetUpdate::default().state(AssetState::GpuFull).bytes_total(6_000_000_000),
        );
        graph.touch("model:sdxl", AssetUpdate::default().bytes_gpu_resident(4_000));

        let asset = graph.get("model:sdxl").unwrap();
        assert_eq!(asset.state, AssetState::GpuFull);
        assert_eq!(asset.bytes_total, 6_000_000_000);
        assert_eq!(asset.bytes_gpu_resident, 4_000);

        graph.touch("model:sdxl", AssetUpdate::default().state(AssetState::CpuMmap).pin_priority(3));
        let asset = graph.get("model:sdxl").unwrap();
        assert_eq!(asset.state, AssetState::CpuMmap);
        assert_eq!(asset.bytes_total, 6_000_000_000);
        assert_eq!(asset.pin_priority, 3);
    }

    #[test]
    fn test_touch_refreshes_timestamp() {
        let graph = ResidencyGraph::new();
        graph.touch("a", AssetUpdate::default());
        let first = graph.get("a").unwrap().last_used_ts_ms;
        std::thread::sleep(Duration::from_millis(5));
        graph.touch("a", AssetUpdate::default());
        let second = graph.get("a").unwrap().last_used_ts_ms;
        assert!(second > first);
    }

    #[test]
    fn test_clock_going_back_keeps_timestamp() {
        let graph = ResidencyGraph::new();
        graph.touch_at("model:vae", AssetUpdate::default(), 1000);
        graph.touch_at(
            "model:vae",
            AssetUpdate::default().state(AssetState::CpuHot).bytes_total(2048),
            500,
        );

        let asset = graph.get("model:vae").unwrap();
        assert_eq!(asset.last_used_ts_ms, 1000);
        assert_eq!(asset.state, AssetState::CpuHot);
        assert_eq!(asset.bytes_total, 2048);

        graph.touch_at("model:vae", AssetUpdate::default(), 1500);
        assert_eq!(graph.get("model:vae").unwrap().last_used_ts_ms, 1500);
    }

    #[test]
    fn test_snapshot_is_a_copy_in_touch_order() {
        let graph = ResidencyGraph::new();
        graph.touch("b", AssetUpdate::default());
        graph.touch("a", AssetUpdate::default());
        graph.touch("b", AssetUpdate::default());

        let snapshot = graph.snapshot();
        assert_eq!(snapshot.asset_count, 2);
        let ids: Vec<&str> = snapshot.assets.iter().map(|a| a.asset_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);

        graph.touch("c", AssetUpdate::default());
        assert_eq!(snapshot.asset_count, 2);
        assert_eq!(graph.snapshot().asset_count, 3);
    }

    #[test]
    fn test_snapshot_serialization_shape() {
        let graph = ResidencyGraph::new();
        graph.touch("node:7", AssetUpdate::default().state(AssetState::GpuPartial));
        let value = serde_json::to_value(graph.snapshot()).unwrap();
        assert_eq!(value["asset_count"], 1);
        assert_eq!(value["assets"][0]["asset_id"], "node:7");
        assert_eq!(value["assets"][0]["state"], "gpu_partial");
        assert!(value["assets"][0]["last_used_ts_ms"].is_i64());
    }

    #[test]
    fn test_concurrent_touches() {
        let graph = std::sync::Arc::new(ResidencyGraph::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let graph = graph.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        graph.touch(&format!("asset:{}", (t * 50 + i) % 120), AssetUpdate::default());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(graph.len(), 120);
    }
}
