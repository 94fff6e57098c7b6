/// Adapter metadata catalog
///
/// Read-only descriptions of the external data adapters available for wiring:
/// which sources can feed workflow inputs and which sinks can receive
/// outputs. The compiler never interprets this metadata; it exists to
/// validate and display adapter/source/sink ids. Served lock-free from an
/// ArcSwap so the catalog can be re-seeded at runtime without blocking
/// readers.

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};

/// A browsable grouping node in an adapter's source/sink hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThingNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// A readable data endpoint offered by an adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterSource {
    pub id: String,
    pub name: String,
    /// Filter keys this source understands (e.g. timestamp ranges).
    #[serde(default)]
    pub filter_keys: Vec<String>,
}

/// A writable data endpoint offered by an adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterSink {
    pub id: String,
    pub name: String,
}

/// Everything known about one external data adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub thing_nodes: Vec<ThingNode>,
    #[serde(default)]
    pub sources: Vec<AdapterSource>,
    #[serde(default)]
    pub sinks: Vec<AdapterSink>,
}

/// Lock-free adapter catalog. Reads clone an Arc; re-seeding swaps the whole
/// map atomically.
#[derive(Debug, Default)]
pub struct AdapterCatalog {
    adapters: ArcSwap<HashMap<String, AdapterMetadata>>,
}

impl AdapterCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire catalog.
    pub fn seed(&self, adapters: Vec<AdapterMetadata>) {
        let map: HashMap<String, AdapterMetadata> = adapters
            .into_iter()
            .map(|adapter| (adapter.id.clone(), adapter))
            .collect();
        tracing::info!("seeded adapter catalog with {} adapters", map.len());
        self.adapters.store(Arc::new(map));
    }

    pub fn get(&self, adapter_id: &str) -> Option<AdapterMetadata> {
        self.adapters.load().get(adapter_id).cloned()
    }

    pub fn list(&self) -> Vec<AdapterMetadata> {
        let mut adapters: Vec<AdapterMetadata> = self.adapters.load().values().cloned().collect();
        adapters.sort_by(|a, b| a.id.cmp(&b.id));
        adapters
    }

    /// Whether the given adapter offers the given source. Unknown adapters
    /// report false; an empty catalog never blocks a wiring (metadata is
    /// advisory).
    pub fn knows_source(&self, adapter_id: &str, source_id: &str) -> bool {
        self.adapters
            .load()
            .get(adapter_id)
            .map(|adapter| adapter.sources.iter().any(|source| source.id == source_id))
            .unwrap_or(false)
    }

    pub fn knows_sink(&self, adapter_id: &str, sink_id: &str) -> bool {
        self.adapters
            .load()
            .get(adapter_id)
            .map(|adapter| adapter.sinks.iter().any(|sink| sink.id == sink_id))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_adapter() -> AdapterMetadata {
        AdapterMetadata {
            id: "demo-adapter".to_string(),
            name: "Demo Adapter".to_string(),
            thing_nodes: vec![],
            sources: vec![AdapterSource {
                id: "plant1.temperature".to_string(),
                name: "Temperature".to_string(),
                filter_keys: vec!["timestampFrom".to_string(), "timestampTo".to_string()],
            }],
            sinks: vec![AdapterSink {
                id: "plant1.anomaly_score".to_string(),
                name: "Anomaly Score".to_string(),
            }],
        }
    }

    #[test]
    fn seeding_replaces_the_catalog() {
        let catalog = AdapterCatalog::new();
        catalog.seed(vec![demo_adapter()]);
        assert!(catalog.get("demo-adapter").is_some());
        assert!(catalog.knows_source("demo-adapter", "plant1.temperature"));
        assert!(catalog.knows_sink("demo-adapter", "plant1.anomaly_score"));

        catalog.seed(vec![]);
        assert!(catalog.get("demo-adapter").is_none());
        assert!(!catalog.knows_source("demo-adapter", "plant1.temperature"));
    }
}
