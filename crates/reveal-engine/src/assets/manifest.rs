use serde::{Deserialize, Serialize};

use crate::api::config::EngineConfig;
use crate::api::error::Result;
use crate::api::types::ElementId;
use crate::components::region::Region;

/// Page manifest: the region trees to mount, plus optional config overrides.
/// Loaded from a JSON file shipped with the page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RevealManifest {
    #[serde(default)]
    pub config: Option<EngineConfig>,
    #[serde(default)]
    pub regions: Vec<Region>,
}

impl RevealManifest {
    /// Parse a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let manifest: Self = serde_json::from_str(json)?;
        if let Some(config) = &manifest.config {
            config.validate()?;
        }
        Ok(manifest)
    }

    /// Every element id named anywhere in the manifest, in document order.
    pub fn element_ids(&self) -> Vec<ElementId> {
        self.regions
            .iter()
            .flat_map(|root| root.walk())
            .map(|region| region.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_manifest_with_config() {
        let json = r#"{
            "config": { "sectionMarker": "reveal", "rngSeed": 9 },
            "regions": [
                { "id": 1, "classes": ["reveal"], "children": [{ "id": 2 }] },
                { "id": 3 }
            ]
        }"#;
        let manifest = RevealManifest::from_json(json).unwrap();
        let config = manifest.config.as_ref().unwrap();
        assert_eq!(config.section_marker, "reveal");
        assert_eq!(config.decode.ticks, 15);
        assert_eq!(manifest.element_ids(), vec![ElementId(1), ElementId(2), ElementId(3)]);
    }

    #[test]
    fn parse_minimal_manifest() {
        let manifest = RevealManifest::from_json("{}").unwrap();
        assert!(manifest.config.is_none());
        assert!(manifest.regions.is_empty());
    }
}
