use serde::{Deserialize, Serialize};

use crate::api::types::ElementId;
use crate::components::animatable::Entrance;
use crate::systems::trigger::{ReentryPolicy, Threshold};

/// A node of the page's region tree as the host describes it at mount.
///
/// Regions carrying the configured marker class get an entrance animation;
/// unmarked regions are only walked for their children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub id: ElementId,
    #[serde(default)]
    pub classes: Vec<String>,
    /// Declared entrance; the configured default is used when absent.
    #[serde(default)]
    pub entrance: Option<Entrance>,
    #[serde(default)]
    pub threshold: Option<Threshold>,
    #[serde(default)]
    pub policy: Option<ReentryPolicy>,
    #[serde(default)]
    pub children: Vec<Region>,
}

impl Region {
    pub fn new(id: ElementId) -> Self {
        Self {
            id,
            classes: Vec::new(),
            entrance: None,
            threshold: None,
            policy: None,
            children: Vec::new(),
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_entrance(mut self, entrance: Entrance) -> Self {
        self.entrance = Some(entrance);
        self
    }

    pub fn with_threshold(mut self, threshold: Threshold) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_policy(mut self, policy: ReentryPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn with_child(mut self, child: Region) -> Self {
        self.children.push(child);
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Depth-first, parents before children, including `self`.
    pub fn walk(&self) -> Vec<&Region> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(region) = stack.pop() {
            out.push(region);
            stack.extend(region.children.iter().rev());
        }
        out
    }

    /// Every region in the tree carrying `marker`, in document order.
    pub fn find_marked(&self, marker: &str) -> Vec<&Region> {
        self.walk().into_iter().filter(|r| r.has_class(marker)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marked_regions_in_document_order() {
        let page = Region::new(ElementId(0))
            .with_child(
                Region::new(ElementId(1))
                    .with_class("animate-section")
                    .with_child(Region::new(ElementId(2)).with_class("animate-section")),
            )
            .with_child(Region::new(ElementId(3)))
            .with_child(Region::new(ElementId(4)).with_class("animate-section"));

        let ids: Vec<u32> = page.find_marked("animate-section").iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec![1, 2, 4]);
        assert_eq!(page.walk().len(), 5);
    }

    #[test]
    fn parse_region_tree() {
        let json = r#"{
            "id": 1,
            "classes": ["animate-section"],
            "policy": "replayEachEntry",
            "entrance": {
                "initial": { "opacity": 0.0, "scale": 0.8 },
                "target": { "opacity": 1.0, "scale": 1.0 },
                "spec": { "durationMs": 600, "easing": "back.out(1.7)" }
            },
            "children": [{ "id": 2 }]
        }"#;
        let region: Region = serde_json::from_str(json).unwrap();
        assert_eq!(region.policy, Some(ReentryPolicy::ReplayEachEntry));
        let entrance = region.entrance.unwrap();
        assert_eq!(entrance.spec.duration_ms, 600.0);
        assert_eq!(region.children[0].id, ElementId(2));
        assert!(region.children[0].classes.is_empty());
    }
}
