use std::collections::BTreeMap;

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Unique identifier for a mounted UI region.
/// Assigned by the host page; stable for the lifetime of the mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub u32);

/// Handle to a registered animatable element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimHandle(pub u32);

/// Handle to a tween for later reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TweenId(pub u32);

/// Handle to a viewport trigger binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(pub u32);

/// Handle to an effect controller owned by an `EffectContext`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(pub u32);

/// Numeric properties the engine knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Property {
    Opacity,
    TranslateX,
    TranslateY,
    TranslateZ,
    Scale,
    /// Degrees.
    Rotate,
    /// Degrees.
    RotateX,
    /// Degrees.
    RotateY,
    /// Percent of the parent width.
    Width,
    /// Percent of the parent height.
    Height,
    ClipPathRadius,
    /// Integer display value of a counter.
    Count,
}

impl Property {
    pub const ALL: [Property; 12] = [
        Property::Opacity,
        Property::TranslateX,
        Property::TranslateY,
        Property::TranslateZ,
        Property::Scale,
        Property::Rotate,
        Property::RotateX,
        Property::RotateY,
        Property::Width,
        Property::Height,
        Property::ClipPathRadius,
        Property::Count,
    ];

    /// Wire code written into the host buffer.
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Resting value of an element that was never animated.
    pub fn neutral(self) -> f32 {
        match self {
            Property::Opacity | Property::Scale => 1.0,
            _ => 0.0,
        }
    }
}

/// Property → value. Ordered so subject lists come out deterministic.
pub type PropertyMap = BTreeMap<Property, f32>;

/// Build a `PropertyMap` from `(property, value)` pairs.
pub fn props<const N: usize>(pairs: [(Property, f32); N]) -> PropertyMap {
    pairs.into_iter().collect()
}

/// Element bounds in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self { left, top, width, height }
    }

    pub fn min(&self) -> Vec2 {
        Vec2::new(self.left, self.top)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn center(&self) -> Vec2 {
        self.min() + self.size() * 0.5
    }
}

/// One applied property value, as handed to the host.
/// All fields are f32 so the buffer can be read as a flat Float32Array;
/// element ids above 2^24 would alias, see `bridge::protocol::check_wire_id`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct PropertyWrite {
    pub element: f32,
    pub property: f32,
    pub value: f32,
    pub _pad: f32,
}

impl PropertyWrite {
    pub const FLOATS: usize = 4;

    pub fn new(element: ElementId, property: Property, value: f32) -> Self {
        Self {
            element: element.0 as f32,
            property: property.code() as f32,
            value,
            _pad: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_codes_round_trip() {
        for p in Property::ALL {
            assert_eq!(Property::from_code(p.code()), Some(p));
        }
        assert_eq!(Property::from_code(99), None);
    }

    #[test]
    fn rect_center() {
        let r = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(r.center(), Vec2::new(60.0, 45.0));
    }

    #[test]
    fn property_map_parses_camel_case_keys() {
        let map: PropertyMap = serde_json::from_str(r#"{ "opacity": 0.0, "translateY": 50.0 }"#).unwrap();
        assert_eq!(map.get(&Property::TranslateY), Some(&50.0));
        assert_eq!(map.len(), 2);
    }
}
