pub mod api;
pub mod core;
pub mod components;
pub mod systems;
pub mod bridge;
pub mod input;
pub mod assets;
pub mod extensions;

pub use glam;

// Re-export key types at crate root for convenience
pub use api::config::EngineConfig;
pub use api::context::{EffectContext, Trigger};
pub use api::error::{RevealError, Result};
pub use api::page::Page;
pub use api::types::{
    props, AnimHandle, BindingId, EffectId, ElementId, Property, PropertyMap, PropertyWrite, Rect, TweenId,
};
pub use components::animatable::{AnimatableElement, AnimationSpec, Entrance, Repeat};
pub use components::region::Region;
pub use core::surface::{ElementState, ElementStore, Surface};
pub use core::time::{FrameSource, IntervalTimer, ManualFrames};
pub use input::queue::{ViewportEvent, ViewportQueue};
pub use assets::manifest::RevealManifest;
pub use bridge::protocol::WriteBuffer;
pub use systems::effects::{
    Controller, Counter, DecodeSpec, DecodeText, EffectStatus, EffectsState, LoopMotion, MarqueeDirection,
    MarqueeTrack, StaggerReveal, Typewriter,
};
pub use systems::registry::Registry;
pub use systems::trigger::{
    Geometry, ReentryPolicy, ScrollDirection, Threshold, TriggerEvaluator, TriggerEvent, TriggerKind,
};

// Extensions: decoupled interpolation systems
pub use extensions::{ease, lerp, snap_within, Easing, Subject, Tween, TweenScheduler, TweenStatus};
