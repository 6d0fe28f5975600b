use crate::api::config::EngineConfig;
use crate::api::context::EffectContext;
use crate::api::error::Result;
use crate::core::surface::ElementStore;

/// The contract every animated page fulfils.
pub trait Page {
    /// Return engine configuration. Called once before init.
    fn config(&self) -> EngineConfig {
        EngineConfig::default()
    }

    /// Declare effects. Elements are already present in `surface`.
    fn init(&mut self, ctx: &mut EffectContext, surface: &mut ElementStore) -> Result<()>;

    /// Per-frame hook, called before the context ticks.
    fn update(&mut self, _ctx: &mut EffectContext, _surface: &mut ElementStore, _dt: f32) {}
}
