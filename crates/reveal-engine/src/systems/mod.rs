pub mod effects;
pub mod registry;
pub mod trigger;
