pub mod animatable;
pub mod region;
