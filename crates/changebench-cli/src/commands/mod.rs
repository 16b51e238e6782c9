pub mod consume;
pub mod produce;
