pub mod actions;
pub mod agents;
pub mod fleet;
pub mod workers;
