pub mod data;
pub mod engine;
pub mod events;
