pub mod engine;
pub mod request;
pub mod results;
