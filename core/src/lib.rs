pub mod engine;
pub mod error;
pub mod events;
pub mod gate;
pub mod indicators;
pub mod profile;
pub mod readiness;
pub mod store;
