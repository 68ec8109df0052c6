pub mod config;
pub mod event;
pub mod gate;
pub mod health;
pub mod profile;
