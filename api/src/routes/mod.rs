pub mod events;
pub mod gate;
pub mod health;
pub mod profiles;
pub mod system;
