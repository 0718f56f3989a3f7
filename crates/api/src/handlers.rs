pub mod attendance;
pub mod error;
pub mod export;
pub mod health;
pub mod sessions;
