pub mod attendance;
pub mod sessions;
