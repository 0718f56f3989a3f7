pub mod connection;
pub mod error;
pub mod memory;
pub mod repositories;
pub mod store;

pub use connection::{Database, DatabaseConfig};
pub use error::{DatabaseError, Result};
pub use memory::{MemoryAttendanceLedger, MemorySessionStore};
pub use repositories::{attendance::AttendanceRepository, sessions::SessionRepository};
pub use store::{AttendanceLedger, SessionStore};
