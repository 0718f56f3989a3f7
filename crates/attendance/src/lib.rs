pub mod clock;
pub mod config;
pub mod error;
pub mod export;
pub mod otp;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AttendanceConfig;
pub use error::{AttendanceError, Result};
pub use export::{CsvExporter, ExportedFile, RecordExporter};
pub use otp::OtpGenerator;
pub use service::AttendanceService;
