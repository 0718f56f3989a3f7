pub mod attendance;
pub mod session;
pub mod validation;

pub use attendance::{
    AttendanceRecord, AttendanceStatus, StudentIdentity, SubmitAttendanceRequest,
    VerifyOtpRequest,
};
pub use session::{
    IssuedOtp, NewSession, Session, SessionPublicView, SessionState, SessionSummary,
    SessionView,
};
