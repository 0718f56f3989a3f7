pub mod rate_limit;

pub use rate_limit::{rate_limit_submit, rate_limit_verify};
