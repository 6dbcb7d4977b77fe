//! Review, referral and renewal workflow engine for municipal health card applications.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
