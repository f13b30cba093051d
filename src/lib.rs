// src/lib.rs
//! Transcript Insight: job-backed meeting transcript and LinkedIn icebreaker analysis

pub mod analysis;
pub mod cli;
pub mod core;
pub mod jobs;
pub mod types;
pub mod web;

#[cfg(test)]
pub(crate) mod testing;

#[doc(hidden)]
pub use tracing as __tracing;

pub use web::start_web_server;

/// Application log entry point: `app_log!(info, "...")`, with optional
/// structured fields before the message.
#[macro_export]
macro_rules! app_log {
    ($level:ident, $($arg:tt)+) => {
        $crate::__tracing::$level!($($arg)+)
    };
}
