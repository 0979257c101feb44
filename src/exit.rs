// src/exit.rs
//! Process exit codes for `cppsieve`.
//!
//! Provides a stable contract for scripts and CI.

use std::process::Termination;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum CppsieveExit {
    /// Scan completed. Findings alone do not fail outside CI mode.
    Success = 0,
    /// CI mode and at least one finding at or above `warning`.
    Findings = 1,
    /// Bad arguments, missing paths, or invalid configuration.
    InvalidInput = 2,
    /// Internal error, or a unit failed analysis in CI mode.
    Error = 3,
}

impl CppsieveExit {
    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl Termination for CppsieveExit {
    fn report(self) -> std::process::ExitCode {
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        std::process::ExitCode::from(self.code() as u8)
    }
}
