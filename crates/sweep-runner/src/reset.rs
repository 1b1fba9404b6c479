// crates/sweep-runner/src/reset.rs
// ============================================================================
// Module: Hardware Reset
// Description: External reset utility invoked after a hung worker.
// Purpose: Clear stuck device state before the next worker opens it.
// Dependencies: sweep-core
// ============================================================================

//! ## Overview
//! [`CommandReset`] runs a configured argv and blocks until it exits. Every
//! `{device_class}` occurrence in the argv is replaced with the device class
//! passed by the executor. [`NoopReset`] is used when no utility is
//! configured.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::process::Command;

use sweep_core::DeviceReset;
use sweep_core::ResetError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Placeholder substituted with the device class.
pub const DEVICE_CLASS_PLACEHOLDER: &str = "{device_class}";

// ============================================================================
// SECTION: Command Reset
// ============================================================================

/// Reset utility launched as a child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReset {
    /// Utility argv template.
    argv: Vec<String>,
}

impl CommandReset {
    /// Creates a reset utility from an argv template.
    #[must_use]
    pub const fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
        }
    }

    /// Returns the argv with the device class substituted.
    #[must_use]
    pub fn resolve(&self, device_class: &str) -> Vec<String> {
        self.argv.iter().map(|arg| arg.replace(DEVICE_CLASS_PLACEHOLDER, device_class)).collect()
    }
}

impl DeviceReset for CommandReset {
    fn reset(&self, device_class: &str) -> Result<(), ResetError> {
        let argv = self.resolve(device_class);
        let Some((program, args)) = argv.split_first() else {
            return Err(ResetError::Launch("reset command is empty".to_string()));
        };
        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|err| ResetError::Launch(format!("{program}: {err}")))?;
        if status.success() {
            Ok(())
        } else {
            Err(ResetError::Failed(format!("{program} exited with {status}")))
        }
    }
}

/// Reset utility that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReset;

impl DeviceReset for NoopReset {
    fn reset(&self, _device_class: &str) -> Result<(), ResetError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
