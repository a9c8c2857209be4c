//! # Task Declaration
//!
//! A declaration is the pilot identity plus the task waypoints, captured
//! once and then either embedded into the flight log or sent to external
//! logger devices. Sending can fail per device; embedding cannot.
//!
//! Once a device declaration succeeds the declared state is sticky: a new
//! declaration first needs the user to confirm invalidating the old one.

use tracing::{info, warn};

use crate::config::PilotIdentity;
use crate::error::{NavLoggerError, Result};
use crate::prompt::UserPrompt;
use crate::task::{TaskData, TaskSnapshot};

/// Identity and waypoints at the moment of capture
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub identity: PilotIdentity,
    pub task: TaskSnapshot,
}

impl Declaration {
    /// Snapshot the identity and the current task
    ///
    /// The task lock is held only while the snapshot is copied.
    pub fn capture(identity: &PilotIdentity, task: &dyn TaskData) -> Self {
        Self {
            identity: identity.clone(),
            task: task.snapshot(),
        }
    }
}

/// External device able to store a declaration
#[cfg_attr(test, mockall::automock)]
pub trait LoggerDevice: Send {
    fn name(&self) -> String;

    /// Whether the device accepts declarations at all
    fn is_logger(&self) -> bool;

    /// Transmit the declaration, returning the device error text on failure
    fn declare(&mut self, declaration: &Declaration) -> std::result::Result<(), String>;
}

/// Tracks whether the current task has been declared to a device
#[derive(Debug, Default)]
pub struct DeviceDeclarer {
    declared: bool,
}

impl DeviceDeclarer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_declared(&self) -> bool {
        self.declared
    }

    /// Whether the current declaration may be dropped
    ///
    /// Always `true` when nothing is declared; otherwise asks the user and
    /// clears the declared state on a yes.
    pub fn check_declaration(&mut self, prompt: &dyn UserPrompt) -> bool {
        if !self.declared {
            return true;
        }
        if prompt.confirm("Task declared", "OK to invalidate declaration?") {
            self.declared = false;
            true
        } else {
            false
        }
    }

    /// Offer the declaration to every logger device
    ///
    /// Each logger device is confirmed with the user before transmission.
    /// The declared state follows the outcome of the last transmission.
    ///
    /// # Errors
    ///
    /// - `DeclarationLocked` if the user keeps the existing declaration
    /// - `NoLoggerConnected` if no device accepts declarations
    /// - `Declaration` with the last device failure
    pub fn declare_to_devices(
        &mut self,
        devices: &mut [Box<dyn LoggerDevice>],
        declaration: &Declaration,
        prompt: &dyn UserPrompt,
    ) -> Result<()> {
        if !self.check_declaration(prompt) {
            return Err(NavLoggerError::DeclarationLocked);
        }
        self.declared = false;

        let mut found_logger = false;
        let mut failure = None;

        for device in devices.iter_mut() {
            if !device.is_logger() {
                continue;
            }
            found_logger = true;

            if let Err(e) = self.declare_to(device.as_mut(), declaration, prompt) {
                failure = Some(e);
            }
        }

        if !found_logger {
            prompt.message("", "No logger connected");
            return Err(NavLoggerError::NoLoggerConnected);
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn declare_to(
        &mut self,
        device: &mut dyn LoggerDevice,
        declaration: &Declaration,
        prompt: &dyn UserPrompt,
    ) -> Result<()> {
        let name = device.name();
        if !prompt.confirm(&name, "Declare Task?") {
            return Ok(());
        }

        match device.declare(declaration) {
            Ok(()) => {
                info!(device = %name, waypoints = declaration.task.waypoints.len(), "Task declared");
                prompt.message(&name, "Task Declared!");
                self.declared = true;
                Ok(())
            }
            Err(text) => {
                let text = if text.is_empty() {
                    "Unknown error".to_string()
                } else {
                    text
                };
                warn!(target: "startup", "Error! Task NOT declared : {}", text);
                prompt.message(&name, &format!("Error! Task NOT declared!\n{}", text));
                self.declared = false;
                Err(NavLoggerError::Declaration {
                    device: name,
                    message: text,
                })
            }
        }
    }
}
