//! Device command transport boundary
//!
//! Extensions issue device commands through this trait. Implementations own
//! one session to one device; calls on it are made one after another.

use anyhow::Result;

/// An open command session to a single device
pub trait CommandTransport: Send {
    /// Run an exec-mode command and return its output
    fn send_command(&mut self, command: &str) -> Result<String>;

    /// Send a block of configuration commands
    fn send_config(&mut self, commands: &[String]) -> Result<String>;

    /// Persist the running configuration
    fn save_config(&mut self) -> Result<String>;

    /// Release the session
    fn close(&mut self) {}
}
