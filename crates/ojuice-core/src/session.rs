//! Process attachment lifecycle.

use tracing::info;

use crate::error::{Error, Result};
use crate::process::{ProcessMemory, ProcessProvider};

/// Attachment state for one target process.
///
/// Created detached. `attach` transitions to attached; `detach`,
/// `terminate`, or a failed liveness probe observed by the engine transition
/// back. The session owns the only live memory handle; callers borrow it
/// through [`ProcessSession::memory`] and get `NotAttached` while detached.
pub struct ProcessSession<P: ProcessProvider> {
    provider: P,
    process_name: String,
    module_name: String,
    memory: Option<P::Memory>,
}

impl<P: ProcessProvider> ProcessSession<P> {
    pub fn new(
        provider: P,
        process_name: impl Into<String>,
        module_name: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            process_name: process_name.into(),
            module_name: module_name.into(),
            memory: None,
        }
    }

    pub fn attached(&self) -> bool {
        self.memory.is_some()
    }

    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    /// Open the target process and record its module base. A no-op when
    /// already attached.
    pub fn attach(&mut self) -> Result<()> {
        if self.attached() {
            return Ok(());
        }
        let memory = self.provider.attach(&self.process_name, &self.module_name)?;
        info!(
            "Attached to {} (module base {:#x})",
            self.process_name,
            memory.module_base()
        );
        self.memory = Some(memory);
        Ok(())
    }

    /// Release the process handle. Safe to call when already detached.
    pub fn detach(&mut self) {
        if self.memory.take().is_some() {
            info!("Detached from {}", self.process_name);
        }
    }

    /// Ask the OS to terminate the target, then detach regardless of the
    /// outcome.
    pub fn terminate(&mut self) -> Result<()> {
        let Some(memory) = self.memory.as_ref() else {
            return Err(Error::NotAttached);
        };
        let result = memory.terminate();
        self.detach();
        result
    }

    /// Liveness probe for the attached process; `false` while detached.
    pub fn is_alive(&self) -> bool {
        self.memory.as_ref().is_some_and(|m| m.is_alive())
    }

    pub fn memory(&self) -> Result<&P::Memory> {
        self.memory.as_ref().ok_or(Error::NotAttached)
    }
}
