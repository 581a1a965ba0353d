//! Process-wide secondary pipeline.
//!
//! Startup builds a second [`PipelineInstance`] from the same registrations as
//! the primary and installs it here exactly once. Background work (scheduled
//! checks, the `invoke` command) then calls [`invoke`] to get fully formatted
//! responses without going through a socket or the primary's middleware.

use once_cell::sync::OnceCell;
use std::fmt;
use tracing::info;

use crate::dispatcher::HandlerResponse;
use crate::pipeline::{PipelineInstance, PipelineRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondaryError {
    /// `install` was called a second time
    AlreadyInstalled,
    /// `invoke` was called before `install`
    NotInstalled,
}

impl fmt::Display for SecondaryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecondaryError::AlreadyInstalled => f.write_str("secondary pipeline already installed"),
            SecondaryError::NotInstalled => f.write_str("secondary pipeline not installed"),
        }
    }
}

impl std::error::Error for SecondaryError {}

/// Single-assignment slot holding a pipeline instance.
///
/// Written once, read lock-free afterwards. Never rebuilt or replaced.
pub struct SecondaryInvoker {
    slot: OnceCell<PipelineInstance>,
}

impl SecondaryInvoker {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slot: OnceCell::new(),
        }
    }

    /// # Errors
    ///
    /// [`SecondaryError::AlreadyInstalled`] if the slot is already filled; the
    /// passed instance is dropped and the installed one stays.
    pub fn install(&self, instance: PipelineInstance) -> Result<(), SecondaryError> {
        let label = instance.label().to_string();
        self.slot
            .set(instance)
            .map_err(|_| SecondaryError::AlreadyInstalled)?;
        info!(instance = %label, "Secondary pipeline installed");
        Ok(())
    }

    #[must_use]
    pub fn get(&self) -> Option<&PipelineInstance> {
        self.slot.get()
    }

    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Run `request` through the installed instance.
    ///
    /// # Errors
    ///
    /// [`SecondaryError::NotInstalled`] before [`SecondaryInvoker::install`].
    pub fn invoke(&self, request: PipelineRequest) -> Result<HandlerResponse, SecondaryError> {
        self.slot
            .get()
            .map(|instance| instance.call(request))
            .ok_or(SecondaryError::NotInstalled)
    }
}

impl Default for SecondaryInvoker {
    fn default() -> Self {
        Self::new()
    }
}

static SECONDARY: SecondaryInvoker = SecondaryInvoker::new();

/// Install the process-wide secondary instance.
///
/// # Errors
///
/// See [`SecondaryInvoker::install`].
pub fn install(instance: PipelineInstance) -> Result<(), SecondaryError> {
    SECONDARY.install(instance)
}

#[must_use]
pub fn get() -> Option<&'static PipelineInstance> {
    SECONDARY.get()
}

#[must_use]
pub fn is_installed() -> bool {
    SECONDARY.is_installed()
}

/// Run `request` through the process-wide secondary instance.
///
/// # Errors
///
/// [`SecondaryError::NotInstalled`] before [`install`].
pub fn invoke(request: PipelineRequest) -> Result<HandlerResponse, SecondaryError> {
    SECONDARY.invoke(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{build, Registrations};
    use crate::value::ResultValue;
    use http::Method;

    fn instance() -> PipelineInstance {
        build(
            &Registrations::new("/api")
                .with_default_media_type(Some("text/plain"))
                .handler("hello", |_| Ok(ResultValue::Text("hello".into())))
                .route(Method::GET, "/hello", "hello"),
        )
        .unwrap()
    }

    #[test]
    fn test_invoke_before_install() {
        let invoker = SecondaryInvoker::new();
        assert!(!invoker.is_installed());
        assert_eq!(
            invoker.invoke(PipelineRequest::get("/api/hello")).unwrap_err(),
            SecondaryError::NotInstalled
        );
    }

    #[test]
    fn test_install_once() {
        let invoker = SecondaryInvoker::new();
        invoker.install(instance()).unwrap();
        assert_eq!(
            invoker.install(instance()),
            Err(SecondaryError::AlreadyInstalled)
        );
        let resp = invoker.invoke(PipelineRequest::get("/api/hello")).unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, b"hello");
        assert_eq!(resp.content_type(), Some("text/plain"));
    }
}
