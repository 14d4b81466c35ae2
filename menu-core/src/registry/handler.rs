//! ``src/registry/handler.rs``
//!
//! # `HandlerRef`: Named, Shared Action Callables
//!
//! Handlers are owned by whoever registers them. The registry only keeps a
//! cheap clone of the reference and compares handlers by pointer identity,
//! so the same callable reached through two call sites deduplicates.

use compact_str::CompactString;
use std::{fmt, sync::Arc};

/// Callable shape of every action handler: no arguments at invocation time.
pub type HandlerFn = dyn Fn() + Send + Sync;

/// Pointer identity of a handler's shared callable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(usize);

/// A named reference to an externally owned action callable.
#[derive(Clone)]
pub struct HandlerRef {
    name: CompactString,
    func: Arc<HandlerFn>,
    enabled: bool,
}

impl HandlerRef {
    /// Wrap a callable. `name` is the default tag and the action identifier
    /// written to menu documents.
    pub fn new<F>(name: impl Into<CompactString>, func: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
            enabled: true,
        }
    }

    /// Disabled no-op stand-in for a handler that could not be resolved.
    /// Every placeholder gets its own identity.
    pub fn placeholder(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(|| {}),
            enabled: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> HandlerId {
        HandlerId(Arc::as_ptr(&self.func).cast::<()>() as usize)
    }

    /// True when both references point at the same callable.
    #[must_use]
    pub fn same_handler(&self, other: &Self) -> bool {
        self.id() == other.id()
    }

    /// Run the handler exactly as received. Failures inside the handler are
    /// the caller's concern.
    pub fn invoke(&self) {
        (self.func)();
    }
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRef")
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}
