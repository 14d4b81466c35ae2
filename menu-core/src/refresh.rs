//! ``src/refresh.rs``
//!
//! Registry refresh requests from background work. Workers never touch the
//! registry; they queue a request through a [`RefreshHandle`] and the control
//! thread drains the queue between menu builds.

use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::{
    discovery::{ModuleLoader, ScanReport, Scanner},
    registry::action_registry::ActionRegistry,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshRequest {
    /// Scan a directory into the registry.
    Rescan(PathBuf),
    /// Drop every entry and group.
    Reset,
}

/// Cloneable sender side, handed to workers.
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    tx: mpsc::UnboundedSender<RefreshRequest>,
}

impl RefreshHandle {
    /// Queue a request. Returns `false` once the queue is gone.
    pub fn request(&self, request: RefreshRequest) -> bool {
        trace!(?request, "Queueing registry refresh");
        self.tx.send(request).is_ok()
    }

    pub fn rescan(&self, path: impl Into<PathBuf>) -> bool {
        self.request(RefreshRequest::Rescan(path.into()))
    }

    pub fn reset(&self) -> bool {
        self.request(RefreshRequest::Reset)
    }
}

/// Receiving side, owned by the control thread. The queue only keeps a weak
/// sender, so once every [`RefreshHandle`] is dropped `next` yields `None`.
#[derive(Debug)]
pub struct RefreshQueue {
    weak_tx: mpsc::WeakUnboundedSender<RefreshRequest>,
    rx: mpsc::UnboundedReceiver<RefreshRequest>,
}

impl RefreshQueue {
    /// Create the queue and the first handle for workers.
    #[must_use]
    pub fn new() -> (Self, RefreshHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let queue = Self {
            weak_tx: tx.downgrade(),
            rx,
        };
        (queue, RefreshHandle { tx })
    }

    /// Another handle, as long as at least one is still alive.
    #[must_use]
    pub fn handle(&self) -> Option<RefreshHandle> {
        self.weak_tx.upgrade().map(|tx| RefreshHandle { tx })
    }

    /// Wait for the next request. `None` once every handle is gone and the
    /// queue is drained.
    pub async fn next(&mut self) -> Option<RefreshRequest> {
        self.rx.recv().await
    }

    /// Apply every queued request, in order. Call from the thread that owns
    /// the registry. Returns the reports of the scans that ran.
    pub fn apply<L: ModuleLoader>(
        &mut self,
        registry: &mut ActionRegistry,
        scanner: &Scanner<'_, L>,
    ) -> Vec<ScanReport> {
        let mut reports = Vec::new();

        while let Ok(request) = self.rx.try_recv() {
            if let Some(report) = apply_request(request, registry, scanner) {
                reports.push(report);
            }
        }

        if !reports.is_empty() {
            info!(scans = reports.len(), entries = registry.len(), "Registry refreshed");
        }
        reports
    }
}

/// Apply a single request to the registry.
pub fn apply_request<L: ModuleLoader>(
    request: RefreshRequest,
    registry: &mut ActionRegistry,
    scanner: &Scanner<'_, L>,
) -> Option<ScanReport> {
    match request {
        RefreshRequest::Rescan(path) => Some(scanner.scan(&path, registry)),
        RefreshRequest::Reset => {
            debug!("Clearing registry on request");
            registry.clear();
            None
        }
    }
}
