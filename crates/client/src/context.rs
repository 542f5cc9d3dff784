//! Execution context and page lifecycle signals.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracker_core::{PageContext, SessionStore};

/// Where the batcher runs.
#[derive(Clone)]
pub enum ExecutionContext {
    /// A client with persistent storage and a current page.
    Client {
        store: Arc<dyn SessionStore>,
        page: PageContext,
    },
    /// Server-side rendering: no storage, no timers, no delivery.
    Server,
}

impl ExecutionContext {
    pub fn client(store: Arc<dyn SessionStore>, page: PageContext) -> Self {
        Self::Client { store, page }
    }

    pub fn is_server(&self) -> bool {
        matches!(self, Self::Server)
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Client { page, .. } => f.debug_struct("Client").field("page", page).finish(),
            Self::Server => f.write_str("Server"),
        }
    }
}

/// Page visibility state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Page lifecycle signals the batcher reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    VisibilityChanged(Visibility),
    /// The page is about to unload.
    BeforeUnload,
}

impl LifecycleEvent {
    /// Whether this signal should flush the queue.
    ///
    /// Hidden covers mobile app switches and tab closes where unload never
    /// fires.
    pub fn triggers_flush(&self) -> bool {
        matches!(
            self,
            Self::VisibilityChanged(Visibility::Hidden) | Self::BeforeUnload
        )
    }
}
