pub mod error;

pub mod config;

pub mod registry {
    pub mod handler;
    pub use handler::{HandlerFn, HandlerId, HandlerRef};

    pub mod entry;
    pub use entry::{ActionEntry, Registration};

    pub mod action_registry;
    pub use action_registry::{
        ActionRegistry, MenuTree, RegisterOutcome, SharedGroupRules, SummaryView,
    };
}

pub mod composition {
    pub mod token;
    pub use token::{Compositions, Token, default_compositions};

    pub mod mode;
    pub use mode::{DynamicFilter, FilterMode, ModeCell, ModeSource};

    pub mod engine;
    pub use engine::{CompositionEngine, MenuItem, render_text};
}

pub mod discovery;

pub mod audit;

pub mod serializer;

pub mod refresh;

pub mod logging;
pub use logging::Logger;

pub use error::{MenuError, MenuResult};

pub use registry::ActionRegistry;
