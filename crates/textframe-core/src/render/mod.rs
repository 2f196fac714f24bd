//! Rendering: the current-view slot, the background render loop, and the
//! per-view invalidation/timer infrastructure it is built on.

mod context;
mod invalidate;
mod pacing;
mod renderer;
mod timer;

pub use context::{RenderInstruction, RenderingContext};
pub use invalidate::Invalidater;
pub use pacing::{IntervalSynchronizer, SyncOutcome};
pub use renderer::{
    FaultAction, RenderFault, RenderFaultError, SetViewError, TextViewRenderer, TransitionHook,
};
pub use timer::ViewTimer;
