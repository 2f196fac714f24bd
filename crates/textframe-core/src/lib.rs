//! Core framework for rendering stateful text views on character displays.
//!
//! A *view* is a caller-supplied unit of content with asynchronous show/close
//! hooks and a synchronous draw call. The [`TextViewRenderer`] owns the single
//! current view and a background render loop that paces redraws; the
//! [`TextViewNavigator`] turns show/modal/back requests into safe view
//! transitions; the [`InputManager`] tracks which input targets currently hold
//! focus; the [`IdleMonitor`] watches input and system activity with two
//! independent timeouts.
//!
//! # Components
//!
//! - [`TextViewRenderer`]: current-view slot, transition protocol, render loop
//! - [`TextViewNavigator`]: navigation stack state machine
//! - [`InputManager`] / [`InputEvent`]: input-focus contexts and event fan-out
//! - [`IdleMonitor`]: idle/active state machine
//! - [`Invalidater`] / [`ViewTimer`]: per-view redraw requests and timers
//! - [`TextDisplayDevice`]: the display driver boundary
//!
//! Display drivers and application bootstrap live in separate crates; this
//! crate only defines the device trait they implement.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod animation;
mod device;
mod idle;
mod input;
mod navigation;
mod render;
mod signal;
mod view;

pub use device::{CharacterContext, DeviceError, Point, Size, TextDisplayDevice};
pub use idle::{IdleEvent, IdleMonitor};
pub use input::{
    Activatable, ActivityNotifier, ActivitySource, InputEvent, InputManager, InputTarget,
    SubscriptionId, target_id,
};
pub use navigation::{NavigationError, TextViewNavigator};
pub use render::{
    FaultAction, Invalidater, IntervalSynchronizer, RenderFault, RenderFaultError,
    RenderInstruction, RenderingContext, SetViewError, SyncOutcome, TextViewRenderer,
    TransitionHook, ViewTimer,
};
pub use view::{EmptyTextView, FaultTextView, TextView, ViewError};
