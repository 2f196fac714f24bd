//! The text view contract and the framework's sentinel views.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    device::CharacterContext,
    input::InputTarget,
    render::{Invalidater, RenderingContext},
};

/// Error type for caller-implemented view hooks.
pub type ViewError = Box<dyn std::error::Error + Send + Sync>;

/// A unit of displayable content with a show/draw/close lifecycle.
///
/// Views are caller-owned and shared as `Arc<dyn TextView>`; the framework
/// never constructs application views. A view requests redraws through the
/// [`Invalidater`] it receives in [`on_showing`](TextView::on_showing) and
/// must not retain it past [`on_closing`](TextView::on_closing) — a disposed
/// invalidater ignores further requests.
#[async_trait]
pub trait TextView: Send + Sync {
    /// The input targets this view wants focused while it is current.
    ///
    /// `None` means the view takes no input. Modal navigation requires at
    /// least one target.
    fn input_targets(&self) -> Option<Vec<Arc<dyn InputTarget>>> {
        None
    }

    /// Called when the view becomes current, before its first draw.
    ///
    /// `character_context` is present only on devices with a programmable
    /// glyph table.
    async fn on_showing(
        &self,
        invalidater: Arc<Invalidater>,
        character_context: Option<Arc<dyn CharacterContext>>,
    ) -> Result<(), ViewError>;

    /// Called by the render loop to produce one frame.
    ///
    /// Instructions appended to `context` are flushed to the device after
    /// this call returns.
    fn draw(&self, context: &mut RenderingContext) -> Result<(), ViewError>;

    /// Called when the view stops being current, after rendering has stopped.
    async fn on_closing(&self) -> Result<(), ViewError>;
}

/// The initial sentinel view: draws nothing, takes no input.
#[derive(Debug, Default)]
pub struct EmptyTextView;

#[async_trait]
impl TextView for EmptyTextView {
    async fn on_showing(
        &self,
        _invalidater: Arc<Invalidater>,
        _character_context: Option<Arc<dyn CharacterContext>>,
    ) -> Result<(), ViewError> {
        Ok(())
    }

    fn draw(&self, _context: &mut RenderingContext) -> Result<(), ViewError> {
        Ok(())
    }

    async fn on_closing(&self) -> Result<(), ViewError> {
        Ok(())
    }
}

/// Replacement view installed when an unhandled render fault halts the loop.
///
/// Draws nothing, leaving the display as the failed frame left it. The fault
/// message is retained for diagnostics.
#[derive(Debug)]
pub struct FaultTextView {
    message: String,
}

impl FaultTextView {
    pub(crate) fn new(message: String) -> Self {
        Self { message }
    }

    /// The message of the fault that halted rendering.
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[async_trait]
impl TextView for FaultTextView {
    async fn on_showing(
        &self,
        _invalidater: Arc<Invalidater>,
        _character_context: Option<Arc<dyn CharacterContext>>,
    ) -> Result<(), ViewError> {
        Ok(())
    }

    fn draw(&self, _context: &mut RenderingContext) -> Result<(), ViewError> {
        Ok(())
    }

    async fn on_closing(&self) -> Result<(), ViewError> {
        Ok(())
    }
}
