//! Dialogs layered over the chat window.

pub mod confirm_dialog;

pub use confirm_dialog::ConfirmDialog;

use egui::Context;

/// A dialog drawn over the chat that captures input until dismissed.
pub trait Modal {
    /// Draw one frame. Returns true on the frame the user decides.
    fn update(&mut self, ctx: &Context) -> bool;

    fn is_open(&self) -> bool;

    fn open(&mut self);

    /// Dismiss without a decision; counts as cancel.
    fn close(&mut self);
}

/// Outcome of a dialog, taken once by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalResult<T> {
    Pending,
    Confirmed(T),
    Cancelled,
}

impl<T> ModalResult<T> {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, ModalResult::Confirmed(_))
    }
}
