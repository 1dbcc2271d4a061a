//! Yes/no confirmation for destructive actions (clearing the chat).
//!
//! Enter confirms, Escape or a click on the backdrop cancels.

use super::{Modal, ModalResult};
use egui::{Align2, Area, Context, Id, Key, RichText, Vec2};

pub struct ConfirmDialog {
    is_open: bool,
    title: String,
    message: String,
    confirm_label: String,
    result: ModalResult<()>,
    id: Id,
}

impl ConfirmDialog {
    pub fn new(
        id: impl std::hash::Hash,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            is_open: false,
            title: title.into(),
            message: message.into(),
            confirm_label: "Confirm".to_string(),
            result: ModalResult::Pending,
            id: Id::new(id),
        }
    }

    pub fn with_confirm_label(mut self, label: impl Into<String>) -> Self {
        self.confirm_label = label.into();
        self
    }

    /// Take the user's decision, leaving the dialog pending again.
    pub fn take_result(&mut self) -> ModalResult<()> {
        std::mem::replace(&mut self.result, ModalResult::Pending)
    }

    fn finish(&mut self, result: ModalResult<()>) {
        self.result = result;
        self.is_open = false;
    }
}

impl Modal for ConfirmDialog {
    fn update(&mut self, ctx: &Context) -> bool {
        if !self.is_open {
            return false;
        }

        let mut decision = None;

        // Semi-transparent backdrop; clicking it cancels
        Area::new(self.id.with("overlay"))
            .anchor(Align2::LEFT_TOP, Vec2::ZERO)
            .show(ctx, |ui| {
                let screen_rect = ctx.screen_rect();
                let backdrop = ui.allocate_response(screen_rect.size(), egui::Sense::click());
                ui.painter()
                    .rect_filled(screen_rect, 0.0, egui::Color32::from_black_alpha(180));
                if backdrop.clicked() {
                    decision = Some(ModalResult::Cancelled);
                }
            });

        egui::Window::new(self.title.as_str())
            .id(self.id.with("window"))
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
            .show(ctx, |ui| {
                ui.set_min_width(360.0);
                ui.add_space(8.0);
                ui.label(&self.message);
                ui.add_space(12.0);

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Min), |ui| {
                    let confirm = egui::Button::new(
                        RichText::new(&self.confirm_label).color(egui::Color32::WHITE),
                    )
                    .fill(egui::Color32::from_rgb(180, 70, 70));
                    if ui.add(confirm).clicked() {
                        decision = Some(ModalResult::Confirmed(()));
                    }
                    if ui.button("Cancel").clicked() {
                        decision = Some(ModalResult::Cancelled);
                    }
                });
            });

        if ctx.input(|i| i.key_pressed(Key::Escape)) {
            self.close();
            return true;
        }
        if ctx.input(|i| i.key_pressed(Key::Enter)) {
            decision = Some(ModalResult::Confirmed(()));
        }

        match decision {
            Some(result) => {
                self.finish(result);
                true
            }
            None => false,
        }
    }

    fn is_open(&self) -> bool {
        self.is_open
    }

    fn open(&mut self) {
        self.is_open = true;
        self.result = ModalResult::Pending;
    }

    fn close(&mut self) {
        self.finish(ModalResult::Cancelled);
    }
}
