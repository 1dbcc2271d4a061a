use eframe::egui;
use parking_lot::Mutex;
use shared::chat::Message;
use shared::reply::{classify_content, ContentKind};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod html_view;
mod modals;
mod simple_md;
mod widgets;

mod state;
pub use state::*;

use modals::Modal;

const USER_BUBBLE: egui::Color32 = egui::Color32::from_rgb(70, 130, 180);

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = shared::settings::load_settings_or_default();
    if settings.gemini_auth.resolve_api_key().is_none() {
        tracing::warn!("No Gemini API key configured; set GEMINI_API_KEY or add one to settings.json");
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([960.0, 760.0])
            .with_min_inner_size([480.0, 400.0]),
        vsync: true,
        ..Default::default()
    };
    eframe::run_native(
        "Risenova",
        options,
        Box::new(|_cc| {
            Box::new(RisenovaApp {
                state: Arc::new(Mutex::new(AppState::new(settings))),
            })
        }),
    )
}

struct RisenovaApp {
    state: Arc<Mutex<AppState>>,
}

impl eframe::App for RisenovaApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut s = self.state.lock();

        // Poll for AI response (non-blocking)
        s.poll_ai_response();
        if s.is_thinking() {
            ctx.request_repaint();
        }

        let dark = s.settings.dark_mode;
        ctx.set_visuals(if dark {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        });

        render_header(&mut s, ctx);
        render_input_bar(&mut s, ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    ui.add_space(8.0);
                    let (messages, views) = s.messages_and_views();
                    for (index, msg) in messages.iter().enumerate() {
                        render_message(ui, index, msg, views, dark);
                        ui.add_space(10.0);
                    }

                    if s.is_thinking() {
                        render_typing_indicator(ui, dark);
                    }
                    if let Some(error) = s.controller.error().map(str::to_string) {
                        if render_error_banner(ui, &error) {
                            s.retry();
                        }
                    }

                    if s.controller.take_scroll_request() {
                        ui.scroll_to_cursor(Some(egui::Align::BOTTOM));
                    }
                });
        });

        if s.clear_dialog.update(ctx) && s.clear_dialog.take_result().is_confirmed() {
            s.confirm_clear();
        }
    }
}

fn render_header(s: &mut AppState, ctx: &egui::Context) {
    egui::TopBottomPanel::top("header").show(ctx, |ui| {
        ui.add_space(6.0);
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("✦").size(20.0).color(USER_BUBBLE));
            ui.label(egui::RichText::new("Risenova").strong().size(20.0));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .button("🗑 Clear Chat")
                    .on_hover_text("Clear chat history")
                    .clicked()
                {
                    s.clear_dialog.open();
                }

                let dark = s.settings.dark_mode;
                if ui
                    .add(
                        egui::Button::new(egui::RichText::new(if dark { "☀" } else { "🌙" }).size(18.0))
                            .frame(false),
                    )
                    .on_hover_text(if dark {
                        "Switch to light mode"
                    } else {
                        "Switch to dark mode"
                    })
                    .clicked()
                {
                    s.toggle_dark_mode();
                }
                ui.label(egui::RichText::new("Conversational AI").size(13.0).weak());
            });
        });
        ui.add_space(6.0);
    });
}

fn render_input_bar(s: &mut AppState, ctx: &egui::Context) {
    egui::TopBottomPanel::bottom("input_bar").show(ctx, |ui| {
        ui.add_space(8.0);
        let is_busy = s.is_thinking();
        let input_id = egui::Id::new("chat_input");

        // Enter sends, Shift+Enter inserts a newline
        let focused = ui.memory(|m| m.has_focus(input_id));
        let enter_pressed = focused
            && !s.clear_dialog.is_open()
            && !ui.input(|i| i.modifiers.shift)
            && ui.input_mut(|i| i.consume_key(egui::Modifiers::NONE, egui::Key::Enter));

        ui.horizontal(|ui| {
            ui.add_enabled(
                !is_busy,
                egui::TextEdit::multiline(s.controller.input_mut())
                    .id(input_id)
                    .hint_text("Type your message...")
                    .desired_rows(1)
                    .desired_width(ui.available_width() - 80.0)
                    .font(egui::FontId::new(15.0, egui::FontFamily::Proportional)),
            );

            let btn = if is_busy {
                let label = if s.is_stopping() { "Stopping" } else { "Stop" };
                egui::Button::new(label).fill(egui::Color32::from_rgb(180, 80, 80))
            } else {
                egui::Button::new("Send").fill(USER_BUBBLE)
            };
            let can_send = is_busy || !s.controller.input().trim().is_empty();
            if ui.add_enabled(can_send, btn.min_size(egui::vec2(70.0, 36.0))).clicked() {
                if is_busy {
                    s.cancel_ai();
                } else {
                    s.send_message();
                }
            }
        });

        if enter_pressed && !is_busy {
            s.send_message();
        }
        ui.add_space(8.0);
    });
}

/// Render one chat bubble.
fn render_message(
    ui: &mut egui::Ui,
    index: usize,
    msg: &Message,
    views: &mut std::collections::HashMap<usize, html_view::HtmlView>,
    dark: bool,
) {
    if msg.is_user() {
        // User message - right aligned, blue
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Min), |ui| {
            ui.add_space(8.0);
            egui::Frame::none()
                .fill(USER_BUBBLE)
                .rounding(egui::Rounding::same(12.0))
                .inner_margin(egui::Margin::same(12.0))
                .show(ui, |ui| {
                    ui.set_max_width(520.0);
                    ui.label(
                        egui::RichText::new(&msg.content)
                            .color(egui::Color32::WHITE)
                            .size(15.0),
                    );
                });
        });
        return;
    }

    let text_color = if dark {
        egui::Color32::from_rgb(220, 220, 230)
    } else {
        egui::Color32::from_rgb(40, 40, 50)
    };

    egui::Frame::none()
        .fill(if dark {
            egui::Color32::from_rgb(50, 50, 58)
        } else {
            egui::Color32::from_rgb(245, 245, 248)
        })
        .rounding(egui::Rounding::same(12.0))
        .inner_margin(egui::Margin::same(12.0))
        .show(ui, |ui| {
            ui.set_max_width(720.0);

            match classify_content(&msg.content) {
                ContentKind::Html => {
                    html_view_for(views, index, &msg.content).ui(ui, text_color);
                }
                ContentKind::Markdown if !msg.content.is_empty() => {
                    simple_md::render_markdown(ui, &msg.content, text_color);
                }
                ContentKind::Markdown => {}
            }

            if msg.has_recommendations() {
                widgets::render_recommendations(ui, msg.recommendations.as_deref().unwrap_or_default(), dark);
            }

            ui.add_space(6.0);
            if ui
                .small_button("Copy")
                .on_hover_text("Copy to clipboard")
                .clicked()
            {
                ui.output_mut(|o| o.copied_text = msg.content.clone());
            }
        });
}

fn render_typing_indicator(ui: &mut egui::Ui, dark: bool) {
    let time = ui.input(|i| i.time);
    egui::Frame::none()
        .fill(if dark {
            egui::Color32::from_rgb(50, 50, 58)
        } else {
            egui::Color32::from_rgb(245, 245, 248)
        })
        .rounding(egui::Rounding::same(12.0))
        .inner_margin(egui::Margin::same(12.0))
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                for i in 0..3 {
                    let phase = ((time * 2.5 - i as f64 * 0.4).sin() * 0.5 + 0.5) as f32;
                    let alpha = (80.0 + phase * 175.0) as u8;
                    ui.label(
                        egui::RichText::new("●")
                            .size(12.0)
                            .color(egui::Color32::from_rgba_unmultiplied(70, 130, 180, alpha)),
                    );
                }
            });
        });
}

/// Error banner with a Retry button. Returns true when Retry was clicked.
fn render_error_banner(ui: &mut egui::Ui, error: &str) -> bool {
    let mut retry = false;
    egui::Frame::none()
        .fill(egui::Color32::from_rgba_unmultiplied(127, 29, 29, 128))
        .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(239, 68, 68)))
        .rounding(egui::Rounding::same(8.0))
        .inner_margin(egui::Margin::same(12.0))
        .show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("⚠").size(20.0).color(egui::Color32::from_rgb(252, 165, 165)));
                ui.vertical(|ui| {
                    ui.label(egui::RichText::new("Error").strong().color(egui::Color32::from_rgb(252, 165, 165)));
                    ui.label(egui::RichText::new(error).size(13.0).color(egui::Color32::from_rgb(252, 165, 165)));
                });
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .button("Retry")
                        .on_hover_text("Retry sending the message")
                        .clicked()
                    {
                        retry = true;
                    }
                });
            });
        });
    retry
}
