//! Cards for the structured recommendations attached to a model reply.

use eframe::egui;
use shared::chat::Recommendation;

pub struct RecommendationCard<'a> {
    recommendation: &'a Recommendation,
    dark: bool,
}

impl<'a> RecommendationCard<'a> {
    pub fn new(recommendation: &'a Recommendation, dark: bool) -> Self {
        Self {
            recommendation,
            dark,
        }
    }

    pub fn show(&self, ui: &mut egui::Ui) {
        let (fill, stroke, text, muted) = if self.dark {
            (
                egui::Color32::from_rgb(40, 40, 48),
                egui::Color32::from_rgb(70, 70, 82),
                egui::Color32::from_rgb(220, 220, 230),
                egui::Color32::from_rgb(160, 160, 175),
            )
        } else {
            (
                egui::Color32::WHITE,
                egui::Color32::from_rgb(215, 215, 222),
                egui::Color32::from_rgb(40, 40, 50),
                egui::Color32::from_rgb(100, 100, 115),
            )
        };
        let accent = egui::Color32::from_rgb(70, 130, 180);
        let rec = self.recommendation;

        egui::Frame::none()
            .fill(fill)
            .stroke(egui::Stroke::new(1.0, stroke))
            .rounding(egui::Rounding::same(8.0))
            .inner_margin(egui::Margin::same(12.0))
            .show(ui, |ui| {
                ui.set_min_width(ui.available_width());
                ui.label(egui::RichText::new(&rec.title).strong().size(15.0).color(accent));
                ui.add_space(4.0);
                ui.label(egui::RichText::new(&rec.rationale).size(13.0).color(muted));

                if !rec.action_items.is_empty() {
                    ui.add_space(6.0);
                    ui.label(egui::RichText::new("Action items").size(12.0).strong().color(text));
                    for item in &rec.action_items {
                        ui.horizontal_wrapped(|ui| {
                            ui.label(egui::RichText::new("  ✔ ").size(13.0).color(accent));
                            ui.label(egui::RichText::new(item).size(13.0).color(text));
                        });
                    }
                }
            });
    }
}

/// Section with a heading and one card per recommendation.
pub fn render_recommendations(ui: &mut egui::Ui, recommendations: &[Recommendation], dark: bool) {
    ui.add_space(10.0);
    ui.separator();
    ui.add_space(4.0);
    ui.label(egui::RichText::new("Recommendations").strong().size(16.0));
    ui.add_space(6.0);
    for rec in recommendations {
        RecommendationCard::new(rec, dark).show(ui);
        ui.add_space(6.0);
    }
}
