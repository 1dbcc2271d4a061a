//! Sandboxed view for HTML replies.
//!
//! Nothing is executed: the document is flattened to text with `html2text`,
//! with a toggle to show the highlighted source instead.

use eframe::egui::{self, ScrollArea};

const TEXT_WIDTH: usize = 100;

pub struct HtmlView {
    source: String,
    rendered: String,
    show_source: bool,
}

impl HtmlView {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            rendered: html_to_text(source),
            show_source: false,
        }
    }

    /// Whether this view was built from `source`.
    pub fn matches(&self, source: &str) -> bool {
        self.source == source
    }

    pub fn ui(&mut self, ui: &mut egui::Ui, text_color: egui::Color32) {
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("HTML document").size(12.0).weak());
            ui.separator();
            ui.checkbox(&mut self.show_source, "Show Source");
            if ui.small_button("Copy").on_hover_text("Copy HTML").clicked() {
                ui.output_mut(|o| o.copied_text = self.source.clone());
            }
        });
        ui.separator();

        ScrollArea::vertical()
            .id_source(ui.next_auto_id())
            .max_height(420.0)
            .auto_shrink([false, true])
            .show(ui, |ui| {
                if self.show_source {
                    ui.label(highlight_html(&self.source, ui.visuals().text_color()));
                } else {
                    ui.label(
                        egui::RichText::new(&self.rendered)
                            .size(14.0)
                            .color(text_color),
                    );
                }
            });
    }
}

/// Flatten an HTML document to readable text.
pub fn html_to_text(source: &str) -> String {
    html2text::from_read(source.as_bytes(), TEXT_WIDTH)
        .trim()
        .to_string()
}

/// Colour tags, attribute strings and text differently.
fn highlight_html(source: &str, text_color: egui::Color32) -> egui::text::LayoutJob {
    let tag_color = egui::Color32::from_rgb(86, 156, 214);
    let string_color = egui::Color32::from_rgb(206, 145, 120);

    let mut job = egui::text::LayoutJob::default();
    let append = |job: &mut egui::text::LayoutJob, chunk: &mut String, color: egui::Color32| {
        if !chunk.is_empty() {
            job.append(
                chunk,
                0.0,
                egui::TextFormat {
                    font_id: egui::FontId::monospace(12.0),
                    color,
                    ..Default::default()
                },
            );
            chunk.clear();
        }
    };

    let mut chunk = String::new();
    let mut in_tag = false;
    let mut in_string = false;

    for ch in source.chars() {
        match ch {
            '<' if !in_string => {
                append(&mut job, &mut chunk, text_color);
                in_tag = true;
                chunk.push(ch);
            }
            '>' if in_tag && !in_string => {
                chunk.push(ch);
                append(&mut job, &mut chunk, tag_color);
                in_tag = false;
            }
            '"' if in_tag => {
                if in_string {
                    chunk.push(ch);
                    append(&mut job, &mut chunk, string_color);
                    in_string = false;
                } else {
                    append(&mut job, &mut chunk, tag_color);
                    chunk.push(ch);
                    in_string = true;
                }
            }
            _ => chunk.push(ch),
        }
    }
    let tail_color = if in_tag { tag_color } else { text_color };
    append(&mut job, &mut chunk, tail_color);

    job
}
