//! Lightweight markdown renderer for egui chat bubbles.
//!
//! Handles the subset of markdown that chat models actually produce:
//! - `# Heading` through `#### Heading`
//! - fenced code blocks with a language label and a Copy button
//! - `- bullet`, `* bullet` and `1. numbered` list items
//! - `> quote` lines and `---` rules
//! - pipe tables (`| a | b |`), with the row above a `|---|` divider as header
//! - inline `**bold**`, `*italic*`, `` `code` `` and `[text](url)` links

use eframe::egui;

/// One inline run of text
#[derive(Debug, Clone, PartialEq, Eq)]
enum Span<'a> {
    Text(&'a str),
    Bold(&'a str),
    Italic(&'a str),
    Code(&'a str),
    Link { label: &'a str, url: &'a str },
}

/// Block-level classification of a single line
#[derive(Debug, Clone, PartialEq, Eq)]
enum Line<'a> {
    Blank,
    /// Opening or closing fence, with the info string (may be empty)
    Fence(&'a str),
    Heading(u8, &'a str),
    Bullet(&'a str),
    Numbered(&'a str, &'a str),
    Quote(&'a str),
    Rule,
    TableRow(Vec<&'a str>),
    TableDivider,
    Paragraph(&'a str),
}

fn classify_line(line: &str) -> Line<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Line::Blank;
    }
    if let Some(info) = trimmed.strip_prefix("```") {
        return Line::Fence(info.trim());
    }
    if trimmed == "---" || trimmed == "***" {
        return Line::Rule;
    }
    if trimmed.len() > 1 && trimmed.starts_with('|') && trimmed.ends_with('|') {
        let cells: Vec<&str> = trimmed[1..trimmed.len() - 1]
            .split('|')
            .map(str::trim)
            .collect();
        let divider = cells.iter().all(|c| {
            let dashes = c.trim_start_matches(':').trim_end_matches(':');
            !dashes.is_empty() && dashes.chars().all(|ch| ch == '-')
        });
        return if divider {
            Line::TableDivider
        } else {
            Line::TableRow(cells)
        };
    }
    for (level, prefix) in [(4, "#### "), (3, "### "), (2, "## "), (1, "# ")] {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            return Line::Heading(level, rest);
        }
    }
    if let Some(rest) = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
    {
        return Line::Bullet(rest);
    }
    if let Some(rest) = trimmed.strip_prefix("> ") {
        return Line::Quote(rest);
    }
    if let Some(dot) = trimmed.find(". ") {
        let number = &trimmed[..dot];
        if !number.is_empty() && number.len() <= 3 && number.chars().all(|c| c.is_ascii_digit()) {
            return Line::Numbered(number, &trimmed[dot + 2..]);
        }
    }
    Line::Paragraph(trimmed)
}

/// Position of the first `*` that is not half of a `**` pair.
fn single_star(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    (0..bytes.len()).find(|&i| {
        bytes[i] == b'*' && bytes.get(i + 1) != Some(&b'*') && (i == 0 || bytes[i - 1] != b'*')
    })
}

/// Split a line into inline spans. Unclosed markers are kept as plain text.
fn inline_spans(text: &str) -> Vec<Span<'_>> {
    let mut spans = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let bold = rest.find("**");
        let italic = single_star(rest);
        let code = rest.find('`');
        let link = rest.find('[').filter(|&p| rest[p..].contains("]("));

        let next = [bold, italic, code, link].into_iter().flatten().min();
        let Some(pos) = next else {
            spans.push(Span::Text(rest));
            break;
        };
        if pos > 0 {
            spans.push(Span::Text(&rest[..pos]));
        }
        rest = &rest[pos..];

        if Some(pos) == bold {
            if let Some(end) = rest[2..].find("**") {
                spans.push(Span::Bold(&rest[2..2 + end]));
                rest = &rest[end + 4..];
                continue;
            }
        } else if Some(pos) == italic {
            let inner = &rest[1..];
            match single_star(inner) {
                Some(end) if end > 0 && !inner.starts_with(char::is_whitespace) => {
                    spans.push(Span::Italic(&inner[..end]));
                    rest = &inner[end + 1..];
                }
                // A lone `*` (e.g. "2 * 3") is just text
                _ => {
                    spans.push(Span::Text(&rest[..1]));
                    rest = inner;
                }
            }
            continue;
        } else if Some(pos) == code {
            if let Some(end) = rest[1..].find('`') {
                spans.push(Span::Code(&rest[1..1 + end]));
                rest = &rest[end + 2..];
                continue;
            }
        } else if let Some(close) = rest.find("](") {
            let after = &rest[close + 2..];
            if let Some(paren) = after.find(')') {
                spans.push(Span::Link {
                    label: &rest[1..close],
                    url: &after[..paren],
                });
                rest = &after[paren + 1..];
                continue;
            }
        }

        // Malformed: emit the rest verbatim
        spans.push(Span::Text(rest));
        break;
    }

    spans
}

/// Label shown above a fenced block.
fn code_language(info: &str) -> &str {
    info.split_whitespace().next().unwrap_or("text")
}

/// Render markdown text into an egui UI region.
pub fn render_markdown(ui: &mut egui::Ui, text: &str, base_color: egui::Color32) {
    let code_bg = if base_color.r() > 128 {
        // dark mode, lighter code bg
        egui::Color32::from_rgb(60, 60, 70)
    } else {
        egui::Color32::from_rgb(230, 232, 236)
    };

    // (language, body lines) of the fence being collected
    let mut code_block: Option<(&str, Vec<&str>)> = None;
    let mut table: Vec<Line<'_>> = Vec::new();

    for line in text.lines() {
        if let Some((lang, block)) = code_block.as_mut() {
            if matches!(classify_line(line), Line::Fence(_)) {
                let body = block.join("\n");
                render_code_block(ui, lang, &body, base_color, code_bg);
                code_block = None;
            } else {
                block.push(line);
            }
            continue;
        }

        let classified = classify_line(line);
        if matches!(classified, Line::TableRow(_) | Line::TableDivider) {
            table.push(classified);
            continue;
        }
        if !table.is_empty() {
            render_table(ui, &std::mem::take(&mut table), base_color, code_bg);
        }

        match classified {
            Line::Blank => ui.add_space(6.0),
            Line::Fence(info) => code_block = Some((code_language(info), Vec::new())),
            Line::Rule => {
                ui.separator();
            }
            Line::Heading(level, rest) => {
                let size = match level {
                    1 => 18.0,
                    2 => 16.0,
                    3 => 15.0,
                    _ => 14.0,
                };
                ui.add_space(size / 3.0);
                ui.label(egui::RichText::new(rest).strong().size(size).color(base_color));
                ui.add_space(2.0);
            }
            Line::Bullet(rest) => {
                ui.horizontal_wrapped(|ui| {
                    ui.label(egui::RichText::new("  •  ").size(14.0).color(base_color));
                    render_inline(ui, rest, base_color, code_bg);
                });
            }
            Line::Numbered(number, rest) => {
                ui.horizontal_wrapped(|ui| {
                    ui.label(
                        egui::RichText::new(format!("  {}. ", number))
                            .size(14.0)
                            .color(base_color),
                    );
                    render_inline(ui, rest, base_color, code_bg);
                });
            }
            Line::Quote(rest) => {
                ui.horizontal_wrapped(|ui| {
                    ui.label(egui::RichText::new("▍").size(14.0).weak());
                    ui.label(egui::RichText::new(rest).size(14.0).italics().color(base_color));
                });
            }
            Line::Paragraph(rest) => {
                ui.horizontal_wrapped(|ui| {
                    render_inline(ui, rest, base_color, code_bg);
                });
            }
            Line::TableRow(_) | Line::TableDivider => {}
        }
    }

    if !table.is_empty() {
        render_table(ui, &table, base_color, code_bg);
    }
    // Unterminated fence: still show what we have
    if let Some((lang, block)) = code_block {
        render_code_block(ui, lang, &block.join("\n"), base_color, code_bg);
    }
}

fn render_code_block(
    ui: &mut egui::Ui,
    language: &str,
    body: &str,
    base_color: egui::Color32,
    code_bg: egui::Color32,
) {
    egui::Frame::none()
        .fill(code_bg)
        .rounding(egui::Rounding::same(6.0))
        .inner_margin(egui::Margin::same(8.0))
        .show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(language).size(11.0).weak());
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .small_button("Copy")
                        .on_hover_text("Copy code to clipboard")
                        .clicked()
                    {
                        ui.output_mut(|o| o.copied_text = body.to_string());
                    }
                });
            });
            ui.separator();
            ui.label(
                egui::RichText::new(body)
                    .monospace()
                    .size(13.0)
                    .color(base_color),
            );
        });
}

/// Grid for a run of table lines. Divider lines only mark the header.
fn render_table(
    ui: &mut egui::Ui,
    lines: &[Line<'_>],
    base_color: egui::Color32,
    code_bg: egui::Color32,
) {
    let has_header = matches!(lines, [Line::TableRow(_), Line::TableDivider, ..]);
    egui::Frame::none()
        .stroke(egui::Stroke::new(1.0, code_bg))
        .rounding(egui::Rounding::same(4.0))
        .inner_margin(egui::Margin::same(6.0))
        .show(ui, |ui| {
            egui::Grid::new(ui.next_auto_id())
                .striped(true)
                .spacing(egui::vec2(16.0, 4.0))
                .show(ui, |ui| {
                    let rows = lines.iter().filter_map(|l| match l {
                        Line::TableRow(cells) => Some(cells),
                        _ => None,
                    });
                    for (i, cells) in rows.enumerate() {
                        for cell in cells {
                            if i == 0 && has_header {
                                ui.label(egui::RichText::new(*cell).size(14.0).strong().color(base_color));
                            } else {
                                ui.horizontal_wrapped(|ui| {
                                    render_inline(ui, cell, base_color, code_bg);
                                });
                            }
                        }
                        ui.end_row();
                    }
                });
        });
}

fn render_inline(
    ui: &mut egui::Ui,
    text: &str,
    base_color: egui::Color32,
    code_bg: egui::Color32,
) {
    let link_color = egui::Color32::from_rgb(100, 170, 240);
    let base_size = 14.0;

    for span in inline_spans(text) {
        match span {
            Span::Text(t) => {
                ui.label(egui::RichText::new(t).size(base_size).color(base_color));
            }
            Span::Bold(t) => {
                ui.label(
                    egui::RichText::new(t)
                        .size(base_size)
                        .strong()
                        .color(base_color),
                );
            }
            Span::Italic(t) => {
                ui.label(
                    egui::RichText::new(t)
                        .size(base_size)
                        .italics()
                        .color(base_color),
                );
            }
            Span::Code(t) => {
                egui::Frame::none()
                    .fill(code_bg)
                    .rounding(egui::Rounding::same(3.0))
                    .inner_margin(egui::Margin::symmetric(4.0, 1.0))
                    .show(ui, |ui| {
                        ui.label(
                            egui::RichText::new(t)
                                .size(base_size)
                                .monospace()
                                .color(base_color),
                        );
                    });
            }
            Span::Link { label, url } => {
                ui.add(egui::Hyperlink::from_label_and_url(
                    egui::RichText::new(label)
                        .size(base_size)
                        .color(link_color)
                        .underline(),
                    url,
                ))
                .on_hover_text(url);
            }
        }
    }
}
