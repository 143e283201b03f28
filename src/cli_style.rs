//! Terminal styling shared by the binaries.

use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use crossterm::style::{Attribute, Color as CtColor, Stylize};
use unicode_width::UnicodeWidthStr;

pub fn get_styles() -> Styles {
    let accent = |color: AnsiColor| Style::new().bold().fg_color(Some(Color::Ansi(color)));
    Styles::styled()
        .usage(accent(AnsiColor::Cyan).underline())
        .header(accent(AnsiColor::Cyan).underline())
        .literal(accent(AnsiColor::Green))
        .invalid(accent(AnsiColor::Red))
        .error(accent(AnsiColor::Red))
        .valid(accent(AnsiColor::Green))
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}

pub mod colors {
    use crossterm::style::Color;

    pub const CYAN: Color = Color::Rgb { r: 0, g: 255, b: 255 };
    pub const MAGENTA: Color = Color::Rgb { r: 255, g: 0, b: 255 };
    pub const PURPLE: Color = Color::Rgb { r: 180, g: 100, b: 255 };
    pub const GREEN: Color = Color::Rgb { r: 0, g: 255, b: 136 };
    pub const ORANGE: Color = Color::Rgb { r: 255, g: 165, b: 0 };
    pub const RED: Color = Color::Rgb { r: 255, g: 85, b: 85 };
    pub const DIM: Color = Color::Rgb { r: 128, g: 128, b: 128 };
    pub const WHITE: Color = Color::Rgb { r: 255, g: 255, b: 255 };
}

pub mod box_chars {
    pub const ROUND_TOP_LEFT: &str = "╭";
    pub const ROUND_TOP_RIGHT: &str = "╮";
    pub const ROUND_BOTTOM_LEFT: &str = "╰";
    pub const ROUND_BOTTOM_RIGHT: &str = "╯";
    pub const HORIZONTAL: &str = "─";
    pub const VERTICAL: &str = "│";
    pub const T_LEFT: &str = "├";
    pub const T_RIGHT: &str = "┤";
    pub const T_TOP: &str = "┬";
    pub const T_BOTTOM: &str = "┴";
    pub const CROSS: &str = "┼";
    pub const BULLET: &str = "●";
    pub const DIAMOND: &str = "◆";
    pub const CHECK: &str = "✓";
    pub const CROSS_MARK: &str = "✗";
}

const SECTION_WIDTH: usize = 60;

pub fn print_welcome(source: &str) {
    println!();
    println!(
        "  {} {}",
        box_chars::DIAMOND.with(colors::MAGENTA),
        "PEZZOTTIFY RECOMMENDER".with(colors::CYAN).bold()
    );
    print_key_value("Catalog", source);
    print_key_value(
        "Version",
        &format!("{} ({})", env!("CARGO_PKG_VERSION"), env!("GIT_HASH")),
    );
    println!(
        "  {}",
        "Type 'help' for available commands"
            .with(colors::DIM)
            .attribute(Attribute::Italic)
    );
    println!();
}

pub fn print_success(message: &str) {
    println!(
        " {} {}",
        box_chars::CHECK.with(colors::GREEN).bold(),
        message.with(colors::GREEN)
    );
}

pub fn print_error(message: &str) {
    println!(
        " {} {}",
        box_chars::CROSS_MARK.with(colors::RED).bold(),
        message.with(colors::RED)
    );
}

pub fn print_warning(message: &str) {
    println!(
        " {} {}",
        "⚠".with(colors::ORANGE).bold(),
        message.with(colors::ORANGE)
    );
}

pub fn print_section_header(title: &str) {
    let title_len = title.width();
    let padding = SECTION_WIDTH.saturating_sub(title_len + 4) / 2;
    let rest = SECTION_WIDTH.saturating_sub(title_len + 4 + padding);

    println!();
    println!(
        "{}{} {} {}{}",
        box_chars::ROUND_TOP_LEFT.with(colors::CYAN),
        box_chars::HORIZONTAL.repeat(padding).with(colors::CYAN),
        title.with(colors::CYAN).bold(),
        box_chars::HORIZONTAL.repeat(rest).with(colors::CYAN),
        box_chars::ROUND_TOP_RIGHT.with(colors::CYAN)
    );
}

pub fn print_section_footer() {
    println!(
        "{}{}{}",
        box_chars::ROUND_BOTTOM_LEFT.with(colors::CYAN),
        box_chars::HORIZONTAL.repeat(SECTION_WIDTH).with(colors::CYAN),
        box_chars::ROUND_BOTTOM_RIGHT.with(colors::CYAN)
    );
    println!();
}

pub fn print_key_value(key: &str, value: &str) {
    println!(
        "  {} {} {}",
        box_chars::BULLET.with(colors::PURPLE),
        format!("{}:", key).with(colors::DIM),
        value.with(colors::WHITE)
    );
}

/// `None` renders as a dash, used for metrics no seed contributed to.
pub fn format_ratio(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.4}", v),
        None => "-".to_string(),
    }
}

/// Box-drawn table sized to its widest cells.
pub struct TableBuilder {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    col_widths: Vec<usize>,
}

impl TableBuilder {
    pub fn new(headers: Vec<&str>) -> Self {
        TableBuilder {
            col_widths: headers.iter().map(|h| h.width()).collect(),
            headers: headers.into_iter().map(String::from).collect(),
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        for (width, cell) in self.col_widths.iter_mut().zip(&row) {
            *width = (*width).max(cell.width());
        }
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn print(&self) {
        print!("{}", self.render());
    }

    fn border(&self, left: &str, join: &str, right: &str) -> String {
        let segments: Vec<String> = self
            .col_widths
            .iter()
            .map(|w| box_chars::HORIZONTAL.repeat(w + 2))
            .collect();
        format!("{}{}{}", left, segments.join(join), right)
            .with(colors::CYAN)
            .to_string()
    }

    fn line(&self, cells: &[String], color: CtColor) -> String {
        let bar = box_chars::VERTICAL.with(colors::CYAN).to_string();
        let mut out = bar.clone();
        for (i, width) in self.col_widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            let padding = width.saturating_sub(cell.width());
            out.push_str(&format!(" {}{} ", cell.with(color), " ".repeat(padding)));
            out.push_str(&bar);
        }
        out
    }

    pub fn render(&self) -> String {
        let mut lines = vec![
            self.border(box_chars::ROUND_TOP_LEFT, box_chars::T_TOP, box_chars::ROUND_TOP_RIGHT),
            self.line(&self.headers, colors::CYAN),
            self.border(box_chars::T_LEFT, box_chars::CROSS, box_chars::T_RIGHT),
        ];
        for row in &self.rows {
            lines.push(self.line(row, colors::WHITE));
        }
        lines.push(self.border(
            box_chars::ROUND_BOTTOM_LEFT,
            box_chars::T_BOTTOM,
            box_chars::ROUND_BOTTOM_RIGHT,
        ));
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ratio() {
        assert_eq!(format_ratio(Some(0.5)), "0.5000");
        assert_eq!(format_ratio(None), "-");
    }

    #[test]
    fn test_table_widths_follow_widest_cell() {
        let mut table = TableBuilder::new(vec!["#", "track"]);
        assert!(table.is_empty());
        table.add_row(vec!["1".to_string(), "a much longer track id".to_string()]);
        assert_eq!(table.col_widths, vec![1, "a much longer track id".len()]);

        let rendered = table.render();
        assert_eq!(rendered.lines().count(), 5);
        assert!(rendered.contains("a much longer track id"));
    }
}
