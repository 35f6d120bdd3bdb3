//! Output formatting: human-readable by default, `--json` for scripting.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use serde::Serialize;

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(result).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Whether to paint a cell based on `use_colors`; kept as a free function
/// so every table builder in this module applies colors consistently.
fn colored_cell(text: impl ToString, color: Color, use_colors: bool) -> Cell {
    let cell = Cell::new(text.to_string());
    if use_colors {
        cell.fg(color)
    } else {
        cell
    }
}

/// Whether the current terminal wants ANSI colors at all, respecting
/// `NO_COLOR` and piped output the way `console` detects it.
pub fn colors_enabled() -> bool {
    console::colors_enabled() && std::env::var("NO_COLOR").is_err()
}

/// Renders the learned-strategy table shown by `rl-engine strategies`.
/// `best_q_value` is colored green/red by sign so a skim of the table
/// surfaces which contexts have learned something useful yet.
pub fn strategies_table(rows: &[(String, String, f64, u64, f64)]) -> String {
    let use_colors = colors_enabled();
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("context").add_attribute(Attribute::Bold),
            Cell::new("best_action").add_attribute(Attribute::Bold),
            Cell::new("best_q").add_attribute(Attribute::Bold),
            Cell::new("experiences").add_attribute(Attribute::Bold),
            Cell::new("confidence").add_attribute(Attribute::Bold),
        ]);

    for (context, best_action, best_q_value, total_experiences, confidence) in rows {
        let q_color = if *best_q_value >= 0.0 { Color::Green } else { Color::Red };
        table.add_row(vec![
            Cell::new(context),
            Cell::new(best_action),
            colored_cell(format!("{best_q_value:.4}"), q_color, use_colors),
            Cell::new(total_experiences),
            Cell::new(format!("{confidence:.3}")),
        ]);
    }

    table.to_string()
}
