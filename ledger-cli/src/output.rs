//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, CellAlignment, ContentArrangement, Table};
use rust_decimal::Decimal;

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a dimmed hint
pub fn hint(msg: &str) {
    println!("{}", msg.dimmed());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Right-aligned money cell with the currency code appended
pub fn amount_cell(amount: Decimal, currency: &str) -> Cell {
    Cell::new(format!("{} {}", format_amount(amount), currency)).set_alignment(CellAlignment::Right)
}

/// Always four decimal places
pub fn format_amount(amount: Decimal) -> String {
    let mut scaled = amount;
    scaled.rescale(4);
    scaled.to_string()
}
