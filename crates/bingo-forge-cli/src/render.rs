//! Plain-text rendering of a generated board.
//!
//! Boards are previewed as a bordered grid, one cell per tile, with tile
//! text word-wrapped into fixed-width columns.

use bingo_forge_core::Board;

/// Characters of tile text per grid column.
const CELL_WIDTH: usize = 20;

/// Render the board as a bordered text grid.
pub fn grid(board: &Board) -> String {
    let separator = separator_line(board.width);
    let mut out = separator.clone();
    out.push('\n');
    for y in 0..board.height {
        let cells: Vec<Vec<String>> = board
            .row(y)
            .map(|tile| wrap(&tile.text, CELL_WIDTH))
            .collect();
        let lines = cells.iter().map(Vec::len).max().unwrap_or(0);
        for line in 0..lines {
            out.push('|');
            for cell in &cells {
                let text = cell.get(line).map(String::as_str).unwrap_or("");
                out.push_str(&format!(" {text:<CELL_WIDTH$} |"));
            }
            out.push('\n');
        }
        out.push_str(&separator);
        out.push('\n');
    }
    out
}

fn separator_line(columns: usize) -> String {
    let mut line = String::from("+");
    for _ in 0..columns {
        line.push_str(&"-".repeat(CELL_WIDTH + 2));
        line.push('+');
    }
    line
}

/// Greedy word wrap into lines of at most `width` characters. Words wider
/// than a whole line are hard-split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word = word;
        while word.chars().count() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let split = word
                .char_indices()
                .nth(width)
                .map(|(index, _)| index)
                .unwrap_or(word.len());
            lines.push(word[..split].to_string());
            word = &word[split..];
        }
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
