// Display-width helpers for grid cells

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: &str = "..";

pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

fn char_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

/// Longest prefix of `s` no wider than `width` columns.
fn prefix_within(s: &str, width: usize) -> &str {
    let mut used = 0;
    for (i, ch) in s.char_indices() {
        used += char_width(ch);
        if used > width {
            return &s[..i];
        }
    }
    s
}

/// Fit `s` into `width` display columns. Cut text ends in "..", except
/// below three columns where only the leading characters are kept.
pub fn truncate_display(s: &str, width: usize) -> String {
    if display_width(s) <= width {
        return s.to_string();
    }
    if width < 3 {
        return prefix_within(s, width).to_string();
    }
    format!("{}{}", prefix_within(s, width - ELLIPSIS.len()), ELLIPSIS)
}

/// Left-align within exactly `width` columns.
pub fn pad_right(s: &str, width: usize) -> String {
    let cell = truncate_display(s, width);
    let fill = width.saturating_sub(display_width(&cell));
    format!("{}{}", cell, " ".repeat(fill))
}

/// Right-align within exactly `width` columns (numeric grid cells).
pub fn pad_left(s: &str, width: usize) -> String {
    let cell = truncate_display(s, width);
    let fill = width.saturating_sub(display_width(&cell));
    format!("{}{}", " ".repeat(fill), cell)
}

/// Spreadsheet-style column name: 0 -> A, 25 -> Z, 26 -> AA.
pub fn col_to_letter(col: usize) -> String {
    let mut letters = Vec::new();
    let mut n = col + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}
