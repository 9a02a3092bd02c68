// Plain-text grid rendering for non-interactive output

use crate::table::Table;
use crate::text::{pad_left, pad_right};

/// Render `table` as an aligned text grid. Numeric columns are
/// right-aligned. At most `max_rows` data rows are shown (0 = all); a
/// footer notes how many were left out.
pub fn render_grid(table: &Table, max_rows: usize) -> String {
    if table.num_cols() == 0 {
        return String::new();
    }

    let shown = if max_rows == 0 { table.num_rows() } else { max_rows.min(table.num_rows()) };
    let widths = table.col_widths(shown);
    let numeric: Vec<bool> = table.column_types().iter().map(|t| t.is_numeric()).collect();

    let mut out = String::new();

    let header: Vec<String> = table
        .columns
        .iter()
        .zip(&widths)
        .map(|(name, &w)| pad_right(name, w))
        .collect();
    out.push_str(header.join(" | ").trim_end());
    out.push('\n');

    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    out.push_str(&rule.join("-+-"));
    out.push('\n');

    for row in table.rows.iter().take(shown) {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(c, cell)| {
                if numeric[c] {
                    pad_left(cell, widths[c])
                } else {
                    pad_right(cell, widths[c])
                }
            })
            .collect();
        out.push_str(cells.join(" | ").trim_end());
        out.push('\n');
    }

    let hidden = table.num_rows() - shown;
    if hidden > 0 {
        out.push_str(&format!("({} more row{})\n", hidden, if hidden == 1 { "" } else { "s" }));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_grid() {
        let t = Table::from_csv_str("Region,Sales\nEast,100\nNorthwest,5\n").unwrap();
        let out = render_grid(&t, 0);
        let expected = "\
Region    | Sales
----------+------
East      |   100
Northwest |     5
";
        assert_eq!(out, expected);
    }

    #[test]
    fn row_cap_footer() {
        let t = Table::from_csv_str("n\n1\n2\n3\n").unwrap();
        let out = render_grid(&t, 1);
        assert!(out.ends_with("(2 more rows)\n"), "{}", out);
        assert_eq!(out.lines().count(), 4);
    }

    #[test]
    fn empty_table_renders_nothing() {
        assert_eq!(render_grid(&Table::default(), 0), "");
    }
}
