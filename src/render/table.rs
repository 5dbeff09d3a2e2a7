//! Table construction: column width allocation and first-column merging.

use crate::config::{Alignment, TableStyle};
use crate::model::{
    Paragraph, ParagraphProps, RunProps, Table, TableCell, TableData, TableRow, TextRun,
    VerticalAlign, VerticalMerge,
};
use crate::style::LineSpacing;

/// Width allocation constants, all in centimeters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableLayout {
    /// Width a column of median content length receives
    pub reference_col: f64,
    pub min_col: f64,
    pub max_col: f64,
    /// Columns whose content is at most this many display units get `min_col`
    pub short_threshold: usize,
    pub min_table: f64,
    pub max_table: f64,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            reference_col: 3.0,
            min_col: 1.2,
            max_col: 6.0,
            short_threshold: 3,
            min_table: 8.0,
            max_table: 16.0,
        }
    }
}

const RESCALE_PASSES: usize = 8;
const EPSILON: f64 = 1e-9;

impl TableLayout {
    /// Column widths for the given per-column content lengths (display units).
    pub fn column_widths(&self, lengths: &[usize]) -> Vec<f64> {
        if lengths.is_empty() {
            return Vec::new();
        }

        let nonzero: Vec<usize> = lengths.iter().copied().filter(|&l| l > 0).collect();
        if nonzero.is_empty() {
            let total = (lengths.len() as f64 * self.reference_col)
                .clamp(self.min_table, self.max_table);
            let each = self.clamp_col(total / lengths.len() as f64);
            return vec![each; lengths.len()];
        }

        let char_width = self.reference_col / median(&nonzero);
        let mut widths: Vec<f64> = lengths
            .iter()
            .map(|&len| {
                if len <= self.short_threshold {
                    self.min_col
                } else {
                    self.clamp_col(len as f64 * char_width)
                }
            })
            .collect();

        self.rescale(&mut widths);
        widths
    }

    fn clamp_col(&self, width: f64) -> f64 {
        width.clamp(self.min_col, self.max_col)
    }

    /// Bring the total into the table range. The first pass scales every
    /// column and re-clamps; later passes spread what clamping undid over
    /// the columns still free to move.
    fn rescale(&self, widths: &mut [f64]) {
        for pass in 0..RESCALE_PASSES {
            let total: f64 = widths.iter().sum();
            let target = if total < self.min_table - EPSILON {
                self.min_table
            } else if total > self.max_table + EPSILON {
                self.max_table
            } else {
                return;
            };
            let growing = target > total;

            let (free, pinned): (Vec<usize>, Vec<usize>) = (0..widths.len()).partition(|&i| {
                pass == 0
                    || if growing {
                        widths[i] < self.max_col - EPSILON
                    } else {
                        widths[i] > self.min_col + EPSILON
                    }
            });
            let free_sum: f64 = free.iter().map(|&i| widths[i]).sum();
            let pinned_sum: f64 = pinned.iter().map(|&i| widths[i]).sum();
            if free.is_empty() || free_sum <= 0.0 {
                return;
            }

            let ratio = (target - pinned_sum) / free_sum;
            for &i in &free {
                widths[i] = self.clamp_col(widths[i] * ratio);
            }
        }
    }
}

/// Display width of a string: non-ASCII characters count double.
pub fn display_width(text: &str) -> usize {
    text.chars().map(|c| if c.is_ascii() { 1 } else { 2 }).sum()
}

/// Per-column maximum display width over every row, header included.
pub fn column_lengths(data: &TableData) -> Vec<usize> {
    (0..data.cols)
        .map(|col| {
            (0..data.rows)
                .map(|row| display_width(data.cell(row, col)))
                .max()
                .unwrap_or(0)
        })
        .collect()
}

/// Merge state of each first-column cell, by row index.
///
/// Runs of identical, non-empty consecutive values among data rows merge
/// into one cell. The header row never takes part.
pub fn first_column_merges(data: &TableData) -> Vec<Option<VerticalMerge>> {
    let mut merges = vec![None; data.rows];
    let mut row = data.first_data_row();

    while row < data.rows {
        let value = data.cell(row, 0);
        let mut end = row + 1;
        while end < data.rows && !value.is_empty() && data.cell(end, 0) == value {
            end += 1;
        }
        if end - row > 1 {
            merges[row] = Some(VerticalMerge::Restart);
            for merge in &mut merges[row + 1..end] {
                *merge = Some(VerticalMerge::Continue);
            }
        }
        row = end;
    }
    merges
}

/// Build a styled table from a table node's data.
pub fn build_table(data: &TableData, style: &TableStyle, layout: &TableLayout) -> Table {
    let widths = layout.column_widths(&column_lengths(data));
    let merges = first_column_merges(data);
    let first_data = data.first_data_row();

    let rows = (0..data.rows)
        .map(|r| {
            let is_header = data.has_header && r == 0;
            let fill = if is_header {
                Some(style.header_background.clone())
            } else if (r - first_data) % 2 == 1 {
                style.alternate_row_color.clone()
            } else {
                None
            };

            let cells = (0..data.cols)
                .map(|c| {
                    let merge = if c == 0 { merges[r] } else { None };
                    let mut cell = TableCell::new(cell_paragraph(
                        data.cell(r, c),
                        style,
                        is_header,
                        merge.is_some(),
                    ));
                    cell.width = widths[c];
                    cell.shading = fill.clone();
                    if let Some(merge) = merge {
                        cell.vertical_merge = Some(merge);
                        cell.vertical_align = VerticalAlign::Center;
                    }
                    cell
                })
                .collect();

            TableRow { cells, is_header }
        })
        .collect();

    Table {
        rows,
        column_widths: widths,
        border_width: style.border_width,
        border_color: style.border_color.clone(),
        cell_margin: style.cell_padding,
    }
}

fn cell_paragraph(text: &str, style: &TableStyle, is_header: bool, merged: bool) -> Paragraph {
    let props = ParagraphProps {
        alignment: if merged {
            Alignment::Center
        } else {
            style.cell_alignment
        },
        line_spacing: LineSpacing::Multiple(1.0),
        space_before: 0.0,
        space_after: 0.0,
        ..ParagraphProps::default()
    };

    let mut run = RunProps {
        font_family: style.cell_font_family.clone(),
        font_size: f64::from(style.cell_font_size),
        ..RunProps::default()
    };
    if is_header {
        run.color = style.header_font_color.clone();
        run.bold = style.header_font_bold;
    }

    let mut paragraph = Paragraph::new(props);
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            paragraph.add_line_break();
        }
        if !line.is_empty() {
            paragraph.add_run(TextRun::new(line, run.clone()));
        }
    }
    paragraph
}

fn median(values: &[usize]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
    } else {
        sorted[mid] as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(rows: &[&[&str]], has_header: bool) -> TableData {
        TableData::new(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
            has_header,
        )
    }

    fn assert_in_bounds(widths: &[f64], layout: &TableLayout) {
        let total: f64 = widths.iter().sum();
        assert!(
            total >= layout.min_table - 1e-6 && total <= layout.max_table + 1e-6,
            "total {} out of range",
            total
        );
        for w in widths {
            assert!(*w >= layout.min_col - 1e-6 && *w <= layout.max_col + 1e-6, "column {}", w);
        }
    }

    #[test]
    fn test_display_width() {
        assert_eq!(display_width("abc"), 3);
        assert_eq!(display_width("中文"), 4);
        assert_eq!(display_width("a中"), 3);
        assert_eq!(display_width(""), 0);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[5, 1, 3]), 3.0);
        assert_eq!(median(&[4, 2]), 3.0);
    }

    #[test]
    fn test_all_empty_columns_split_evenly() {
        let layout = TableLayout::default();
        // 3 * 3.0 = 9.0 is inside the table range.
        assert_eq!(layout.column_widths(&[0, 0, 0]), vec![3.0, 3.0, 3.0]);
        // 2 * 3.0 = 6.0 is raised to the 8.0 minimum.
        assert_eq!(layout.column_widths(&[0, 0]), vec![4.0, 4.0]);
    }

    #[test]
    fn test_short_columns_get_minimum_then_rescale() {
        let layout = TableLayout::default();
        let widths = layout.column_widths(&[2, 10, 10]);
        // Before rescaling: [1.2, 3.0, 3.0] = 7.2, below 8.0.
        assert_in_bounds(&widths, &layout);
        assert!(widths[0] < widths[1]);
        assert!((widths[1] - widths[2]).abs() < 1e-9);
    }

    #[test]
    fn test_wide_table_shrinks_to_max() {
        let layout = TableLayout::default();
        // Six median-length columns at 3.0 each exceed 16.0.
        let widths = layout.column_widths(&[40; 6]);
        assert_in_bounds(&widths, &layout);
        assert!((widths.iter().sum::<f64>() - 16.0).abs() < 1e-6);
    }

    #[test]
    fn test_reclamp_residual_is_redistributed() {
        let layout = TableLayout::default();
        // Many short columns sit at the minimum; shrinking must come from
        // the long ones.
        let widths = layout.column_widths(&[1, 1, 1, 1, 1, 1, 50, 50, 50]);
        assert_in_bounds(&widths, &layout);
    }

    #[test]
    fn test_widths_within_bounds_for_mixed_content() {
        let layout = TableLayout::default();
        for lengths in [
            vec![4, 8, 16],
            vec![30, 5],
            vec![6, 6, 6, 6, 6, 6],
            vec![100, 1, 0, 7],
        ] {
            assert_in_bounds(&layout.column_widths(&lengths), &layout);
        }
    }

    #[test]
    fn test_first_column_merge_headerless() {
        let table = data(&[&["A", "1"], &["A", "2"], &["B", "3"]], false);
        let merges = first_column_merges(&table);
        assert_eq!(
            merges,
            vec![Some(VerticalMerge::Restart), Some(VerticalMerge::Continue), None]
        );
    }

    #[test]
    fn test_header_excluded_from_merge() {
        let table = data(&[&["A", "h"], &["A", "1"], &["A", "2"]], true);
        let merges = first_column_merges(&table);
        assert_eq!(merges[0], None);
        assert_eq!(merges[1], Some(VerticalMerge::Restart));
        assert_eq!(merges[2], Some(VerticalMerge::Continue));
    }

    #[test]
    fn test_empty_cells_do_not_merge() {
        let table = data(&[&["", "1"], &["", "2"]], false);
        assert_eq!(first_column_merges(&table), vec![None, None]);
    }

    #[test]
    fn test_build_table_styles() {
        let style = TableStyle::default();
        let table = data(&[&["名称", "值"], &["A", "1"], &["A", "2"], &["B", "3"]], true);
        let built = build_table(&table, &style, &TableLayout::default());

        assert_eq!(built.row_count(), 4);
        assert_eq!(built.column_count(), 2);
        assert!(built.rows[0].is_header);

        let header = built.cell(0, 0).unwrap();
        assert_eq!(header.shading.as_deref(), Some(style.header_background.as_str()));
        let run = header.content[0].runs().next().unwrap();
        assert!(run.props.bold);
        assert_eq!(run.props.color, style.header_font_color);

        let merged = built.cell(1, 0).unwrap();
        assert_eq!(merged.vertical_merge, Some(VerticalMerge::Restart));
        assert_eq!(merged.vertical_align, VerticalAlign::Center);
        assert_eq!(merged.content[0].props.alignment, Alignment::Center);
        assert_eq!(built.cell(2, 0).unwrap().vertical_merge, Some(VerticalMerge::Continue));
        assert_eq!(built.cell(3, 0).unwrap().vertical_merge, None);

        // Second data row takes the alternate fill.
        assert_eq!(built.cell(1, 1).unwrap().shading, None);
        assert_eq!(built.cell(2, 1).unwrap().shading, style.alternate_row_color);

        for row in &built.rows {
            for (cell, width) in row.cells.iter().zip(&built.column_widths) {
                assert_eq!(cell.width, *width);
            }
        }
    }
}
