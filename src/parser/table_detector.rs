//! Table detection using text position analysis (stream mode).
//!
//! Fallback for pages whose tables carry no ruling lines: rows are formed
//! from runs sharing a baseline and columns from left edges that line up
//! across rows.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::model::BBox;

use super::content::TextRun;

/// A detected table region with its content.
#[derive(Debug, Clone)]
pub struct DetectedTable {
    /// Region covered by the table's runs
    pub bbox: BBox,
    /// Detected column boundaries (X coordinates)
    pub columns: Vec<f32>,
    /// Rows of runs grouped by baseline
    pub rows: Vec<TableRowData>,
}

/// A row of text runs in a table.
#[derive(Debug, Clone)]
pub struct TableRowData {
    /// Average baseline of this row
    pub y: f32,
    /// Runs in this row
    pub spans: Vec<TextRun>,
}

/// Table detector configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDetectorConfig {
    /// Minimum number of rows to consider as table
    pub min_rows: usize,
    /// Minimum number of columns to consider as table
    pub min_columns: usize,
    /// Maximum number of columns (above this, likely word-level splitting)
    pub max_columns: usize,
    /// Baseline tolerance for grouping runs into rows (fraction of font size)
    pub y_tolerance_factor: f32,
    /// Minimum column alignment ratio (0.0-1.0)
    pub min_alignment_ratio: f32,
    /// Minimum gap between columns (points)
    pub min_column_gap: f32,
}

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 6,
            y_tolerance_factor: 0.4,
            min_alignment_ratio: 0.3,
            min_column_gap: 15.0,
        }
    }
}

/// Detects tables in a page's text runs.
#[derive(Debug, Clone, Default)]
pub struct TableDetector {
    config: TableDetectorConfig,
}

impl TableDetector {
    pub fn new(config: TableDetectorConfig) -> Self {
        Self { config }
    }

    /// Detect tables among the given runs.
    pub fn detect(&self, spans: &[TextRun]) -> Vec<DetectedTable> {
        if spans.len() < self.config.min_rows * self.config.min_columns {
            log::debug!("TableDetector: not enough runs ({})", spans.len());
            return vec![];
        }

        let rows = self.group_into_rows(spans);
        if rows.len() < self.config.min_rows {
            return vec![];
        }

        let columns = self.detect_columns(&rows);
        log::debug!(
            "TableDetector: {} rows, columns at {:?}",
            rows.len(),
            columns
        );
        if columns.len() < self.config.min_columns {
            return vec![];
        }

        let mut detected = Vec::new();
        for (start_row, end_row) in self.find_table_regions(&rows, &columns) {
            let table_rows: Vec<TableRowData> = rows[start_row..=end_row].to_vec();

            // Re-detect columns for this specific table region
            let table_columns = self.detect_columns(&table_rows);
            if table_columns.len() < self.config.min_columns {
                continue;
            }
            if table_columns.len() > self.config.max_columns {
                log::debug!(
                    "TableDetector: skipping region, too many columns ({} > {})",
                    table_columns.len(),
                    self.config.max_columns
                );
                continue;
            }
            if self.is_list_pattern(&table_rows, &table_columns) {
                log::debug!("TableDetector: skipping region, detected as list pattern");
                continue;
            }

            let bbox = table_rows
                .iter()
                .flat_map(|r| r.spans.iter())
                .map(TextRun::bbox)
                .reduce(|a, b| a.union(&b));
            if let Some(bbox) = bbox {
                detected.push(DetectedTable {
                    bbox,
                    columns: table_columns,
                    rows: table_rows,
                });
            }
        }

        detected
    }

    /// Group runs into rows by baseline, top to bottom.
    fn group_into_rows(&self, spans: &[TextRun]) -> Vec<TableRowData> {
        let mut sorted_spans: Vec<TextRun> = spans
            .iter()
            .filter(|s| !s.text.trim().is_empty())
            .cloned()
            .collect();
        sorted_spans.sort_by(|a, b| {
            a.baseline
                .partial_cmp(&b.baseline)
                .unwrap_or(Ordering::Equal)
                .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
        });

        let mut rows: Vec<TableRowData> = Vec::new();
        let mut current_row_spans: Vec<TextRun> = Vec::new();
        let mut current_y: Option<f32> = None;

        for span in sorted_spans {
            let y_tolerance = span.font_size * self.config.y_tolerance_factor;

            match current_y {
                Some(y) if (span.baseline - y).abs() <= y_tolerance => {
                    current_row_spans.push(span);
                }
                _ => {
                    if !current_row_spans.is_empty() {
                        rows.push(make_row(std::mem::take(&mut current_row_spans)));
                    }
                    current_y = Some(span.baseline);
                    current_row_spans.push(span);
                }
            }
        }

        if !current_row_spans.is_empty() {
            rows.push(make_row(current_row_spans));
        }

        rows
    }

    /// Detect column boundaries from left edges aligned across rows.
    ///
    /// Rows with two or more runs are preferred; when too few exist every row votes.
    fn detect_columns(&self, rows: &[TableRowData]) -> Vec<f32> {
        let multi_span_rows: Vec<&TableRowData> =
            rows.iter().filter(|r| r.spans.len() >= 2).collect();

        let (voters, once_per_row): (Vec<&TableRowData>, bool) =
            if multi_span_rows.len() >= self.config.min_rows {
                (multi_span_rows, true)
            } else {
                (rows.iter().collect(), false)
            };
        if voters.is_empty() {
            return vec![];
        }

        let bucket_size = 5.0;
        let mut edge_counts: HashMap<i32, usize> = HashMap::new();
        for row in &voters {
            let buckets = row.spans.iter().map(|s| (s.x / bucket_size).round() as i32);
            if once_per_row {
                for bucket in buckets.collect::<HashSet<_>>() {
                    *edge_counts.entry(bucket).or_insert(0) += 1;
                }
            } else {
                for bucket in buckets {
                    *edge_counts.entry(bucket).or_insert(0) += 1;
                }
            }
        }

        let min_occurrences =
            ((voters.len() as f32 * self.config.min_alignment_ratio) as usize).max(2);

        let mut column_edges: Vec<f32> = edge_counts
            .iter()
            .filter(|(_, count)| **count >= min_occurrences)
            .map(|(bucket, _)| *bucket as f32 * bucket_size)
            .collect();
        column_edges.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        let mut merged_edges: Vec<f32> = Vec::new();
        for edge in column_edges {
            match merged_edges.last() {
                Some(&last) if edge - last < self.config.min_column_gap => {}
                _ => merged_edges.push(edge),
            }
        }
        merged_edges
    }

    /// Find contiguous row regions that form tables.
    fn find_table_regions(&self, rows: &[TableRowData], columns: &[f32]) -> Vec<(usize, usize)> {
        let mut regions = Vec::new();
        let mut current_start: Option<usize> = None;
        let mut consecutive_table_rows = 0;

        for (i, row) in rows.iter().enumerate() {
            if self.calculate_alignment_score(row, columns) >= self.config.min_alignment_ratio {
                current_start.get_or_insert(i);
                consecutive_table_rows += 1;
            } else {
                if let Some(start) = current_start {
                    if consecutive_table_rows >= self.config.min_rows {
                        regions.push((start, i - 1));
                    }
                }
                current_start = None;
                consecutive_table_rows = 0;
            }
        }

        if let Some(start) = current_start {
            if consecutive_table_rows >= self.config.min_rows {
                regions.push((start, rows.len() - 1));
            }
        }

        regions
    }

    /// Share of a row's runs that start on a detected column.
    fn calculate_alignment_score(&self, row: &TableRowData, columns: &[f32]) -> f32 {
        if row.spans.is_empty() || columns.is_empty() {
            return 0.0;
        }
        let tolerance = 5.0;
        let aligned = row
            .spans
            .iter()
            .filter(|span| columns.iter().any(|col| (span.x - col).abs() <= tolerance))
            .count();
        aligned as f32 / row.spans.len() as f32
    }

    /// Cell grid for a detected table; columns no run falls into are `None`.
    pub fn to_rows(&self, detected: &DetectedTable) -> Vec<Vec<Option<String>>> {
        let columns = &detected.columns;

        detected
            .rows
            .iter()
            .map(|row| {
                let mut cell_contents: Vec<Vec<&str>> = vec![Vec::new(); columns.len()];
                let mut spans: Vec<&TextRun> = row.spans.iter().collect();
                spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
                for span in spans {
                    let col_idx = find_column_for_span(span.x, columns, detected.bbox.x1);
                    if let Some(cell) = cell_contents.get_mut(col_idx) {
                        cell.push(span.text.trim());
                    }
                }
                cell_contents
                    .into_iter()
                    .map(|parts| {
                        if parts.is_empty() {
                            None
                        } else {
                            Some(parts.join(" "))
                        }
                    })
                    .collect()
            })
            .collect()
    }

    /// Whether the rows are really a numbered or bulleted list split at the marker.
    fn is_list_pattern(&self, rows: &[TableRowData], columns: &[f32]) -> bool {
        if columns.len() < 2 || rows.is_empty() {
            return false;
        }

        let mut bullet_count = 0;
        let mut number_count = 0;
        for row in rows {
            let first_span = row
                .spans
                .iter()
                .min_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
            if let Some(span) = first_span {
                let text = span.text.trim();
                if is_bullet_marker(text) {
                    bullet_count += 1;
                } else if is_number_marker(text) {
                    number_count += 1;
                }
            }
        }

        let bullet_ratio = bullet_count as f32 / rows.len() as f32;
        let total_ratio = (bullet_count + number_count) as f32 / rows.len() as f32;

        // Bullet markers are almost never real table data
        if bullet_ratio >= 0.5 {
            return true;
        }
        // Numbered first columns are common in real tables; only two-column regions are rejected
        columns.len() == 2 && total_ratio >= 0.5
    }
}

fn make_row(spans: Vec<TextRun>) -> TableRowData {
    let y = spans.iter().map(|s| s.baseline).sum::<f32>() / spans.len() as f32;
    TableRowData { y, spans }
}

/// Column index whose range contains `span_x`, else the nearest column start.
fn find_column_for_span(span_x: f32, columns: &[f32], right_x: f32) -> usize {
    for (i, &col_start) in columns.iter().enumerate() {
        let col_end = columns.get(i + 1).copied().unwrap_or(right_x + 100.0);
        if span_x >= col_start - 10.0 && span_x < col_end - 10.0 {
            return i;
        }
    }

    columns
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (span_x - **a)
                .abs()
                .partial_cmp(&(span_x - **b).abs())
                .unwrap_or(Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Check if text is a bullet marker.
fn is_bullet_marker(text: &str) -> bool {
    matches!(
        text.trim(),
        "-" | "–" | "—" | "•" | "·" | "*" | "○" | "▪" | "◦" | "▸" | "►" | "■" | "●" | "□" | "◆" | "o"
    )
}

/// Check if text is a number-style list marker (1., 2), a., etc.).
fn is_number_marker(text: &str) -> bool {
    let cleaned: String = text.trim().chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return false;
    }

    if let Some(pos) = cleaned.find(|c: char| !c.is_ascii_digit()) {
        let (prefix, suffix) = cleaned.split_at(pos);
        if !prefix.is_empty() && (suffix == "." || suffix == ")") {
            return true;
        }
    }

    if cleaned.parse::<u32>().is_ok() {
        return true;
    }

    let chars: Vec<char> = cleaned.chars().collect();
    chars.len() == 2 && chars[0].is_alphabetic() && (chars[1] == '.' || chars[1] == ')')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_span(text: &str, x: f32, y: f32) -> TextRun {
        TextRun {
            text: text.to_string(),
            x,
            baseline: y,
            width: text.len() as f32 * 6.0,
            font_size: 12.0,
            font_name: "Helvetica".to_string(),
        }
    }

    #[test]
    fn test_group_into_rows() {
        let detector = TableDetector::default();
        let spans = vec![
            make_span("A1", 10.0, 100.0),
            make_span("B1", 60.0, 100.0),
            make_span("A2", 10.0, 115.0),
            make_span("B2", 60.0, 115.0),
        ];

        let rows = detector.group_into_rows(&spans);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].spans.len(), 2);
        assert_eq!(rows[0].spans[0].text, "A1");
    }

    #[test]
    fn test_detect_simple_table() {
        let detector = TableDetector::default();
        let spans = vec![
            make_span("Name", 10.0, 100.0),
            make_span("Age", 60.0, 100.0),
            make_span("Alice", 10.0, 115.0),
            make_span("30", 60.0, 115.0),
            make_span("Bob", 10.0, 130.0),
            make_span("25", 60.0, 130.0),
        ];

        let tables = detector.detect(&spans);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows.len(), 3);
        assert_eq!(tables[0].columns.len(), 2);

        let rows = detector.to_rows(&tables[0]);
        assert_eq!(rows[0], vec![Some("Name".to_string()), Some("Age".to_string())]);
        assert_eq!(rows[2], vec![Some("Bob".to_string()), Some("25".to_string())]);
    }

    #[test]
    fn test_empty_column_is_none() {
        let detector = TableDetector::default();
        let spans = vec![
            make_span("CMD", 10.0, 100.0),
            make_span("Type", 60.0, 100.0),
            make_span("Desc", 120.0, 100.0),
            make_span("CMD0", 10.0, 115.0),
            make_span("bc", 60.0, 115.0),
            make_span("reset", 120.0, 115.0),
            make_span("ac", 60.0, 130.0),
            make_span("more", 120.0, 130.0),
        ];
        let tables = detector.detect(&spans);
        assert_eq!(tables.len(), 1);
        let rows = detector.to_rows(&tables[0]);
        assert_eq!(rows[2][0], None);
        assert_eq!(rows[2][1], Some("ac".to_string()));
    }

    #[test]
    fn test_no_table_single_column() {
        let detector = TableDetector::default();
        let spans = vec![
            make_span("Line 1", 10.0, 100.0),
            make_span("Line 2", 10.0, 115.0),
            make_span("Line 3", 10.0, 130.0),
            make_span("Line 4", 10.0, 145.0),
        ];
        assert!(detector.detect(&spans).is_empty());
    }

    #[test]
    fn test_bullet_list_not_detected_as_table() {
        let detector = TableDetector::default();
        let spans = vec![
            make_span("-", 50.0, 400.0),
            make_span("Management", 80.0, 400.0),
            make_span("-", 50.0, 415.0),
            make_span("Interface option", 80.0, 415.0),
            make_span("-", 50.0, 430.0),
            make_span("Firmware", 80.0, 430.0),
        ];
        assert!(detector.detect(&spans).is_empty());
    }

    #[test]
    fn test_list_markers() {
        assert!(is_number_marker("1."));
        assert!(is_number_marker("12)"));
        assert!(is_number_marker("1 ."));
        assert!(is_number_marker("a."));
        assert!(is_bullet_marker("•"));
        assert!(!is_number_marker("Name"));
        assert!(!is_bullet_marker("CMD0"));
    }
}
