//! Table strategy selection, plausibility filtering and cell cleanup.

use crate::model::{is_filled, RawTable};

use super::cleanup::CleanupPipeline;
use super::content::TextRun;
use super::lattice::{Edge, LatticeConfig, LatticeFinder, Orientation};
use super::layout::Word;
use super::table_detector::{TableDetector, TableDetectorConfig};

/// Rules wider than this share of the page width count as full-width.
const FULL_WIDTH_SHARE: f32 = 0.6;
/// Gap range (points) between two full-width rules that marks a decorated heading.
const DECORATION_GAP: (f32, f32) = (10.0, 30.0);
/// Tables with at most this many columns are always plausible.
const MAX_TRUSTED_COLUMNS: usize = 8;
/// Wide tables below this fill rate are rejected.
const MIN_WIDE_FILL_RATE: f32 = 0.40;

/// Whether the page carries two full-width horizontal rules 10-30pt apart,
/// a chapter-heading style the text-alignment strategy misreads as a table.
pub fn is_heading_decorated(edges: &[Edge], page_width: f32) -> bool {
    let mut rules: Vec<&Edge> = edges
        .iter()
        .filter(|e| e.orientation == Orientation::Horizontal)
        .filter(|e| e.length() > page_width * FULL_WIDTH_SHARE)
        .collect();
    rules.sort_by(|a, b| a.top.partial_cmp(&b.top).unwrap_or(std::cmp::Ordering::Equal));

    // Clear space between rules, so thick rules measure the same as hairlines
    rules.windows(2).any(|w| {
        let gap = w[1].top - w[0].bottom;
        (DECORATION_GAP.0..=DECORATION_GAP.1).contains(&gap)
    })
}

/// Reject grids that are really a decorated heading or a sparse layout.
pub fn is_plausible(rows: &[Vec<Option<String>>]) -> bool {
    if rows.is_empty() {
        return false;
    }
    let columns = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    if columns <= MAX_TRUSTED_COLUMNS {
        return true;
    }

    let filled_in = |row: &Vec<Option<String>>| row.iter().filter(|c| is_filled(c.as_deref())).count();
    let lone_heading = |row: Option<&Vec<Option<String>>>| row.map(|r| filled_in(r) == 1).unwrap_or(false);
    if lone_heading(rows.first()) || lone_heading(rows.last()) {
        return false;
    }

    let total: usize = rows.iter().map(|r| r.len()).sum();
    let filled: usize = rows.iter().map(filled_in).sum();
    total > 0 && filled as f32 / total as f32 >= MIN_WIDE_FILL_RATE
}

/// Drop all-empty rows, null out lone `i` glyph artifacts and clean cell text.
pub fn clean_cells(rows: Vec<Vec<Option<String>>>, cleanup: &CleanupPipeline) -> Vec<Vec<Option<String>>> {
    rows.into_iter()
        .filter(|row| row.iter().any(|c| is_filled(c.as_deref())))
        .map(|row| {
            row.into_iter()
                .map(|cell| {
                    cell.and_then(|text| {
                        if text.trim() == "i" {
                            None
                        } else {
                            Some(cleanup.process(&text))
                        }
                    })
                })
                .collect()
        })
        .collect()
}

/// Finds tables on a page with the ruled-line strategy first and the
/// text-alignment strategy as a guarded fallback.
#[derive(Debug, Clone, Default)]
pub struct TableExtractor {
    lattice: LatticeFinder,
    stream: TableDetector,
}

impl TableExtractor {
    pub fn new(lattice: LatticeConfig, stream: TableDetectorConfig) -> Self {
        Self {
            lattice: LatticeFinder::new(lattice),
            stream: TableDetector::new(stream),
        }
    }

    pub fn extract(
        &self,
        words: &[Word],
        runs: &[TextRun],
        edges: &[Edge],
        page_width: f32,
        cleanup: &CleanupPipeline,
    ) -> Vec<RawTable> {
        let mut candidates: Vec<RawTable> = self
            .lattice
            .find_tables(edges)
            .into_iter()
            .map(|t| RawTable::new(t.bbox, t.extract(words)))
            .collect();

        if candidates.is_empty() {
            if is_heading_decorated(edges, page_width) {
                log::debug!("Tables: heading decoration present, skipping text-alignment fallback");
            } else {
                candidates = self
                    .stream
                    .detect(runs)
                    .into_iter()
                    .map(|t| RawTable::new(t.bbox, self.stream.to_rows(&t)))
                    .collect();
                log::debug!("Tables: text-alignment fallback found {}", candidates.len());
            }
        }

        candidates
            .into_iter()
            .filter_map(|table| {
                let rows = clean_cells(table.rows, cleanup);
                if is_plausible(&rows) {
                    Some(RawTable::new(table.bbox, rows))
                } else {
                    log::debug!("Tables: rejected implausible {}-row candidate", rows.len());
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<Option<String>> {
        values
            .iter()
            .map(|v| if v.is_empty() { None } else { Some(v.to_string()) })
            .collect()
    }

    #[test]
    fn test_heading_decoration() {
        let edges = vec![
            Edge::horizontal(50.0, 560.0, 100.0),
            Edge::horizontal(50.0, 560.0, 120.0),
        ];
        assert!(is_heading_decorated(&edges, 612.0));

        let far = vec![
            Edge::horizontal(50.0, 560.0, 100.0),
            Edge::horizontal(50.0, 560.0, 200.0),
        ];
        assert!(!is_heading_decorated(&far, 612.0));

        let narrow = vec![
            Edge::horizontal(50.0, 200.0, 100.0),
            Edge::horizontal(50.0, 200.0, 120.0),
        ];
        assert!(!is_heading_decorated(&narrow, 612.0));
    }

    #[test]
    fn test_decoration_gap_from_rule_bottom() {
        // 42pt top to top, but only 30pt of clear space under the 12pt bar
        let thick = Edge {
            bottom: 112.0,
            ..Edge::horizontal(50.0, 560.0, 100.0)
        };
        let edges = vec![Edge::horizontal(50.0, 560.0, 142.0), thick];
        assert!(is_heading_decorated(&edges, 612.0));
    }

    #[test]
    fn test_narrow_tables_always_plausible() {
        let rows = vec![cells(&["only", "", "", ""]), cells(&["", "", "", ""])];
        assert!(is_plausible(&rows));
        assert!(!is_plausible(&[]));
    }

    #[test]
    fn test_wide_table_with_lone_heading_rejected() {
        let mut rows = vec![cells(&["6.1 Heading", "", "", "", "", "", "", "", ""])];
        rows.push(cells(&["a", "b", "c", "d", "e", "f", "g", "h", "i"]));
        assert!(!is_plausible(&rows));
    }

    #[test]
    fn test_wide_sparse_table_rejected() {
        let rows = vec![
            cells(&["a", "b", "", "", "", "", "", "", ""]),
            cells(&["c", "d", "", "", "", "", "", "", ""]),
        ];
        assert!(!is_plausible(&rows));

        let dense = vec![
            cells(&["a", "b", "c", "d", "", "", "", "", ""]),
            cells(&["a", "b", "c", "d", "e", "", "", "", ""]),
        ];
        assert!(is_plausible(&dense));
    }

    #[test]
    fn test_clean_cells() {
        let cleanup = CleanupPipeline::default();
        let rows = vec![
            vec![Some("CMD\u{2014}INDEX".to_string()), Some("i".to_string())],
            vec![None, Some("  ".to_string())],
        ];
        let cleaned = clean_cells(rows, &cleanup);
        assert_eq!(cleaned, vec![vec![Some("CMD-INDEX".to_string()), None]]);
    }
}
