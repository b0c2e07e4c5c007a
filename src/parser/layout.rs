//! Layout analysis: text runs to lines, lines to blocks.
//!
//! Runs arrive in content-stream order with top-left-origin baselines. Lines
//! are formed from runs sharing a baseline and blocks from consecutive lines
//! with uniform spacing, font size and left edge.

use std::cmp::Ordering;

use crate::model::BBox;

use super::content::TextRun;

/// Thresholds for line and block grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    /// Baseline tolerance as a fraction of font size
    pub line_tolerance: f32,
    /// Gap (as a multiple of the average line spacing) that starts a new block
    pub paragraph_spacing_factor: f32,
    /// Gap (as a multiple of the larger font size) that always starts a new block
    pub max_gap_factor: f32,
    /// Font size change (points) that starts a new block
    pub font_size_jump: f32,
    /// Left-edge shift (points) that starts a new block
    pub indent_shift: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            line_tolerance: 0.3,
            paragraph_spacing_factor: 1.5,
            max_gap_factor: 2.0,
            font_size_jump: 1.0,
            indent_shift: 20.0,
        }
    }
}

/// Whether a font name denotes a bold face.
pub fn is_bold_font(font_name: &str) -> bool {
    let lower = font_name.to_lowercase();
    lower.contains("bold") || lower.contains("black") || lower.contains("heavy")
}

/// Whether a font name denotes an italic face.
pub fn is_italic_font(font_name: &str) -> bool {
    let lower = font_name.to_lowercase();
    lower.contains("italic") || lower.contains("oblique")
}

/// A text line composed of runs on the same baseline.
#[derive(Debug, Clone)]
pub struct TextLine {
    /// Runs sorted by X position
    pub runs: Vec<TextRun>,
    pub baseline: f32,
    /// Leftmost X position
    pub x: f32,
    /// Dominant font size, weighted by text length
    pub font_size: f32,
}

impl TextLine {
    pub fn from_runs(mut runs: Vec<TextRun>) -> Self {
        runs.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));

        let total_chars: usize = runs.iter().map(|r| r.text.len()).sum();
        let weighted: f32 = runs.iter().map(|r| r.font_size * r.text.len() as f32).sum();
        let font_size = if total_chars > 0 {
            weighted / total_chars as f32
        } else {
            runs.first().map(|r| r.font_size).unwrap_or(0.0)
        };

        Self {
            baseline: runs.first().map(|r| r.baseline).unwrap_or(0.0),
            x: runs.first().map(|r| r.x).unwrap_or(0.0),
            font_size,
            runs,
        }
    }

    /// Combined text, with spaces inserted where runs are visibly apart.
    pub fn text(&self) -> String {
        let mut result = String::new();

        for (i, run) in self.runs.iter().enumerate() {
            if i > 0 {
                let prev = &self.runs[i - 1];
                let gap = run.x - (prev.x + prev.width);
                let char_count = run.text.chars().count();
                let avg_char_width = if char_count > 0 && run.width > 0.0 {
                    run.width / char_count as f32
                } else {
                    run.font_size * 0.5
                };

                let both_cjk = prev.text.chars().last().map(is_spaceless_script_char).unwrap_or(false)
                    && run.text.chars().next().map(is_spaceless_script_char).unwrap_or(false);

                if gap > avg_char_width * 0.2
                    && !both_cjk
                    && !prev.text.ends_with(' ')
                    && !run.text.starts_with(' ')
                {
                    result.push(' ');
                }
            }
            result.push_str(&run.text);
        }

        result
    }

    /// Whether most of the line's characters are set in a bold face.
    pub fn is_bold(&self) -> bool {
        self.styled_share(|r| is_bold_font(&r.font_name)) > 0.5
    }

    pub fn is_italic(&self) -> bool {
        self.styled_share(|r| is_italic_font(&r.font_name)) > 0.5
    }

    fn styled_share(&self, styled: impl Fn(&TextRun) -> bool) -> f32 {
        let total: usize = self.runs.iter().map(|r| r.text.len()).sum();
        if total == 0 {
            return 0.0;
        }
        let matching: usize = self
            .runs
            .iter()
            .filter(|r| styled(r))
            .map(|r| r.text.len())
            .sum();
        matching as f32 / total as f32
    }

    pub fn bbox(&self) -> Option<BBox> {
        self.runs
            .iter()
            .map(TextRun::bbox)
            .reduce(|a, b| a.union(&b))
    }
}

/// A block of consecutive lines (a paragraph, heading or cell-like fragment).
#[derive(Debug, Clone)]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
}

impl TextBlock {
    /// Lines joined with newlines.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(TextLine::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn bbox(&self) -> Option<BBox> {
        self.lines
            .iter()
            .filter_map(TextLine::bbox)
            .reduce(|a, b| a.union(&b))
    }

    /// Average line font size rounded to one decimal.
    pub fn font_size(&self) -> f32 {
        if self.lines.is_empty() {
            return 0.0;
        }
        let avg = self.lines.iter().map(|l| l.font_size).sum::<f32>() / self.lines.len() as f32;
        (avg * 10.0).round() / 10.0
    }

    pub fn is_bold(&self) -> bool {
        self.lines.iter().any(TextLine::is_bold)
    }

    pub fn is_italic(&self) -> bool {
        self.lines.iter().any(TextLine::is_italic)
    }
}

/// Groups text runs into lines and blocks.
#[derive(Debug, Clone, Default)]
pub struct LayoutAnalyzer {
    config: LayoutConfig,
}

impl LayoutAnalyzer {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    /// Group runs into blocks in top-to-bottom reading order.
    pub fn analyze(&self, runs: Vec<TextRun>) -> Vec<TextBlock> {
        let lines = self.group_runs_into_lines(runs);
        log::debug!("Layout: {} lines", lines.len());
        self.group_lines_into_blocks(lines)
    }

    fn group_runs_into_lines(&self, mut runs: Vec<TextRun>) -> Vec<TextLine> {
        runs.retain(|r| !r.text.trim().is_empty());
        runs.sort_by(|a, b| {
            a.baseline
                .partial_cmp(&b.baseline)
                .unwrap_or(Ordering::Equal)
                .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
        });

        let mut lines = Vec::new();
        let mut current: Vec<TextRun> = Vec::new();
        let mut current_baseline: Option<f32> = None;

        for run in runs {
            let tolerance = run.font_size * self.config.line_tolerance;
            match current_baseline {
                Some(baseline) if (run.baseline - baseline).abs() <= tolerance => {
                    current.push(run);
                }
                _ => {
                    if !current.is_empty() {
                        lines.push(TextLine::from_runs(std::mem::take(&mut current)));
                    }
                    current_baseline = Some(run.baseline);
                    current.push(run);
                }
            }
        }

        if !current.is_empty() {
            lines.push(TextLine::from_runs(current));
        }

        lines
    }

    fn group_lines_into_blocks(&self, lines: Vec<TextLine>) -> Vec<TextBlock> {
        let avg_spacing = average_line_spacing(&lines);
        let mut blocks = Vec::new();
        let mut current: Vec<TextLine> = Vec::new();

        for line in lines {
            if let Some(prev) = current.last() {
                if self.should_break_block(prev, &line, avg_spacing) {
                    blocks.push(TextBlock {
                        lines: std::mem::take(&mut current),
                    });
                }
            }
            current.push(line);
        }

        if !current.is_empty() {
            blocks.push(TextBlock { lines: current });
        }

        blocks
    }

    fn should_break_block(&self, prev: &TextLine, curr: &TextLine, avg_spacing: f32) -> bool {
        let spacing = (curr.baseline - prev.baseline).abs();
        // Sparse pages inflate the average, so a wide gap breaks on its own
        let font_size = prev.font_size.max(curr.font_size);
        spacing > avg_spacing * self.config.paragraph_spacing_factor
            || (font_size > 0.0 && spacing > font_size * self.config.max_gap_factor)
            || (prev.font_size - curr.font_size).abs() > self.config.font_size_jump
            || (prev.x - curr.x).abs() > self.config.indent_shift
    }
}

fn average_line_spacing(lines: &[TextLine]) -> f32 {
    let spacings: Vec<f32> = lines
        .windows(2)
        .map(|w| (w[1].baseline - w[0].baseline).abs())
        .filter(|s| *s > 0.1)
        .collect();

    if spacings.is_empty() {
        return 12.0;
    }
    spacings.iter().sum::<f32>() / spacings.len() as f32
}

/// Check if character is from a script that doesn't use word spaces.
fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;
    (0x4E00..=0x9FFF).contains(&code)
        || (0x3400..=0x4DBF).contains(&code)
        || (0x3040..=0x309F).contains(&code)
        || (0x30A0..=0x30FF).contains(&code)
        || (0x3000..=0x303F).contains(&code)
}

/// A whitespace-delimited word with its approximate box.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub bbox: BBox,
}

/// Split runs into words, distributing each run's width over its characters.
pub fn split_words(runs: &[TextRun]) -> Vec<Word> {
    let mut words = Vec::new();

    for run in runs {
        let chars: Vec<char> = run.text.chars().collect();
        if chars.is_empty() {
            continue;
        }
        let char_width = run.width.max(0.0) / chars.len() as f32;
        let run_box = run.bbox();

        let mut start: Option<usize> = None;
        for i in 0..=chars.len() {
            let is_space = i == chars.len() || chars[i].is_whitespace();
            match (start, is_space) {
                (None, false) => start = Some(i),
                (Some(s), true) => {
                    words.push(Word {
                        text: chars[s..i].iter().collect(),
                        bbox: BBox::new(
                            run.x + s as f32 * char_width,
                            run_box.top,
                            run.x + i as f32 * char_width,
                            run_box.bottom,
                        ),
                    });
                    start = None;
                }
                _ => {}
            }
        }
    }

    words
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_run(text: &str, x: f32, baseline: f32, size: f32) -> TextRun {
        TextRun {
            text: text.to_string(),
            x,
            baseline,
            width: text.chars().count() as f32 * size * 0.5,
            font_size: size,
            font_name: "Helvetica".to_string(),
        }
    }

    #[test]
    fn test_font_style_detection() {
        assert!(is_bold_font("Helvetica-Bold"));
        assert!(is_italic_font("Helvetica-Oblique"));
        assert!(!is_bold_font("Helvetica-Oblique"));
    }

    #[test]
    fn test_runs_on_same_baseline_form_one_line() {
        let analyzer = LayoutAnalyzer::default();
        let blocks = analyzer.analyze(vec![
            make_run("world", 100.0, 100.0, 10.0),
            make_run("Hello", 72.0, 100.5, 10.0),
        ]);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text(), "Hello world");
    }

    #[test]
    fn test_block_lines_join_with_newline() {
        let analyzer = LayoutAnalyzer::default();
        let blocks = analyzer.analyze(vec![
            make_run("first line", 72.0, 100.0, 10.0),
            make_run("second line", 72.0, 112.0, 10.0),
            make_run("third line", 72.0, 124.0, 10.0),
        ]);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text(), "first line\nsecond line\nthird line");
        assert_eq!(blocks[0].font_size(), 10.0);
    }

    #[test]
    fn test_large_gap_starts_new_block() {
        let analyzer = LayoutAnalyzer::default();
        let blocks = analyzer.analyze(vec![
            make_run("a", 72.0, 100.0, 10.0),
            make_run("b", 72.0, 112.0, 10.0),
            make_run("c", 72.0, 124.0, 10.0),
            make_run("d", 72.0, 200.0, 10.0),
        ]);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].text(), "d");
    }

    #[test]
    fn test_wide_gap_breaks_on_sparse_page() {
        // Average spacing is 120, so the relative rule alone would merge the first two lines
        let analyzer = LayoutAnalyzer::default();
        let blocks = analyzer.analyze(vec![
            make_run("Running header", 72.0, 22.0, 10.0),
            make_run("Body text line", 72.0, 192.0, 10.0),
            make_run("Name", 72.0, 352.0, 10.0),
            make_run("CMD0", 72.0, 382.0, 10.0),
        ]);
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0].text(), "Running header");
    }

    #[test]
    fn test_font_change_and_indent_break_blocks() {
        let analyzer = LayoutAnalyzer::default();
        let blocks = analyzer.analyze(vec![
            make_run("6.1 Heading", 72.0, 100.0, 14.0),
            make_run("body", 72.0, 114.0, 10.0),
            make_run("indented", 120.0, 128.0, 10.0),
        ]);
        assert_eq!(blocks.len(), 3);
    }

    #[test]
    fn test_split_words() {
        let run = make_run("CMD0 bc", 10.0, 50.0, 10.0);
        let words = split_words(&[run]);
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text, "CMD0");
        assert_eq!(words[1].text, "bc");
        assert!((words[0].bbox.x0 - 10.0).abs() < 1e-4);
        assert!((words[1].bbox.x0 - 35.0).abs() < 1e-4);
    }
}
