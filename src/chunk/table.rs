//! Table chunking: header reconstruction, notes, row groups.
//!
//! Raw grids come out of extraction with multi-line header cells split over
//! several rows, notes folded into the last rows and vertically merged key
//! cells left empty. [`preprocess_table`] undoes all three before the table is
//! serialized to Markdown.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;

use crate::model::{is_filled, Chunk, ContentType, SectionNode};

use super::{ChunkContext, ChunkIds};

lazy_static! {
    static ref TABLE_CAPTION: Regex = Regex::new(r"(?i)Table\s+\d+[\s—\-]+[^\n]{5,80}").unwrap();
    static ref NOTE_ROW: Regex = Regex::new(r"(?i)^NOTE\b").unwrap();
    static ref NOTE_BREAK: Regex = Regex::new(r"(?i) (NOTE \d)").unwrap();
}

/// Header keywords of register-map tables (bit, index, byte or offset keyed).
const REGISTER_KEY_HEADERS: &[&str] = &["bit", "index", "byte", "offset"];

/// Collapse whitespace in a cell; absent cells become empty.
fn cell_text(cell: Option<&str>) -> String {
    cell.map(|c| c.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

/// A table after header, note and key reconstruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTable {
    /// One merged header row
    pub header: Vec<String>,
    /// Data rows, padded to the header width, keys forward-filled
    pub body: Vec<Vec<String>>,
    /// Notes peeled off the bottom of the table, one per line
    pub notes: String,
    /// Number of raw rows that formed the header
    pub header_rows: usize,
}

/// Index of the first complete data row.
///
/// A data row has a non-empty first cell and at least half of its cells
/// filled. The first row always belongs to the header zone; when no data row
/// exists only the first row is header.
fn find_data_start(rows: &[Vec<Option<String>>], columns: usize) -> usize {
    let min_filled = ((columns + 1) / 2).max(1);
    rows.iter()
        .enumerate()
        .skip(1)
        .find(|(_, row)| {
            let key = !cell_text(row.first().and_then(|c| c.as_deref())).is_empty();
            let filled = row.iter().filter(|c| is_filled(c.as_deref())).count();
            key && filled >= min_filled
        })
        .map(|(i, _)| i)
        .unwrap_or(1)
}

/// Space-join every non-empty header-zone value per column.
fn merge_header_zone(header_rows: &[Vec<Option<String>>], columns: usize) -> Vec<String> {
    let mut buckets: Vec<Vec<String>> = vec![Vec::new(); columns];
    for row in header_rows {
        for (col, cell) in row.iter().take(columns).enumerate() {
            let text = cell_text(cell.as_deref());
            if !text.is_empty() {
                buckets[col].push(text);
            }
        }
    }
    buckets.into_iter().map(|parts| parts.join(" ")).collect()
}

/// Peel trailing note rows (first cell starts with NOTE, rest empty).
fn extract_notes(mut body: Vec<Vec<String>>) -> (Vec<Vec<String>>, String) {
    let mut notes = Vec::new();
    while let Some(row) = body.last() {
        let first = row.first().map(String::as_str).unwrap_or("");
        let rest_empty = row.iter().skip(1).all(|c| c.is_empty());
        if first.is_empty() || !rest_empty || !NOTE_ROW.is_match(first) {
            break;
        }
        notes.push(NOTE_BREAK.replace_all(first, "\n$1").into_owned());
        body.pop();
    }
    notes.reverse();
    (body, notes.join("\n"))
}

/// Repeat the last non-empty first cell into rows that leave it empty.
fn forward_fill_key(body: &mut [Vec<String>]) {
    let mut last_key = String::new();
    for row in body.iter_mut() {
        let Some(first) = row.first_mut() else {
            continue;
        };
        if !first.is_empty() {
            last_key = first.clone();
        } else if !last_key.is_empty() {
            *first = last_key.clone();
        }
    }
}

/// Reconstruct header, body and notes from a raw grid.
///
/// Returns `None` for an empty grid.
pub fn preprocess_table(rows: &[Vec<Option<String>>]) -> Option<PreparedTable> {
    let columns = rows.iter().map(|r| r.len()).max()?;
    if columns == 0 {
        return None;
    }

    let data_start = find_data_start(rows, columns).min(rows.len());
    let header = merge_header_zone(&rows[..data_start], columns);

    let cleaned: Vec<Vec<String>> = rows[data_start..]
        .iter()
        .map(|row| {
            let mut cells: Vec<String> = row.iter().map(|c| cell_text(c.as_deref())).collect();
            cells.resize(columns, String::new());
            cells
        })
        .collect();

    let (mut body, notes) = extract_notes(cleaned);
    forward_fill_key(&mut body);

    Some(PreparedTable {
        header,
        body,
        notes,
        header_rows: data_start,
    })
}

fn markdown_row(cells: &[String], columns: usize) -> String {
    let mut padded: Vec<&str> = cells.iter().take(columns).map(String::as_str).collect();
    padded.resize(columns, "");
    format!("| {} |\n", padded.join(" | "))
}

impl PreparedTable {
    fn columns(&self) -> usize {
        self.header.len()
    }

    /// Header row plus separator row, each newline-terminated.
    fn header_markdown(&self) -> String {
        let separator: Vec<String> = self
            .header
            .iter()
            .map(|h| "-".repeat(h.chars().count().max(3)))
            .collect();
        format!(
            "{}{}",
            markdown_row(&self.header, self.columns()),
            markdown_row(&separator, self.columns())
        )
    }

    /// Header, separator and the given rows, without trailing newline.
    fn rows_markdown<'r>(&self, rows: impl IntoIterator<Item = &'r Vec<String>>) -> String {
        let mut md = self.header_markdown();
        for row in rows {
            md.push_str(&markdown_row(row, self.columns()));
        }
        md.trim_end_matches('\n').to_string()
    }

    fn with_notes(&self, mut md: String) -> String {
        if !self.notes.is_empty() {
            md.push_str("\n\n**Notes:**\n");
            md.push_str(&self.notes);
        }
        md
    }

    /// The whole table as Markdown, notes in a trailing block.
    pub fn to_markdown(&self) -> String {
        self.with_notes(self.rows_markdown(&self.body))
    }
}

/// Convert a raw grid to Markdown with a merged header and notes block.
pub fn rows_to_markdown(rows: &[Vec<Option<String>>]) -> String {
    preprocess_table(rows)
        .map(|t| t.to_markdown())
        .unwrap_or_default()
}

/// First `Table N - title` caption in the page text.
pub fn find_table_caption(page_text: &str) -> Option<String> {
    TABLE_CAPTION
        .find(page_text)
        .map(|m| m.as_str().trim().to_string())
}

/// Turns raw table grids into full-table and row-group chunks.
#[derive(Debug, Clone)]
pub struct TableChunker {
    max_chars: usize,
}

impl Default for TableChunker {
    fn default() -> Self {
        Self::new(6000)
    }
}

impl TableChunker {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    fn prefix(ctx: &ChunkContext<'_>, section: Option<&SectionNode>, page: u32, caption: Option<&str>) -> String {
        let mut prefix = ctx.header(section, page);
        prefix.push('\n');
        if let Some(caption) = caption {
            prefix.push_str(caption);
            prefix.push('\n');
        }
        prefix.push('\n');
        prefix
    }

    #[allow(clippy::too_many_arguments)]
    fn table_chunk(
        ctx: &ChunkContext<'_>,
        ids: &mut ChunkIds,
        section: Option<&SectionNode>,
        page: u32,
        chunk_index: usize,
        prefix: &str,
        markdown: String,
        caption: Option<&str>,
    ) -> Chunk {
        let mut chunk = ctx.chunk(
            ids,
            section,
            ContentType::Table,
            page,
            page,
            chunk_index,
            prefix,
            markdown.clone(),
        );
        chunk.table_markdown = Some(markdown);
        chunk.figure_caption = caption.map(str::to_string);
        chunk
    }

    /// Full-table chunks, split with a repeated header when too large.
    ///
    /// `page_text` is the page's text, searched for the table caption.
    pub fn chunk(
        &self,
        ctx: &ChunkContext<'_>,
        ids: &mut ChunkIds,
        rows: &[Vec<Option<String>>],
        page_text: &str,
        section: Option<&SectionNode>,
        page: u32,
    ) -> Vec<Chunk> {
        let Some(table) = preprocess_table(rows) else {
            return Vec::new();
        };
        let caption = find_table_caption(page_text);
        let prefix = Self::prefix(ctx, section, page, caption.as_deref());
        let markdown = table.to_markdown();
        if markdown.trim().is_empty() {
            return Vec::new();
        }

        if prefix.chars().count() + markdown.chars().count() <= self.max_chars {
            return vec![Self::table_chunk(
                ctx,
                ids,
                section,
                page,
                0,
                &prefix,
                markdown,
                caption.as_deref(),
            )];
        }

        self.split_large(ctx, ids, &table, &prefix, caption.as_deref(), section, page)
    }

    #[allow(clippy::too_many_arguments)]
    fn split_large(
        &self,
        ctx: &ChunkContext<'_>,
        ids: &mut ChunkIds,
        table: &PreparedTable,
        prefix: &str,
        caption: Option<&str>,
        section: Option<&SectionNode>,
        page: u32,
    ) -> Vec<Chunk> {
        let header_len = table.header_markdown().chars().count();
        let prefix_len = prefix.chars().count();
        let mut chunks = Vec::new();
        let mut current: Vec<&Vec<String>> = Vec::new();
        let mut body_len = 0usize;

        for row in &table.body {
            let row_len = markdown_row(row, table.columns()).chars().count();
            current.push(row);
            body_len += row_len;
            if prefix_len + header_len + body_len > self.max_chars && current.len() > 1 {
                let carried = current.pop();
                let md = table.rows_markdown(current.iter().copied());
                chunks.push(Self::table_chunk(
                    ctx,
                    ids,
                    section,
                    page,
                    chunks.len(),
                    prefix,
                    md,
                    caption,
                ));
                current = carried.into_iter().collect();
                body_len = row_len;
            }
        }

        if !current.is_empty() {
            let md = table.with_notes(table.rows_markdown(current.iter().copied()));
            chunks.push(Self::table_chunk(
                ctx,
                ids,
                section,
                page,
                chunks.len(),
                prefix,
                md,
                caption,
            ));
        }

        log::debug!("Table: split into {} chunks", chunks.len());
        chunks
    }

    /// One chunk per distinct first-column value, each pointing at `parent_id`.
    ///
    /// Rows whose key is empty throughout form a single group.
    #[allow(clippy::too_many_arguments)]
    pub fn chunk_row_groups(
        &self,
        ctx: &ChunkContext<'_>,
        ids: &mut ChunkIds,
        rows: &[Vec<Option<String>>],
        page_text: &str,
        section: Option<&SectionNode>,
        page: u32,
        parent_id: &str,
    ) -> Vec<Chunk> {
        let Some(table) = preprocess_table(rows) else {
            return Vec::new();
        };
        if table.body.is_empty() {
            return Vec::new();
        }

        let caption = find_table_caption(page_text);
        let prefix = Self::prefix(ctx, section, page, caption.as_deref());

        let first_header = table.header[0].to_lowercase();
        let register_context = if REGISTER_KEY_HEADERS.iter().any(|kw| first_header.contains(kw)) {
            let name = caption
                .clone()
                .or_else(|| section.map(|s| s.title.clone()))
                .unwrap_or_else(|| "Register".to_string());
            format!("**Register Context: {}**\n\n", name)
        } else {
            String::new()
        };

        let mut groups: IndexMap<&str, Vec<&Vec<String>>> = IndexMap::new();
        for row in &table.body {
            let key = row.first().map(String::as_str).unwrap_or("");
            groups.entry(key).or_default().push(row);
        }

        let last = groups.len() - 1;
        groups
            .into_values()
            .enumerate()
            .map(|(index, group)| {
                let mut md = format!("{}{}", register_context, table.rows_markdown(group));
                if index == last {
                    md = table.with_notes(md);
                }
                let mut chunk = Self::table_chunk(
                    ctx,
                    ids,
                    section,
                    page,
                    index,
                    &prefix,
                    md,
                    caption.as_deref(),
                );
                chunk.parent_chunk_id = Some(parent_id.to_string());
                chunk.is_row_chunk = true;
                chunk
            })
            .collect()
    }
}
