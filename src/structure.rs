//! Section hierarchy from the table of contents.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;

use crate::model::{DocumentStructure, SectionId, SectionNode, TocEntry};

lazy_static! {
    static ref SECTION_NUMBER: Regex = Regex::new(r"^(\d+(?:\.\d+)*)\s*(.*)").unwrap();
    static ref PRODUCT_VARIANT: Regex = Regex::new(r"e[\s]*[•∙*.‐\-]+[\s]*mmc").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Whole titles (normalized) of unnumbered sections that precede the body.
const FRONT_MATTER_TITLES: &[&str] = &[
    "cover",
    "contents",
    "table of contents",
    "figures",
    "list of figures",
    "tables",
    "list of tables",
    "foreword",
    "introduction",
    "scope",
    "normative references",
    "terms",
    "definitions",
    "terms and definitions",
    "symbols",
    "abbreviations",
    "symbols and abbreviations",
    "abbreviations and acronyms",
    "bibliography",
];

/// Split a TOC title into its dotted number and the remaining title.
///
/// `"6.10.4 Detailed command description"` yields
/// `("6.10.4", "Detailed command description")`; unnumbered titles yield an
/// empty number.
pub fn split_section_number(title: &str) -> (String, String) {
    let title = title.trim();
    match SECTION_NUMBER.captures(title) {
        Some(caps) => (caps[1].to_string(), caps[2].trim().to_string()),
        None => (String::new(), title.to_string()),
    }
}

/// Cumulative path of a dotted number: `"6.10.4"` → `["6", "6.10", "6.10.4"]`.
pub fn section_path(number: &str) -> Vec<String> {
    if number.is_empty() {
        return Vec::new();
    }
    let parts: Vec<&str> = number.split('.').collect();
    (1..=parts.len()).map(|n| parts[..n].join(".")).collect()
}

/// Normalize a section label or text block for label lookups.
///
/// Lowercases, unifies glyph variants of the product name (`e•MMC`, `e-MMC`,
/// `e MMC`...), collapses whitespace and trims surrounding dots and spaces.
pub fn normalize_label(label: &str) -> String {
    let lowered = label.trim().to_lowercase();
    let unified = PRODUCT_VARIANT.replace_all(&lowered, "emmc");
    let collapsed = WHITESPACE.replace_all(&unified, " ");
    collapsed.trim_matches(|c| c == '.' || c == ' ').to_string()
}

fn is_front_matter_title(title: &str) -> bool {
    FRONT_MATTER_TITLES.contains(&normalize_label(title).as_str())
}

/// Builds a [`DocumentStructure`] from a flattened table of contents.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructureExtractor;

impl StructureExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, toc: &[TocEntry], total_pages: u32) -> DocumentStructure {
        let mut sections: Vec<SectionNode> = toc
            .iter()
            .map(|entry| {
                let (number, title) = split_section_number(&entry.title);
                SectionNode {
                    level: entry.level.max(1),
                    title,
                    page_start: entry.page.max(1),
                    page_end: entry.page.max(1),
                    path: section_path(&number),
                    number,
                    is_front_matter: false,
                }
            })
            .collect();

        compute_page_ends(&mut sections, total_pages);

        let body_start_page = body_start(&sections);
        for node in &mut sections {
            node.is_front_matter = node.page_start < body_start_page;
        }

        let page_to_section = page_map(&sections, total_pages);

        let mut label_to_section = IndexMap::new();
        for (id, node) in sections.iter().enumerate() {
            let label = normalize_label(&node.label());
            if !label.is_empty() {
                label_to_section.entry(label).or_insert(id);
            }
        }

        log::info!(
            "Structure: {} sections, body starts at page {}",
            sections.len(),
            body_start_page
        );

        DocumentStructure {
            sections,
            page_to_section,
            label_to_section,
            body_start_page,
            total_pages,
        }
    }
}

/// End each section one page before the next same-or-shallower section starts.
fn compute_page_ends(sections: &mut [SectionNode], total_pages: u32) {
    for i in 0..sections.len() {
        let level = sections[i].level;
        let start = sections[i].page_start;
        let end = sections[i + 1..]
            .iter()
            .find(|next| next.level <= level)
            .map(|next| next.page_start.saturating_sub(1))
            .unwrap_or(total_pages);
        sections[i].page_end = end.max(start);
    }
}

fn body_start(sections: &[SectionNode]) -> u32 {
    let top_level = || sections.iter().filter(|s| s.level == 1);

    top_level()
        .find(|s| !s.number.is_empty())
        .or_else(|| top_level().find(|s| !is_front_matter_title(&s.title)))
        .map(|s| s.page_start)
        .unwrap_or(1)
}

/// Deepest covering section per page; among equals the latest starter wins.
fn page_map(sections: &[SectionNode], total_pages: u32) -> BTreeMap<u32, SectionId> {
    let mut map: BTreeMap<u32, SectionId> = BTreeMap::new();

    for (id, node) in sections.iter().enumerate() {
        let last = node.page_end.min(total_pages);
        for page in node.page_start..=last {
            let replace = match map.get(&page).map(|&cur| &sections[cur]) {
                None => true,
                Some(cur) => {
                    node.level > cur.level
                        || (node.level == cur.level && node.page_start >= cur.page_start)
                }
            };
            if replace {
                map.insert(page, id);
            }
        }
    }

    map
}

/// Find the section a text block opens, if any.
///
/// `normalized` must already be passed through [`normalize_label`]. An exact
/// label match wins; otherwise the longest label the text starts with,
/// followed by whitespace, is taken (ties resolved in TOC order).
pub fn match_section_label(structure: &DocumentStructure, normalized: &str) -> Option<SectionId> {
    if let Some(&id) = structure.label_to_section.get(normalized) {
        return Some(id);
    }

    let mut best: Option<(usize, SectionId)> = None;
    for (label, &id) in &structure.label_to_section {
        let Some(rest) = normalized.strip_prefix(label.as_str()) else {
            continue;
        };
        if !rest.starts_with(char::is_whitespace) {
            continue;
        }
        if best.map(|(len, _)| label.len() > len).unwrap_or(true) {
            best = Some((label.len(), id));
        }
    }
    best.map(|(_, id)| id)
}
