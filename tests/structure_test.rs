//! Integration tests for section structuring.

use specchunk::structure::{match_section_label, normalize_label, StructureExtractor};
use specchunk::TocEntry;

fn toc(entries: &[(u8, &str, u32)]) -> Vec<TocEntry> {
    entries
        .iter()
        .map(|&(level, title, page)| TocEntry::new(level, title, page))
        .collect()
}

/// A realistic slice of a specification outline.
fn spec_toc() -> Vec<TocEntry> {
    toc(&[
        (1, "Contents", 2),
        (1, "Foreword", 5),
        (1, "1 Scope", 8),
        (1, "2 Normative references", 8),
        (1, "3 Terms and definitions", 8),
        (2, "3.1 Terms", 9),
        (2, "3.2 Abbreviations", 11),
        (1, "4 General", 14),
        (1, "5 e\u{2022}MMC system overview", 15),
        (2, "5.1 e\u{2022}MMC device", 16),
        (3, "5.1.1 Bus interface", 16),
        (3, "5.1.2 Memory array", 19),
        (2, "5.2 Host interface", 22),
        (1, "6 Device characteristics", 30),
    ])
}

#[test]
fn test_tie_break_latest_starter_wins() {
    let structure = StructureExtractor::new().extract(
        &toc(&[
            (1, "1 Scope", 22),
            (1, "2 Normative references", 22),
            (1, "3 Terms and definitions", 22),
            (1, "4 General", 23),
        ]),
        30,
    );
    let section = structure.section_for_page(22).unwrap();
    assert_eq!(section.label(), "3 Terms and definitions");
    assert_eq!(structure.section_for_page(23).unwrap().title, "General");
}

#[test]
fn test_every_section_has_a_valid_range() {
    let structure = StructureExtractor::new().extract(&spec_toc(), 40);
    for section in &structure.sections {
        assert!(
            section.page_end >= section.page_start,
            "{} ends before it starts",
            section.label()
        );
    }
    // 5.1.1 ends where 5.1.2 begins; 5.2 runs until chapter 6
    let bus = &structure.sections[10];
    assert_eq!((bus.page_start, bus.page_end), (16, 18));
    let host = &structure.sections[12];
    assert_eq!((host.page_start, host.page_end), (22, 29));
    let last = structure.sections.last().unwrap();
    assert_eq!(last.page_end, 40);
}

#[test]
fn test_every_page_after_the_first_entry_resolves() {
    let structure = StructureExtractor::new().extract(&spec_toc(), 40);
    assert!(structure.section_for_page(1).is_none());
    for page in 2..=40 {
        assert!(
            structure.section_for_page(page).is_some(),
            "page {} has no section",
            page
        );
    }
}

#[test]
fn test_deepest_section_wins() {
    let structure = StructureExtractor::new().extract(&spec_toc(), 40);
    assert_eq!(structure.section_for_page(17).unwrap().number, "5.1.1");
    assert_eq!(structure.section_for_page(20).unwrap().number, "5.1.2");
    assert_eq!(structure.section_for_page(15).unwrap().number, "5");
}

#[test]
fn test_front_matter_boundary() {
    let structure = StructureExtractor::new().extract(&spec_toc(), 40);
    assert_eq!(structure.body_start_page, 8);
    assert!(structure.sections[0].is_front_matter);
    assert!(structure.sections[1].is_front_matter);
    assert!(!structure.sections[2].is_front_matter);
    assert_eq!(structure.total_pages, 40);
}

#[test]
fn test_section_paths() {
    let structure = StructureExtractor::new().extract(&spec_toc(), 40);
    let memory = &structure.sections[11];
    assert_eq!(memory.path, vec!["5", "5.1", "5.1.2"]);
    assert_eq!(memory.level, 3);
    assert_eq!(memory.title, "Memory array");
    assert!(structure.sections[1].path.is_empty());
}

#[test]
fn test_product_name_variants_match() {
    let structure = StructureExtractor::new().extract(&spec_toc(), 40);
    let expected = structure
        .sections
        .iter()
        .position(|s| s.number == "5.1")
        .unwrap();

    for heading in ["5.1 e\u{2022}MMC device", "5.1 e-MMC  device", "5.1 eMMC device."] {
        let normalized = normalize_label(heading);
        assert_eq!(
            match_section_label(&structure, &normalized),
            Some(expected),
            "{:?}",
            heading
        );
    }
}

#[test]
fn test_fused_heading_prefers_longest_label() {
    let structure = StructureExtractor::new().extract(
        &toc(&[(1, "5 Bus", 3), (2, "5 Bus timing", 4), (1, "6 Other", 6)]),
        8,
    );
    let normalized = normalize_label("5 Bus timing The timing diagrams below apply.");
    assert_eq!(match_section_label(&structure, &normalized), Some(1));

    // A label fused without a space is not a heading
    assert_eq!(match_section_label(&structure, "5 bustling traffic"), None);
}

#[test]
fn test_empty_toc() {
    let structure = StructureExtractor::new().extract(&[], 12);
    assert!(structure.sections.is_empty());
    assert_eq!(structure.body_start_page, 1);
    assert!(structure.section_for_page(3).is_none());
}
