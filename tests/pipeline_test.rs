//! Integration tests for the ingestion pipeline, driven by in-memory pages.

use specchunk::error::{Error, Result};
use specchunk::{
    BBox, Chunk, ContentType, DrawingCluster, IngestOptions, IngestionPipeline, MemorySource,
    PageModel, PageSource, RawTable, TextSpan, TocEntry,
};

fn span(text: &str, top: f32) -> TextSpan {
    TextSpan::new(text, BBox::new(72.0, top, 540.0, top + 12.0), 0)
}

fn page(num: u32, texts: &[(&str, f32)]) -> PageModel {
    let mut page = PageModel::letter(num);
    for (i, (text, top)) in texts.iter().enumerate() {
        let mut s = span(text, *top);
        s.block_no = i;
        page.text_spans.push(s);
    }
    page
}

fn toc(entries: &[(u8, &str, u32)]) -> Vec<TocEntry> {
    entries
        .iter()
        .map(|&(level, title, p)| TocEntry::new(level, title, p))
        .collect()
}

fn run(source: &MemorySource) -> Vec<Chunk> {
    IngestionPipeline::default().run(source).unwrap().into_chunks()
}

fn of_type(chunks: &[Chunk], content_type: ContentType) -> Vec<&Chunk> {
    chunks.iter().filter(|c| c.content_type == content_type).collect()
}

fn command_table(top: f32) -> RawTable {
    let rows = vec![
        vec![Some("CMD"), Some("Type"), Some("Description")],
        vec![Some("CMD0"), Some("bc"), Some("Resets the device to idle state")],
        vec![Some("CMD1"), Some("bcr"), Some("Sends operating conditions register")],
    ];
    RawTable::new(
        BBox::new(72.0, top, 540.0, top + 200.0),
        rows.into_iter()
            .map(|r| r.into_iter().map(|c| c.map(str::to_string)).collect())
            .collect(),
    )
}

/// Pages 4-5 belong to "3 General", pages 6-7 to "3.1 Bus protocol".
fn general_toc() -> Vec<TocEntry> {
    toc(&[
        (1, "Foreword", 1),
        (1, "1 Scope", 2),
        (1, "2 Normative references", 3),
        (1, "3 General", 4),
        (2, "3.1 Bus protocol", 6),
    ])
}

#[test]
fn test_list_continues_across_page_break() {
    let source = MemorySource::new("JESD84-B51.pdf", "5.1")
        .with_toc(general_toc())
        .with_page(page(
            4,
            &[
                ("The device supports the following modes:", 100.0),
                ("o Sub-item one", 700.0),
            ],
        ))
        .with_page(page(5, &[("o Sub-item two, which continues the list.", 80.0)]))
        .with_page(PageModel::letter(7));

    let chunks = run(&source);
    let general: Vec<&Chunk> = chunks
        .iter()
        .filter(|c| c.section_title == "General")
        .collect();

    assert_eq!(general.len(), 1);
    let chunk = general[0];
    assert_eq!(chunk.content_type, ContentType::Text);
    assert_eq!((chunk.page_start, chunk.page_end), (4, 5));
    assert!(chunk.raw_text.contains("o Sub-item one\no Sub-item two"));
    assert!(chunk.text.starts_with("[5.1 | 3 General | Page 4]\n"));
    assert_eq!(chunk.section_path, vec!["3"]);
}

#[test]
fn test_page_section_change_flushes_text() {
    let source = MemorySource::new("doc.pdf", "5.1")
        .with_toc(general_toc())
        .with_page(page(5, &[("Closing paragraph of the general section.", 100.0)]))
        .with_page(page(6, &[("Opening paragraph of the bus protocol section.", 100.0)]))
        .with_page(PageModel::letter(7));

    let chunks = run(&source);
    let texts = of_type(&chunks, ContentType::Text);
    assert_eq!(texts.len(), 2);
    assert_eq!(texts[0].section_title, "General");
    assert_eq!(texts[1].section_title, "Bus protocol");
    assert_eq!(texts[1].section_path, vec!["3", "3.1"]);
    assert_eq!(texts[1].heading_level, 2);
}

#[test]
fn test_headings_inside_a_page_switch_sections() {
    // All three sections open on page 2; the page map picks the last one.
    let source = MemorySource::new("doc.pdf", "5.1")
        .with_toc(toc(&[
            (1, "1 Scope", 2),
            (1, "2 Normative references", 2),
            (1, "3 Conventions", 2),
            (1, "4 General", 3),
        ]))
        .with_page(PageModel::letter(1))
        .with_page(page(
            2,
            &[
                ("1 Scope", 80.0),
                ("This standard specifies the device interface in detail.", 100.0),
                (
                    "2 Normative references The following documents are referenced in this text.",
                    140.0,
                ),
                ("3 Conventions", 180.0),
                ("Numbers in brackets denote bit positions throughout.", 200.0),
            ],
        ))
        .with_page(PageModel::letter(3));

    let chunks = run(&source);
    let texts = of_type(&chunks, ContentType::Text);
    let titles: Vec<&str> = texts.iter().map(|c| c.section_title.as_str()).collect();
    assert_eq!(titles, vec!["Scope", "Normative references", "Conventions"]);
    assert!(texts[0].raw_text.starts_with("1 Scope\nThis standard specifies"));
    assert!(texts[1].raw_text.starts_with("2 Normative references The following"));
    assert!(texts.iter().all(|c| !c.is_front_matter));
}

#[test]
fn test_table_interrupts_running_text() {
    let mut table_page = page(
        4,
        &[
            ("Paragraph before the table describes commands.", 100.0),
            // Duplicate of a cell, dropped by the classifier
            ("CMD0", 250.0),
            ("Paragraph after the table explains responses.", 450.0),
        ],
    );
    table_page.tables.push(command_table(200.0));
    let source = MemorySource::new("doc.pdf", "5.1")
        .with_toc(general_toc())
        .with_page(table_page);

    let chunks = run(&source);
    let kinds: Vec<(ContentType, bool)> = chunks
        .iter()
        .map(|c| (c.content_type, c.is_row_chunk))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (ContentType::Text, false),
            (ContentType::Table, false),
            (ContentType::Table, true),
            (ContentType::Table, true),
            (ContentType::Text, false),
        ]
    );
    assert!(chunks[0].raw_text.starts_with("Paragraph before"));
    assert!(chunks[4].raw_text.starts_with("Paragraph after"));
    assert!(!chunks.iter().any(|c| c.raw_text == "CMD0"));

    let parent = &chunks[1].chunk_id;
    assert_eq!(chunks[2].parent_chunk_id.as_ref(), Some(parent));
    assert_eq!(chunks[3].parent_chunk_id.as_ref(), Some(parent));
    assert_eq!(chunks[3].chunk_index, 1);
}

#[test]
fn test_searchable_view_and_stats() {
    let mut table_page = page(
        4,
        &[
            ("Paragraph before the table describes commands.", 100.0),
            ("Paragraph after the table explains responses.", 450.0),
        ],
    );
    table_page.tables.push(command_table(200.0));
    let source = MemorySource::new("doc.pdf", "5.1")
        .with_toc(general_toc())
        .with_page(page(1, &[("Copyright notice on the cover page of the standard.", 300.0)]))
        .with_page(table_page);

    let result = IngestionPipeline::default().run(&source).unwrap();
    let stats = result.stats();

    // Cover text, two paragraphs, full table, two row groups
    assert_eq!(stats.total, 6);
    assert_eq!(stats.front_matter, 1);
    assert_eq!(stats.searchable, 4);
    assert_eq!(stats.short_filtered, 0);
    assert_eq!(stats.count(ContentType::Text), 2);
    assert_eq!(stats.count(ContentType::Table), 2);

    let searchable = result.searchable_chunks();
    assert!(searchable.iter().all(|c| !c.is_front_matter));
    assert!(searchable
        .iter()
        .filter(|c| c.content_type == ContentType::Table)
        .all(|c| c.is_row_chunk));

    let cover = &result.chunks()[0];
    assert!(cover.is_front_matter);
    assert!(cover.text.starts_with("[5.1 | Foreword | Page 1]"));
}

#[test]
fn test_register_map_tables_stay_searchable() {
    let mut table_page = PageModel::letter(4);
    table_page.tables.push(command_table(200.0));
    let source = MemorySource::new("doc.pdf", "5.1")
        .with_toc(toc(&[(1, "1 Scope", 1), (1, "2 OCR register", 3), (1, "3 General", 5)]))
        .with_page(table_page)
        .with_page(PageModel::letter(5));

    let result = IngestionPipeline::default().run(&source).unwrap();
    let full_tables = result
        .searchable_chunks()
        .into_iter()
        .filter(|c| c.content_type == ContentType::Table && !c.is_row_chunk)
        .count();
    assert_eq!(full_tables, 1);
}

#[test]
fn test_rejected_figure_still_interrupts_text() {
    let mut figure_page = page(
        4,
        &[
            ("Text above the drawing that is long enough.", 100.0),
            ("Text below the drawing that is long enough.", 600.0),
        ],
    );
    figure_page
        .drawing_clusters
        .push(DrawingCluster::new(BBox::new(100.0, 300.0, 500.0, 500.0), 12));
    let source = MemorySource::new("doc.pdf", "5.1")
        .with_toc(general_toc())
        .with_page(figure_page);

    let chunks = run(&source);
    assert!(of_type(&chunks, ContentType::Figure).is_empty());
    assert_eq!(of_type(&chunks, ContentType::Text).len(), 2);
}

#[test]
fn test_register_text_gets_its_own_chunk() {
    let source = MemorySource::new("doc.pdf", "5.1")
        .with_toc(general_toc())
        .with_page(page(
            4,
            &[
                ("The following field controls the boot acknowledge.", 100.0),
                ("[7:4] Reserved. These bits are read only and return zero.", 120.0),
                ("Plain text resumes after the register field list.", 140.0),
            ],
        ));

    let chunks = run(&source);
    let kinds: Vec<ContentType> = chunks.iter().map(|c| c.content_type).collect();
    assert_eq!(
        kinds,
        vec![ContentType::Text, ContentType::Register, ContentType::Text]
    );
    assert_eq!(chunks[1].chunk_index, 0);
}

#[test]
fn test_definitions_from_glossary_and_inline() {
    let source = MemorySource::new("doc.pdf", "5.1")
        .with_toc(toc(&[
            (1, "1 Scope", 1),
            (1, "2 Terms and definitions", 2),
            (1, "3 General", 3),
        ]))
        .with_page(PageModel::letter(1))
        .with_page(page(
            2,
            &[
                ("ACMD: Application specific command follows", 100.0),
                ("CRC: Cyclic redundancy check value", 120.0),
            ],
        ))
        .with_page(page(
            3,
            &[
                ("The boot partition means a dedicated area read at power-up.", 100.0),
                ("Replay Protected Memory Block (abbreviated as RPMB) stores keys.", 120.0),
                ("CRC means something already defined in the glossary.", 140.0),
            ],
        ));

    let chunks = run(&source);
    let definitions = of_type(&chunks, ContentType::Definition);
    let terms: Vec<&str> = definitions
        .iter()
        .filter_map(|c| c.term.as_deref())
        .collect();
    assert_eq!(terms, vec!["ACMD", "CRC", "boot partition", "RPMB"]);

    assert_eq!(definitions[0].section_title, "Terms and definitions");
    assert_eq!((definitions[0].page_start, definitions[0].page_end), (2, 2));
    assert_eq!(definitions[0].raw_text, "ACMD: Application specific command follows");
    assert_eq!(definitions[2].section_title, "General");
    assert_eq!(definitions[2].page_start, 3);
    assert_eq!(definitions[3].raw_text, "RPMB: Replay Protected Memory Block");

    // Glossary lines are not running text
    assert!(of_type(&chunks, ContentType::Text)
        .iter()
        .all(|c| c.section_title != "Terms and definitions"));
}

#[test]
fn test_definitions_section_without_entries_kept_as_text() {
    let source = MemorySource::new("doc.pdf", "5.1")
        .with_toc(toc(&[
            (1, "1 Scope", 1),
            (1, "2 Definitions", 2),
            (1, "3 Bus", 3),
        ]))
        .with_page(PageModel::letter(1))
        .with_page(page(
            2,
            &[("This clause lists the conventions used for timing diagrams in the document.", 100.0)],
        ))
        .with_page(page(3, &[("The bus carries commands and responses between host and device.", 100.0)]));

    let chunks = run(&source);
    assert!(of_type(&chunks, ContentType::Definition).is_empty());

    let texts = of_type(&chunks, ContentType::Text);
    let held = texts
        .iter()
        .find(|c| c.section_title == "Definitions")
        .expect("definitions section text");
    assert_eq!((held.page_start, held.page_end), (2, 2));
    assert!(held.raw_text.contains("conventions used for timing diagrams"));
    assert!(held.text.starts_with("[5.1 | 2 Definitions | Page 2]\n"));
    assert!(texts.iter().any(|c| c.section_title == "Bus"));
}

#[test]
fn test_abbreviations_section_yields_definitions_only() {
    let source = MemorySource::new("doc.pdf", "5.1")
        .with_toc(toc(&[(1, "1 Abbreviations", 1), (1, "2 Bus", 2)]))
        .with_page(page(1, &[("CMD: Command sent by the host to the device", 100.0)]))
        .with_page(page(2, &[("The bus carries commands and responses between host and device.", 100.0)]));

    let chunks = run(&source);
    let definitions = of_type(&chunks, ContentType::Definition);
    assert_eq!(definitions.len(), 1);
    assert_eq!(definitions[0].term.as_deref(), Some("CMD"));
    assert_eq!(definitions[0].section_title, "Abbreviations");
    assert!(of_type(&chunks, ContentType::Text)
        .iter()
        .all(|c| c.section_title != "Abbreviations"));
}

#[test]
fn test_product_name_in_headers() {
    let source = MemorySource::new("doc.pdf", "5.1")
        .with_toc(general_toc())
        .with_page(page(4, &[("A paragraph that is long enough to keep.", 100.0)]));
    let pipeline = IngestionPipeline::new(IngestOptions::new().with_product("eMMC"));
    let chunks = pipeline.run(&source).unwrap().into_chunks();
    assert!(chunks[0].text.starts_with("[eMMC 5.1 | 3 General | Page 4]\n"));
}

#[test]
fn test_rerun_is_identical() {
    let mut table_page = page(
        4,
        &[
            ("Paragraph before the table describes commands.", 100.0),
            ("The host means the controller driving the bus lines.", 450.0),
        ],
    );
    table_page.tables.push(command_table(200.0));
    let source = MemorySource::new("doc.pdf", "5.1")
        .with_toc(general_toc())
        .with_page(table_page);

    let pipeline = IngestionPipeline::default();
    let first = pipeline.run(&source).unwrap().into_chunks();
    let second = pipeline.run(&source).unwrap().into_chunks();
    assert_eq!(first, second);

    let random = IngestionPipeline::new(IngestOptions::new().random_ids())
        .run(&source)
        .unwrap()
        .into_chunks();
    assert_eq!(random.len(), first.len());
    for (a, b) in first.iter().zip(&random) {
        assert_ne!(a.chunk_id, b.chunk_id);
        assert_eq!(a.text, b.text);
        assert_eq!(a.content_type, b.content_type);
    }
}

/// A source whose second page cannot be read.
struct BrokenSource;

impl PageSource for BrokenSource {
    fn source(&self) -> &str {
        "broken.pdf"
    }

    fn version(&self) -> &str {
        "unknown"
    }

    fn page_count(&self) -> u32 {
        2
    }

    fn toc(&self) -> Result<Vec<TocEntry>> {
        Ok(Vec::new())
    }

    fn extract(&self, page: u32) -> Result<PageModel> {
        if page == 2 {
            Err(Error::ContentStream("truncated stream".to_string()))
        } else {
            Ok(PageModel::letter(page))
        }
    }
}

#[test]
fn test_source_failure_aborts_document() {
    let result = IngestionPipeline::default().run(&BrokenSource);
    assert!(matches!(result, Err(Error::ContentStream(_))));
}
