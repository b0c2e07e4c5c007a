//! End-to-end ingestion of a small generated PDF.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

use specchunk::{ingest_bytes, read_toc, ContentType, IngestOptions, TocEntry};

const BODY: &str = "The device shall respond to every command within 64 clock cycles.";

fn text_op(ops: &mut Vec<Operation>, size: i64, x: i64, y: i64, text: &[u8]) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec!["F1".into(), size.into()]));
    ops.push(Operation::new("Td", vec![x.into(), y.into()]));
    ops.push(Operation::new("Tj", vec![Object::string_literal(text.to_vec())]));
    ops.push(Operation::new("ET", vec![]));
}

fn sample_pdf() -> Vec<u8> {
    build_pdf(BODY.as_bytes())
}

/// One Letter page under the outline entry "1 General": a running header,
/// a body line and a 2x2 ruled table. Strings are WinAnsi-encoded.
fn build_pdf(body: &[u8]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut ops = Vec::new();
    text_op(&mut ops, 10, 72, 770, b"JESD84-B51 Running header");
    text_op(&mut ops, 10, 72, 600, body);
    for (x1, y1, x2, y2) in [
        (100, 460, 300, 460),
        (100, 430, 300, 430),
        (100, 400, 300, 400),
        (100, 400, 100, 460),
        (200, 400, 200, 460),
        (300, 400, 300, 460),
    ] {
        ops.push(Operation::new("m", vec![x1.into(), y1.into()]));
        ops.push(Operation::new("l", vec![x2.into(), y2.into()]));
        ops.push(Operation::new("S", vec![]));
    }
    for (x, y, text) in [
        (110, 440, "Name"),
        (210, 440, "Value"),
        (110, 410, "CMD0"),
        (210, 410, "0x0"),
    ] {
        text_op(&mut ops, 8, x, y, text.as_bytes());
    }

    let content = Content { operations: ops };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content_id,
        "Resources" => resources_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let outlines_id = doc.new_object_id();
    let entry_id = doc.new_object_id();
    doc.objects.insert(
        entry_id,
        Object::Dictionary(dictionary! {
            "Title" => Object::String(b"1 General".to_vec(), StringFormat::Literal),
            "Parent" => outlines_id,
            "Dest" => vec![Object::Reference(page_id), "Fit".into()],
        }),
    );
    doc.objects.insert(
        outlines_id,
        Object::Dictionary(dictionary! {
            "Type" => "Outlines",
            "First" => entry_id,
            "Last" => entry_id,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
        "Outlines" => outlines_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

#[test]
fn test_ingest_generated_pdf() {
    let result = ingest_bytes("JESD84-B51.pdf", &sample_pdf(), &IngestOptions::default()).unwrap();
    assert_eq!(result.total_pages, 1);
    assert_eq!(result.version, "5.1");
    assert_eq!(result.structure.sections.len(), 1);

    let chunks = result.chunks();
    let text = chunks
        .iter()
        .find(|c| c.content_type == ContentType::Text)
        .expect("text chunk");
    assert!(text.raw_text.contains(BODY));
    assert_eq!(text.section_title, "General");
    assert!(text.text.starts_with("[5.1 | 1 General | Page 1]\n"));

    let tables: Vec<_> = chunks
        .iter()
        .filter(|c| c.content_type == ContentType::Table)
        .collect();
    assert_eq!(tables.len(), 2);
    let full = tables.iter().find(|c| !c.is_row_chunk).expect("full table");
    let row = tables.iter().find(|c| c.is_row_chunk).expect("row group");
    assert_eq!(row.parent_chunk_id.as_deref(), Some(full.chunk_id.as_str()));
    assert!(full.raw_text.contains("| CMD0 | 0x0 |"));

    // Cell text is owned by the table, not repeated as running text
    assert!(!text.raw_text.contains("CMD0"));
    assert!(chunks.iter().all(|c| !c.raw_text.contains("Running header")));
}

#[test]
fn test_product_name_bullet_unified() {
    // 0x95 is the bullet in WinAnsiEncoding
    let body = b"The e\x95MMC device shall respond to every command within 64 clock cycles.";
    let result = ingest_bytes("JESD84-B51.pdf", &build_pdf(body), &IngestOptions::default()).unwrap();

    let text = result
        .chunks()
        .iter()
        .find(|c| c.content_type == ContentType::Text)
        .expect("text chunk");
    assert!(text.raw_text.starts_with("The eMMC device shall respond"));
    assert!(!text.raw_text.contains('*'));
}

#[test]
fn test_read_toc_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("JESD84-B51.pdf");
    std::fs::write(&path, sample_pdf()).unwrap();

    assert_eq!(read_toc(&path).unwrap(), vec![TocEntry::new(1, "1 General", 1)]);
}

#[test]
fn test_garbage_bytes_rejected() {
    let result = ingest_bytes("broken.pdf", b"not a pdf at all", &IngestOptions::default());
    assert!(result.is_err());
}
