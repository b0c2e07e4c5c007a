//! JSONL output tests.

use std::fs;

use specchunk::{
    output_path, write_jsonl, BBox, Chunk, IngestionPipeline, MemorySource, PageModel, TextSpan,
    TocEntry,
};
use tempfile::tempdir;

fn sample_chunks() -> Vec<Chunk> {
    let mut page = PageModel::letter(2);
    page.text_spans.push(TextSpan::new(
        "The host shall wait until the device leaves the busy state before issuing CMD1.",
        BBox::new(72.0, 100.0, 540.0, 112.0),
        0,
    ));
    let source = MemorySource::new("JESD84-B51.pdf", "5.1")
        .with_toc(vec![
            TocEntry::new(1, "Foreword", 1),
            TocEntry::new(1, "1 General", 2),
        ])
        .with_page(page);
    IngestionPipeline::default().run(&source).unwrap().into_chunks()
}

#[test]
fn test_written_records_read_back_equal() {
    let dir = tempdir().unwrap();
    let chunks = sample_chunks();
    assert!(!chunks.is_empty());

    let path = output_path(dir.path(), "JESD84-B51.pdf");
    let written = write_jsonl(&path, &chunks).unwrap();
    assert_eq!(written, chunks.len());

    let content = fs::read_to_string(&path).unwrap();
    let back: Vec<Chunk> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(back, chunks);
    assert!(content.ends_with('\n'));
}

#[test]
fn test_no_temporary_file_left_behind() {
    let dir = tempdir().unwrap();
    let path = output_path(dir.path().join("nested/out"), "JESD84-B51.pdf");
    write_jsonl(&path, &sample_chunks()).unwrap();

    let names: Vec<String> = fs::read_dir(path.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["JESD84-B51_chunks.jsonl"]);
}

#[test]
fn test_empty_chunk_list_writes_empty_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty_chunks.jsonl");
    let written = write_jsonl(&path, std::iter::empty()).unwrap();
    assert_eq!(written, 0);
    assert_eq!(fs::read_to_string(&path).unwrap(), "");
}

#[test]
fn test_rewrite_replaces_previous_output() {
    let dir = tempdir().unwrap();
    let path = output_path(dir.path(), "JESD84-B51.pdf");
    let chunks = sample_chunks();
    write_jsonl(&path, &chunks).unwrap();
    write_jsonl(&path, chunks.iter().take(1)).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 1);
}
