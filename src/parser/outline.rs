//! Document outline (bookmarks) as a flat table of contents.

use std::collections::{BTreeMap, HashSet};

use lopdf::{Dictionary, Object, ObjectId};

use crate::error::Result;
use crate::model::TocEntry;

use super::backend::{decode_text_simple, page_number_of, LopdfBackend, PageId, PdfBackend};

/// Name trees deeper than this are not searched.
const MAX_NAME_TREE_DEPTH: usize = 32;

/// Flatten the outline depth-first into `(level, title, page)` entries.
///
/// Entries whose destination cannot be resolved are skipped with a warning;
/// their children are still visited.
pub fn extract_outline(backend: &LopdfBackend) -> Result<Vec<TocEntry>> {
    let doc = backend.raw_doc();
    let mut entries = Vec::new();

    let catalog = match doc.catalog() {
        Ok(catalog) => catalog,
        Err(_) => return Ok(entries),
    };
    let root = match catalog
        .get(b"Outlines")
        .ok()
        .and_then(|o| resolve_dict(backend, o))
    {
        Some(root) => root,
        None => return Ok(entries),
    };

    let walker = OutlineWalker {
        backend,
        pages: backend.pages(),
        catalog,
    };
    let mut visited = HashSet::new();
    if let Ok(Object::Reference(first)) = root.get(b"First") {
        walker.walk(*first, 1, &mut visited, &mut entries);
    }

    log::debug!("Outline: {} entries", entries.len());
    Ok(entries)
}

struct OutlineWalker<'a> {
    backend: &'a LopdfBackend,
    pages: BTreeMap<u32, PageId>,
    catalog: &'a Dictionary,
}

impl OutlineWalker<'_> {
    /// Visit an item, its children, then its following siblings.
    fn walk(
        &self,
        first: ObjectId,
        level: u8,
        visited: &mut HashSet<ObjectId>,
        entries: &mut Vec<TocEntry>,
    ) {
        let mut next = Some(first);
        while let Some(item_ref) = next.take() {
            if !visited.insert(item_ref) {
                log::warn!("Outline cycle at object {:?}, stopping", item_ref);
                return;
            }
            let item = match self.backend.raw_doc().get_dictionary(item_ref) {
                Ok(item) => item,
                Err(_) => return,
            };

            let title = item
                .get(b"Title")
                .ok()
                .map(|t| self.backend.resolve(t))
                .and_then(string_value)
                .map(|t| t.trim().to_string())
                .unwrap_or_default();

            match self.destination_page(item) {
                Some(page) => entries.push(TocEntry::new(level, title, page)),
                None => log::warn!("Outline entry '{}' has no resolvable page", title),
            }

            if let Ok(Object::Reference(child)) = item.get(b"First") {
                self.walk(*child, level.saturating_add(1), visited, entries);
            }

            if let Ok(Object::Reference(sibling)) = item.get(b"Next") {
                next = Some(*sibling);
            }
        }
    }

    fn destination_page(&self, item: &Dictionary) -> Option<u32> {
        if let Ok(dest) = item.get(b"Dest") {
            return self.resolve_destination(dest, 0);
        }

        let action = item.get(b"A").ok().and_then(|a| resolve_dict(self.backend, a))?;
        let dest = action.get(b"D").ok()?;
        self.resolve_destination(dest, 0)
    }

    /// Explicit `[page /XYZ ...]` arrays, named destinations and `<< /D [...] >>` wrappers.
    fn resolve_destination(&self, dest: &Object, depth: usize) -> Option<u32> {
        if depth > 4 {
            return None;
        }
        match self.backend.resolve(dest) {
            Object::Array(arr) => match arr.first()? {
                Object::Reference(page_ref) => page_number_of(&self.pages, *page_ref),
                // Remote-style destinations carry a 0-based page index
                Object::Integer(index) => u32::try_from(*index).ok().map(|i| i + 1),
                _ => None,
            },
            Object::Dictionary(d) => self.resolve_destination(d.get(b"D").ok()?, depth + 1),
            Object::Name(name) | Object::String(name, _) => {
                let target = self.named_destination(name)?;
                self.resolve_destination(target, depth + 1)
            }
            _ => None,
        }
    }

    /// Look a name up in the catalog's `/Dests` dictionary or the `/Names` tree.
    fn named_destination(&self, name: &[u8]) -> Option<&Object> {
        if let Some(dests) = self
            .catalog
            .get(b"Dests")
            .ok()
            .and_then(|d| resolve_dict(self.backend, d))
        {
            if let Ok(target) = dests.get(name) {
                return Some(target);
            }
        }

        let names = self
            .catalog
            .get(b"Names")
            .ok()
            .and_then(|n| resolve_dict(self.backend, n))?;
        let tree = names
            .get(b"Dests")
            .ok()
            .and_then(|d| resolve_dict(self.backend, d))?;
        self.search_name_tree(tree, name, 0)
    }

    fn search_name_tree<'n>(
        &'n self,
        node: &'n Dictionary,
        name: &[u8],
        depth: usize,
    ) -> Option<&'n Object> {
        if depth > MAX_NAME_TREE_DEPTH {
            return None;
        }

        if let Ok(Object::Array(pairs)) = node.get(b"Names").map(|n| self.backend.resolve(n)) {
            for pair in pairs.chunks(2) {
                if let [key, value] = pair {
                    let matches = match self.backend.resolve(key) {
                        Object::String(s, _) => s.as_slice() == name,
                        Object::Name(n) => n.as_slice() == name,
                        _ => false,
                    };
                    if matches {
                        return Some(value);
                    }
                }
            }
        }

        if let Ok(Object::Array(kids)) = node.get(b"Kids").map(|k| self.backend.resolve(k)) {
            for kid in kids {
                if let Some(kid_dict) = resolve_dict(self.backend, kid) {
                    if let Some(found) = self.search_name_tree(kid_dict, name, depth + 1) {
                        return Some(found);
                    }
                }
            }
        }

        None
    }
}

fn resolve_dict<'a>(backend: &'a LopdfBackend, obj: &'a Object) -> Option<&'a Dictionary> {
    match backend.resolve(obj) {
        Object::Dictionary(d) => Some(d),
        _ => None,
    }
}

/// Decode a PDF text string (UTF-16BE with BOM, else UTF-8 or Latin-1).
fn string_value(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_text_simple(bytes)),
        Object::Name(bytes) => Some(String::from_utf8_lossy(bytes).to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Document, StringFormat};

    /// Two-page document with an outline: "1 Scope" -> page 1 (with a child
    /// via a named destination) and "2 General" -> page 2 via a GoTo action.
    fn outlined_document() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut kids = Vec::new();
        let mut page_ids = Vec::new();
        for _ in 0..2 {
            let content_id = doc.add_object(lopdf::Stream::new(dictionary! {}, Vec::new()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
            page_ids.push(page_id);
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => 2,
            }),
        );

        let outlines_id = doc.new_object_id();
        let first_id = doc.new_object_id();
        let child_id = doc.new_object_id();
        let second_id = doc.new_object_id();

        doc.objects.insert(
            first_id,
            Object::Dictionary(dictionary! {
                "Title" => Object::String(b"1 Scope".to_vec(), StringFormat::Literal),
                "Parent" => outlines_id,
                "Dest" => vec![Object::Reference(page_ids[0]), "Fit".into()],
                "Next" => second_id,
                "First" => child_id,
                "Last" => child_id,
            }),
        );
        doc.objects.insert(
            child_id,
            Object::Dictionary(dictionary! {
                "Title" => Object::String(b"1.1 Purpose".to_vec(), StringFormat::Literal),
                "Parent" => first_id,
                "Dest" => Object::Name(b"purpose".to_vec()),
            }),
        );
        doc.objects.insert(
            second_id,
            Object::Dictionary(dictionary! {
                "Title" => Object::String(b"2 General".to_vec(), StringFormat::Literal),
                "Parent" => outlines_id,
                "Prev" => first_id,
                "A" => dictionary! {
                    "S" => "GoTo",
                    "D" => vec![Object::Reference(page_ids[1]), "Fit".into()],
                },
            }),
        );
        doc.objects.insert(
            outlines_id,
            Object::Dictionary(dictionary! {
                "Type" => "Outlines",
                "First" => first_id,
                "Last" => second_id,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
            "Outlines" => outlines_id,
            "Dests" => dictionary! {
                "purpose" => vec![Object::Reference(page_ids[1]), "Fit".into()],
            },
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_outline_flattened_depth_first() {
        let backend = LopdfBackend::load_bytes(&outlined_document()).unwrap();
        let toc = extract_outline(&backend).unwrap();
        assert_eq!(
            toc,
            vec![
                TocEntry::new(1, "1 Scope", 1),
                TocEntry::new(2, "1.1 Purpose", 2),
                TocEntry::new(1, "2 General", 2),
            ]
        );
    }

    #[test]
    fn test_string_value_utf16() {
        let obj = Object::String(vec![0xFE, 0xFF, 0x00, 0x41], StringFormat::Hexadecimal);
        assert_eq!(string_value(&obj), Some("A".to_string()));
    }
}
