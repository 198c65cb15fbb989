//! Building new PDFs out of pages taken from existing ones.
//!
//! All three jobs produce their output through [`PageAssembler`]: merge
//! appends every page of every input, split appends one contiguous range,
//! and rasterize appends freshly built image pages.

use std::collections::{BTreeMap, HashMap};

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Error, Result};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Page trees deeper than this are treated as cyclic.
const MAX_TREE_DEPTH: usize = 64;

/// Accumulates pages into a fresh document, preserving append order.
pub struct PageAssembler {
    document: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
}

impl PageAssembler {
    pub fn new() -> Self {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        Self {
            document,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// Pages appended so far
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append the given 1-based pages of `source`, in the order given.
    ///
    /// Fails without touching the assembler if any page number is missing.
    pub fn append_pages(&mut self, mut source: Document, page_numbers: &[u32]) -> Result<()> {
        source.renumber_objects_with(self.document.max_id + 1);
        let pages = source.get_pages();

        let mut selected = Vec::with_capacity(page_numbers.len());
        for &number in page_numbers {
            let page_id = *pages.get(&number).ok_or(Error::PdfInvalidPage {
                page: number as usize,
                total: pages.len(),
            })?;
            selected.push((page_id, materialize_page(&source, page_id)?));
        }

        self.document.max_id = self.document.max_id.max(source.max_id);

        for (object_id, object) in source.objects {
            match object.type_name().unwrap_or(b"") {
                b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" => {}
                _ => {
                    self.document.objects.insert(object_id, object);
                }
            }
        }

        for (page_id, mut page) in selected {
            page.set("Parent", Object::Reference(self.pages_id));
            self.document.objects.insert(page_id, Object::Dictionary(page));
            self.kids.push(page_id);
        }

        Ok(())
    }

    /// Append a page that shows exactly one JPEG, sized to its pixels.
    pub fn append_jpeg_page(&mut self, jpeg: Vec<u8>, width: u32, height: u32) -> Result<()> {
        let (width, height) = (i64::from(width), i64::from(height));

        let image = Dictionary::from_iter([
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Image".to_vec())),
            ("Width", Object::Integer(width)),
            ("Height", Object::Integer(height)),
            ("ColorSpace", Object::Name(b"DeviceRGB".to_vec())),
            ("BitsPerComponent", Object::Integer(8)),
            ("Filter", Object::Name(b"DCTDecode".to_vec())),
        ]);
        let image_id = self
            .document
            .add_object(Stream::new(image, jpeg).with_compression(false));

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Integer(width),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(height),
                        Object::Integer(0),
                        Object::Integer(0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_bytes = content
            .encode()
            .map_err(|e| Error::Lopdf(format!("Failed to encode page content: {e}")))?;
        let content_id = self
            .document
            .add_object(Stream::new(Dictionary::new(), content_bytes));

        let resources = Dictionary::from_iter([(
            "XObject",
            Object::Dictionary(Dictionary::from_iter([("Im0", Object::Reference(image_id))])),
        )]);

        let page_id = self.document.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(self.pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(width),
                    Object::Integer(height),
                ]),
            ),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Dictionary(resources)),
        ]));
        self.kids.push(page_id);

        Ok(())
    }

    /// Close the page tree and serialize.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let count = i64::try_from(self.kids.len())
            .map_err(|_| Error::PdfSave("too many pages".to_string()))?;
        let kids = self.kids.iter().map(|&id| Object::Reference(id)).collect();

        let pages = Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(count)),
        ]);
        self.document
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.document.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]));
        self.document.trailer.set("Root", Object::Reference(catalog_id));

        // Objects that only served pages we did not take
        self.document.prune_objects();
        self.document.renumber_objects();
        self.document.compress();

        save_document(&mut self.document)
    }
}

impl Default for PageAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy a page dictionary, pulling inherited attributes down onto it.
fn materialize_page(source: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut page = source
        .get_dictionary(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to read page object {page_id:?}: {e}")))?
        .clone();

    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;
    while let Some(parent_id) = parent {
        let Ok(node) = source.get_dictionary(parent_id) else {
            break;
        };

        for key in INHERITABLE_KEYS {
            if !page.has(key)
                && let Ok(value) = node.get(key)
            {
                page.set(key.to_vec(), value.clone());
            }
        }

        depth += 1;
        if depth >= MAX_TREE_DEPTH {
            break;
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    Ok(page)
}

/// Point every reference to a duplicate stream at its first identical copy.
///
/// Returns how many duplicate objects were removed.
pub(crate) fn dedupe_streams(document: &mut Document) -> usize {
    let mut seen: HashMap<(String, Vec<u8>), ObjectId> = HashMap::new();
    let mut remap: BTreeMap<ObjectId, ObjectId> = BTreeMap::new();

    for (&id, object) in &document.objects {
        if let Object::Stream(stream) = object {
            let key = (format!("{:?}", stream.dict), stream.content.clone());
            match seen.get(&key) {
                Some(&canonical) => {
                    remap.insert(id, canonical);
                }
                None => {
                    seen.insert(key, id);
                }
            }
        }
    }

    if remap.is_empty() {
        return 0;
    }

    for object in document.objects.values_mut() {
        remap_references(object, &remap);
    }
    for (_, value) in document.trailer.iter_mut() {
        remap_references(value, &remap);
    }
    for id in remap.keys() {
        document.objects.remove(id);
    }

    remap.len()
}

fn remap_references(object: &mut Object, remap: &BTreeMap<ObjectId, ObjectId>) {
    match object {
        Object::Reference(id) => {
            if let Some(&target) = remap.get(id) {
                *id = target;
            }
        }
        Object::Array(items) => {
            for item in items {
                remap_references(item, remap);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                remap_references(value, remap);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                remap_references(value, remap);
            }
        }
        _ => {}
    }
}

/// Serialize a document to bytes.
pub(crate) fn save_document(document: &mut Document) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    document
        .save_to(&mut output)
        .map_err(|e| Error::PdfSave(format!("Failed to save PDF: {e}")))?;
    Ok(output)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    /// A document whose pages each print "Page <n>" and inherit MediaBox
    /// and Resources from the page tree root.
    pub(crate) fn create_test_pdf(page_count: u32) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ]));
        let resources_id = doc.add_object(Dictionary::from_iter([(
            "Font",
            Object::Dictionary(Dictionary::from_iter([("F1", Object::Reference(font_id))])),
        )]));

        let mut kids = Vec::new();
        for n in 1..=page_count {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![100.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(format!("Page {n}"))]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
            let page_id = doc.add_object(Dictionary::from_iter([
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                ("Contents", Object::Reference(content_id)),
            ]));
            kids.push(Object::Reference(page_id));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(kids)),
                ("Count", Object::Integer(i64::from(page_count))),
                ("Resources", Object::Reference(resources_id)),
                (
                    "MediaBox",
                    Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
                ),
            ])),
        );

        let catalog_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut output = Vec::new();
        doc.save_to(&mut output).unwrap();
        output
    }

    /// Decompressed content of every page, in page order.
    pub(crate) fn page_texts(bytes: &[u8]) -> Vec<String> {
        let mut doc = Document::load_mem(bytes).unwrap();
        doc.decompress();
        doc.get_pages()
            .values()
            .map(|&id| String::from_utf8_lossy(&doc.get_page_content(id).unwrap()).into_owned())
            .collect()
    }

    #[test]
    fn test_append_preserves_order() {
        let source = Document::load_mem(&create_test_pdf(4)).unwrap();
        let mut assembler = PageAssembler::new();
        assembler.append_pages(source, &[3, 1]).unwrap();
        assert_eq!(assembler.page_count(), 2);

        let texts = page_texts(&assembler.finish().unwrap());
        assert_eq!(texts.len(), 2);
        assert!(texts[0].contains("Page 3"));
        assert!(texts[1].contains("Page 1"));
    }

    #[test]
    fn test_inherited_attributes_are_copied() {
        let source = Document::load_mem(&create_test_pdf(2)).unwrap();
        let mut assembler = PageAssembler::new();
        assembler.append_pages(source, &[2]).unwrap();

        let doc = Document::load_mem(&assembler.finish().unwrap()).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let page = doc.get_dictionary(page_id).unwrap();
        assert!(page.has(b"MediaBox"));
        assert!(page.has(b"Resources"));
    }

    #[test]
    fn test_missing_page_is_rejected() {
        let source = Document::load_mem(&create_test_pdf(2)).unwrap();
        let mut assembler = PageAssembler::new();
        let err = assembler.append_pages(source, &[5]).unwrap_err();
        assert!(matches!(err, Error::PdfInvalidPage { page: 5, total: 2 }));
        assert_eq!(assembler.page_count(), 0);
    }

    #[test]
    fn test_jpeg_page_geometry() {
        let mut assembler = PageAssembler::new();
        assembler.append_jpeg_page(vec![0xFF, 0xD8, 0xFF, 0xD9], 40, 30).unwrap();

        let doc = Document::load_mem(&assembler.finish().unwrap()).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let media_box = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"MediaBox")
            .and_then(Object::as_array)
            .unwrap()
            .clone();
        assert_eq!(media_box[2].as_i64().unwrap(), 40);
        assert_eq!(media_box[3].as_i64().unwrap(), 30);
    }

    #[test]
    fn test_dedupe_streams() {
        let mut doc = Document::with_version("1.5");
        let first = doc.add_object(Stream::new(Dictionary::new(), b"same".to_vec()));
        let second = doc.add_object(Stream::new(Dictionary::new(), b"same".to_vec()));
        let holder = doc.add_object(Object::Array(vec![
            Object::Reference(first),
            Object::Reference(second),
        ]));

        assert_eq!(dedupe_streams(&mut doc), 1);
        assert!(doc.get_object(second).is_err());
        let refs = doc.get_object(holder).and_then(Object::as_array).unwrap();
        assert_eq!(refs[1].as_reference().unwrap(), first);
    }
}
