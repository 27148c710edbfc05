//! Best-effort plain-text extraction from uploaded document bytes.
//!
//! Extraction never fails: structured extraction (PDF pages, DOCX paragraphs)
//! is attempted first and any internal failure falls back to decoding the raw
//! bytes as UTF-8 with invalid sequences replaced. The fallback is reported
//! through [`ExtractedText::succeeded`], not as an error.

use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;

use crate::report::{MediaType, RawDocument};

/// Extraction output: the text plus whether structured extraction worked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub succeeded: bool,
}

/// Convert raw document bytes into best-effort plain text.
pub fn extract(raw: &RawDocument) -> ExtractedText {
    let structured = match raw.media_type {
        MediaType::Pdf => extract_pdf(&raw.bytes),
        MediaType::Docx => extract_docx(&raw.bytes),
        MediaType::Unknown => None,
    };

    match structured {
        Some(text) => ExtractedText {
            text,
            succeeded: true,
        },
        None => {
            debug!(media_type = ?raw.media_type, "structured extraction unavailable, decoding raw bytes");
            ExtractedText {
                text: String::from_utf8_lossy(&raw.bytes).into_owned(),
                succeeded: false,
            }
        }
    }
}

/// Page-by-page PDF text extraction. Pages that fail to decode or carry no
/// text are skipped; a document where every page comes up empty is treated as
/// a failed extraction so the caller falls back.
fn extract_pdf(bytes: &[u8]) -> Option<String> {
    let doc = lopdf::Document::load_mem(bytes).ok()?;

    let mut pages_text = Vec::new();
    for (&page_number, _) in doc.get_pages().iter() {
        match doc.extract_text(&[page_number]) {
            Ok(text) if !text.trim().is_empty() => pages_text.push(text),
            _ => {}
        }
    }

    if pages_text.is_empty() {
        return None;
    }
    Some(pages_text.join("\n"))
}

/// DOCX is a ZIP archive; the document body lives in `word/document.xml`.
/// Text runs are `<w:t>` elements, paragraphs end at `</w:p>`.
fn extract_docx(bytes: &[u8]) -> Option<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).ok()?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .ok()?
        .read_to_string(&mut xml)
        .ok()?;

    let mut reader = Reader::from_str(&xml);
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text_run => {
                if let Ok(text) = t.unescape() {
                    current.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => return None,
            _ => {}
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }

    let text = paragraphs.join("\n");
    if text.trim().is_empty() {
        return None;
    }
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_bytes(document_xml: &str) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("word/document.xml", options).unwrap();
            writer.write_all(document_xml.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    fn pdf_bytes(page_texts: &[&str]) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{Document, Object, Stream, dictionary};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::new();
        for text in page_texts {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![100.into(), 600.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().unwrap(),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let page_count = page_texts.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn empty_bytes_fall_back_without_error() {
        let raw = RawDocument::new(Vec::new(), MediaType::Pdf);
        let extracted = extract(&raw);
        assert_eq!(extracted.text, "");
        assert!(!extracted.succeeded);
    }

    #[test]
    fn unknown_media_type_decodes_bytes_directly() {
        let raw = RawDocument::new(b"plain product brief".to_vec(), MediaType::Unknown);
        let extracted = extract(&raw);
        assert_eq!(extracted.text, "plain product brief");
        assert!(!extracted.succeeded);
    }

    #[test]
    fn invalid_utf8_is_replaced_in_fallback() {
        let raw = RawDocument::new(vec![b'o', b'k', 0xFF, 0xFE], MediaType::Unknown);
        let extracted = extract(&raw);
        assert!(extracted.text.starts_with("ok"));
        assert!(extracted.text.contains('\u{FFFD}'));
        assert!(!extracted.succeeded);
    }

    #[test]
    fn garbage_pdf_bytes_fall_back() {
        let raw = RawDocument::new(b"not a pdf at all".to_vec(), MediaType::Pdf);
        let extracted = extract(&raw);
        assert_eq!(extracted.text, "not a pdf at all");
        assert!(!extracted.succeeded);
    }

    #[test]
    fn pdf_pages_are_joined_with_newlines() {
        let raw = RawDocument::new(pdf_bytes(&["First page", "Second page"]), MediaType::Pdf);
        let extracted = extract(&raw);
        assert!(extracted.succeeded);
        assert!(extracted.text.contains("First page"));
        assert!(extracted.text.contains("Second page"));
        let first = extracted.text.find("First page").unwrap();
        let second = extracted.text.find("Second page").unwrap();
        assert!(first < second);
    }

    #[test]
    fn docx_paragraphs_are_joined_with_newlines() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Checkout flow requirements</w:t></w:r></w:p>
    <w:p><w:r><w:t>Support guest &amp; member checkout</w:t></w:r></w:p>
  </w:body>
</w:document>"#;
        let raw = RawDocument::new(docx_bytes(xml), MediaType::Docx);
        let extracted = extract(&raw);
        assert!(extracted.succeeded);
        assert_eq!(
            extracted.text,
            "Checkout flow requirements\nSupport guest & member checkout"
        );
    }

    #[test]
    fn docx_without_document_xml_falls_back() {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("unrelated.txt", options).unwrap();
            writer.write_all(b"nothing here").unwrap();
            writer.finish().unwrap();
        }
        let raw = RawDocument::new(cursor.into_inner(), MediaType::Docx);
        let extracted = extract(&raw);
        assert!(!extracted.succeeded);
    }
}
