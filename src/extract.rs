//! Plain-text extraction from uploaded documents.
//!
//! `.pdf` files (any case) go through lopdf; everything else is read as UTF-8,
//! falling back to Latin-1 when the bytes are not valid UTF-8.

use lopdf::Document;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read upload: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to load PDF: {0}")]
    Pdf(String),

    #[error("extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Whether a filename selects PDF decoding.
pub fn is_pdf(filename: &str) -> bool {
    filename.to_lowercase().ends_with(".pdf")
}

/// Read a stored upload and extract its text. Decoding runs on the blocking
/// pool since PDF parsing is CPU bound.
pub async fn extract_file(path: &Path, filename: &str) -> Result<String, ExtractError> {
    let data = tokio::fs::read(path).await?;
    debug!("Read {} bytes of '{}' from transient storage", data.len(), filename);
    let filename = filename.to_string();
    tokio::task::spawn_blocking(move || extract_text(&data, &filename)).await?
}

/// Extract text from raw bytes, dispatching on the filename.
pub fn extract_text(data: &[u8], filename: &str) -> Result<String, ExtractError> {
    if is_pdf(filename) {
        extract_pdf_text(data)
    } else {
        Ok(decode_text(data))
    }
}

/// UTF-8 with a single-byte (Latin-1) fallback. Never fails.
pub fn decode_text(data: &[u8]) -> String {
    match std::str::from_utf8(data) {
        Ok(text) => text.to_string(),
        Err(_) => {
            debug!("Upload is not valid UTF-8, decoding as Latin-1");
            data.iter().map(|&b| b as char).collect()
        }
    }
}

/// Extract text from a PDF using lopdf, pages in document order.
fn extract_pdf_text(data: &[u8]) -> Result<String, ExtractError> {
    let doc = Document::load_from(Cursor::new(data))
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;

    let pages = doc.get_pages();
    let mut texts = Vec::with_capacity(pages.len());

    for (page_num, _) in pages {
        match doc.extract_text(&[page_num]) {
            Ok(content) => texts.push(content),
            Err(e) => warn!("Skipping unreadable PDF page {}: {}", page_num, e),
        }
    }

    Ok(texts.join("\n"))
}

/// Build a minimal PDF with one text line per page.
#[cfg(test)]
pub(crate) fn sample_pdf(pages: &[&str]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

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

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
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
