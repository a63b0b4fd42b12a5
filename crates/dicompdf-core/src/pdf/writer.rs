//! Incremental PDF assembly using lopdf.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::Utc;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::{debug, trace, warn};

use crate::error::AssemblyError;
use crate::render::Page;

const PRODUCER: &str = concat!("dicompdf ", env!("CARGO_PKG_VERSION"));
const FONT_NAME: &str = "F1";
const IMAGE_NAME: &str = "Im1";

/// Writes rendered pages into one PDF, in the order they are appended.
///
/// The document is finalized by [`close`](Self::close). A writer dropped
/// without being closed finalizes itself so the sink never holds a
/// truncated document; errors on that path can only be logged.
pub struct PdfDocumentWriter<W: Write> {
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    kids: Vec<Object>,
    title: Option<String>,
    sink: Option<W>,
}

impl PdfDocumentWriter<BufWriter<File>> {
    /// Create the file at `path` and open a writer on it.
    pub fn create(path: &Path) -> Result<Self, AssemblyError> {
        let file = File::create(path)?;
        debug!("Opened PDF output {}", path.display());
        Ok(Self::open(BufWriter::new(file)))
    }
}

impl<W: Write> PdfDocumentWriter<W> {
    /// Open a writer on an arbitrary byte sink.
    pub fn open(sink: W) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        Self {
            doc,
            pages_id,
            font_id,
            kids: Vec::new(),
            title: None,
            sink: Some(sink),
        }
    }

    /// Set the document title recorded in the info dictionary.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Number of pages appended so far.
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append `page` as the next page. The page raster is released once encoded.
    pub fn append(&mut self, page: Page) -> Result<(), AssemblyError> {
        if self.sink.is_none() {
            return Err(AssemblyError::Closed);
        }

        let Page {
            size,
            raster,
            placement,
            title,
        } = page;
        let (width, height) = raster.dimensions();

        let mut image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8i64,
            },
            raster.into_raw(),
        );
        image.compress()?;
        let image_id = self.doc.add_object(image);

        let mut operations = vec![
            // Black background
            Operation::new("q", vec![]),
            Operation::new("g", vec![real(0.0)]),
            Operation::new("re", vec![real(0.0), real(0.0), real(size), real(size)]),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
            // Image plane
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    real(placement.width),
                    real(0.0),
                    real(0.0),
                    real(placement.height),
                    real(placement.x),
                    real(placement.y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_NAME.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ];

        if let Some(title) = title {
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![Object::Name(FONT_NAME.as_bytes().to_vec()), real(title.font_size)],
                ),
                Operation::new("g", vec![real(1.0)]),
                Operation::new("Td", vec![real(title.x), real(title.y)]),
                Operation::new("Tj", vec![win_ansi_string(&title.text)]),
                Operation::new("ET", vec![]),
            ]);
        }

        let content = Content { operations };
        let mut contents = Stream::new(Dictionary::new(), content.encode()?);
        contents.compress()?;
        let contents_id = self.doc.add_object(contents);

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![real(0.0), real(0.0), real(size), real(size)],
            "Contents" => contents_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { FONT_NAME => self.font_id },
                "XObject" => dictionary! { IMAGE_NAME => image_id },
            },
        });
        self.kids.push(page_id.into());

        trace!("Appended page {} ({}x{} px raster)", self.kids.len(), width, height);
        Ok(())
    }

    /// Finalize the document and hand back the sink.
    pub fn close(mut self) -> Result<W, AssemblyError> {
        self.finalize()
    }

    fn finalize(&mut self) -> Result<W, AssemblyError> {
        let mut sink = self.sink.take().ok_or(AssemblyError::Closed)?;

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => self.kids.clone(),
            "Count" => self.kids.len() as i64,
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut info = dictionary! {
            "Producer" => Object::string_literal(PRODUCER),
            "CreationDate" => Object::string_literal(pdf_date()),
        };
        if let Some(title) = &self.title {
            info.set("Title", win_ansi_string(title));
        }
        let info_id = self.doc.add_object(info);
        self.doc.trailer.set("Info", info_id);

        self.doc.save_to(&mut sink)?;
        sink.flush()?;

        debug!("Finalized PDF with {} pages", self.kids.len());
        Ok(sink)
    }
}

impl<W: Write> Drop for PdfDocumentWriter<W> {
    fn drop(&mut self) {
        if self.sink.is_some() {
            if let Err(e) = self.finalize() {
                warn!("Failed to finalize PDF on drop: {}", e);
            }
        }
    }
}

fn real(value: f64) -> Object {
    Object::Real(value as _)
}

/// Literal string in WinAnsi (Latin-1 compatible) encoding.
fn win_ansi_string(text: &str) -> Object {
    let bytes = text
        .chars()
        .map(|c| u8::try_from(c as u32).unwrap_or(b'?'))
        .collect();
    Object::String(bytes, StringFormat::Literal)
}

/// Current time as a PDF date string.
fn pdf_date() -> String {
    Utc::now().format("D:%Y%m%d%H%M%SZ").to_string()
}
