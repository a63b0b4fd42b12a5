//! PDF document assembly.

mod writer;

pub use writer::PdfDocumentWriter;
