//! Export of the rendered result to PDF.
//!
//! Producing the PDF is delegated to whatever sits behind [`PdfExporter`].
//! In the browser that is the print dialog's "Save as PDF".

use thiserror::Error;
use tracing::info;

/// Default file name offered for exported documents.
pub const DEFAULT_EXPORT_NAME: &str = "docr-analysis.pdf";

const PRINT_STYLES: &str = "body{font-family:sans-serif;margin:2rem;line-height:1.5}\
table{border-collapse:collapse;width:100%;margin:1rem 0}\
th,td{border:1px solid #999;padding:.4rem .8rem}\
th{background:#eee}";

#[derive(Debug, Error, PartialEq)]
pub enum ExportError {
    #[error("There is no analysis result to export")]
    NothingToExport,

    #[error("Export unavailable: {0}")]
    Unavailable(String),
}

/// Rendered result handed to an exporter.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportDocument {
    pub file_name: String,
    /// HTML of the result panel, as displayed.
    pub body_html: String,
}

impl ExportDocument {
    pub fn new(file_name: impl Into<String>, body_html: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            body_html: body_html.into(),
        }
    }

    /// Document title, the file name without its extension.
    pub fn title(&self) -> &str {
        self.file_name
            .strip_suffix(".pdf")
            .unwrap_or(&self.file_name)
    }

    /// Standalone HTML page wrapping the rendered result.
    pub fn to_html_page(&self) -> String {
        format!(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{}</title><style>{}</style></head><body>{}</body></html>",
            escape_text(self.title()),
            PRINT_STYLES,
            self.body_html
        )
    }
}

pub trait PdfExporter {
    fn export(&self, document: &ExportDocument) -> Result<(), ExportError>;
}

/// Opens a print window holding the document and triggers printing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintExporter;

impl PdfExporter for PrintExporter {
    fn export(&self, document: &ExportDocument) -> Result<(), ExportError> {
        let window = web_sys::window()
            .ok_or_else(|| ExportError::Unavailable("no browser window".to_string()))?;
        let print_window = window
            .open_with_url_and_target("", "_blank")
            .map_err(|e| ExportError::Unavailable(format!("{:?}", e)))?
            .ok_or_else(|| ExportError::Unavailable("popup blocked".to_string()))?;
        let doc = print_window
            .document()
            .ok_or_else(|| ExportError::Unavailable("print window has no document".to_string()))?;
        let root = doc
            .document_element()
            .ok_or_else(|| ExportError::Unavailable("print window has no root".to_string()))?;

        root.set_inner_html(&document.to_html_page());
        doc.set_title(document.title());

        info!("Printing '{}' to PDF", document.file_name);
        print_window
            .print()
            .map_err(|e| ExportError::Unavailable(format!("{:?}", e)))
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
