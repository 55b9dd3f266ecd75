//! Text extraction plans for Drive files.
//!
//! Google-native documents have no bytes of their own and must be exported
//! to a text format; plain-text uploads are downloaded as-is. Everything
//! else (PDFs, images, archives) is unsupported and yields empty text, which
//! the ingest pipeline skips without treating it as an error.

/// Supported Google-native MIME types.
pub const MIME_GOOGLE_DOC: &str = "application/vnd.google-apps.document";
pub const MIME_GOOGLE_SHEET: &str = "application/vnd.google-apps.spreadsheet";
pub const MIME_GOOGLE_SLIDES: &str = "application/vnd.google-apps.presentation";
pub const MIME_GOOGLE_FOLDER: &str = "application/vnd.google-apps.folder";

/// How to obtain plain text for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPlan {
    /// `GET files/{id}/export?mimeType=<target>`.
    Export(&'static str),
    /// `GET files/{id}?alt=media`.
    Download,
    /// No text can be extracted.
    Unsupported,
}

/// Choose the extraction plan for a MIME type.
pub fn export_plan(mime_type: &str) -> ExportPlan {
    match mime_type {
        MIME_GOOGLE_DOC | MIME_GOOGLE_SLIDES => ExportPlan::Export("text/plain"),
        MIME_GOOGLE_SHEET => ExportPlan::Export("text/csv"),
        "application/json" | "application/xml" => ExportPlan::Download,
        m if m.starts_with("text/") => ExportPlan::Download,
        _ => ExportPlan::Unsupported,
    }
}

/// Normalize exported text: strip a UTF-8 BOM and CRLF line endings.
pub fn normalize_text(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').replace("\r\n", "\n")
}
