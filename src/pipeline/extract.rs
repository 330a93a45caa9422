//! Text extraction: turn an uploaded document into plain text.
//!
//! Dispatch is by file extension first, then by MIME type:
//!
//! | kind        | extensions        | backend                              |
//! |-------------|-------------------|--------------------------------------|
//! | PDF         | `.pdf`            | pdfium text layer (`pdfium-render`)  |
//! | Word        | `.docx`           | `zip` + `word/document.xml` runs     |
//! | Spreadsheet | `.xlsx` `.xls`    | `calamine`, one block per sheet      |
//! | Text / HTML | `.txt` `.html`…   | read as UTF-8                        |
//! | other       | anything else     | UTF-8, else lossy first 50 KB        |
//!
//! All backends are blocking, so [`FileExtractor`] runs them inside
//! `spawn_blocking`.
//!
//! pdfium is bound at call time: from the directory in `PDFIUM_LIB_PATH` if
//! set, else from the system library path. A missing library is an ordinary
//! extraction error, never a panic.

use crate::error::ExtractionError;
use crate::progress::{FormatProgressCallback, NoopProgressCallback};
use async_trait::async_trait;
use calamine::{open_workbook_auto, Reader};
use pdfium_render::prelude::*;
use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming the directory that holds the pdfium library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bytes kept when an unknown binary file is decoded lossily.
pub const LOSSY_READ_LIMIT: usize = 50 * 1024;

/// A raw PDF read as UTF-8 must carry more than this many non-blank
/// characters to be accepted when pdfium fails.
const PDF_RAW_TEXT_MIN_CHARS: usize = 100;

/// An uploaded document waiting to be extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// Where the bytes live now (possibly a temp file).
    pub path: PathBuf,
    /// User-facing name, used for dispatch and error messages.
    pub name: String,
    /// Declared content type, if any.
    pub mime: Option<String>,
}

impl InputFile {
    /// A local file named after its last path component.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            name,
            mime: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Backend for this file. Without a declared MIME type, one is guessed
    /// from the name.
    pub fn kind(&self) -> DocumentKind {
        let mime = self.mime.clone().or_else(|| guess_mime(&self.name));
        DocumentKind::detect(&self.name, mime.as_deref())
    }
}

/// Extraction backend selected for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Spreadsheet,
    PlainText,
    Html,
    Other,
}

impl DocumentKind {
    /// Classify by extension of `name`, falling back to `mime`.
    pub fn detect(name: &str, mime: Option<&str>) -> Self {
        let ext = Path::new(name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());
        match ext.as_deref() {
            Some("pdf") => return Self::Pdf,
            Some("docx" | "doc") => return Self::Docx,
            Some("xlsx" | "xls" | "xlsm" | "ods") => return Self::Spreadsheet,
            Some("txt" | "text" | "md" | "csv" | "log") => return Self::PlainText,
            Some("html" | "htm") => return Self::Html,
            _ => {}
        }

        let mime = mime.unwrap_or("").to_ascii_lowercase();
        if mime.contains("spreadsheet") || mime.contains("excel") {
            Self::Spreadsheet
        } else if mime.contains("word") {
            Self::Docx
        } else if mime.contains("pdf") {
            Self::Pdf
        } else if mime.contains("html") {
            Self::Html
        } else if mime.contains("text") {
            Self::PlainText
        } else {
            Self::Other
        }
    }
}

/// MIME type implied by a file name's extension, if it has a known one.
pub fn guess_mime(name: &str) -> Option<String> {
    mime_guess::from_path(name).first_raw().map(str::to_string)
}

/// Anything that can turn an [`InputFile`] into text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, file: &InputFile) -> Result<String, ExtractionError>;
}

/// Built-in extractor covering PDF, DOCX, spreadsheets and text.
#[derive(Debug, Clone, Default)]
pub struct FileExtractor {
    pdfium_lib_dir: Option<PathBuf>,
}

impl FileExtractor {
    /// Extractor that binds pdfium from `PDFIUM_LIB_PATH` or the system path.
    pub fn from_env() -> Self {
        Self {
            pdfium_lib_dir: std::env::var_os(PDFIUM_LIB_PATH_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Extractor that binds pdfium from `dir`.
    pub fn with_pdfium_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            pdfium_lib_dir: Some(dir.into()),
        }
    }
}

#[async_trait]
impl TextExtractor for FileExtractor {
    async fn extract(&self, file: &InputFile) -> Result<String, ExtractionError> {
        let file = file.clone();
        let pdfium_dir = self.pdfium_lib_dir.clone();
        let name = file.name.clone();

        tokio::task::spawn_blocking(move || extract_blocking(&file, pdfium_dir.as_deref()))
            .await
            .map_err(|e| ExtractionError::new(name, format!("extraction task panicked: {e}")))?
    }
}

/// Blocking dispatch on [`DocumentKind`].
fn extract_blocking(file: &InputFile, pdfium_dir: Option<&Path>) -> Result<String, ExtractionError> {
    let kind = file.kind();
    debug!("Extracting '{}' as {:?}", file.name, kind);
    let err = |reason: String| ExtractionError::new(&file.name, reason);

    match kind {
        DocumentKind::Pdf => extract_pdf(&file.path, pdfium_dir).or_else(|pdf_err| {
            warn!("pdfium could not read '{}': {}", file.name, pdf_err);
            read_pdf_as_text(&file.path).ok_or_else(|| err(pdf_err))
        }),
        DocumentKind::Docx => extract_docx(&file.path).map_err(err),
        DocumentKind::Spreadsheet => extract_spreadsheet(&file.path).map_err(err),
        DocumentKind::PlainText | DocumentKind::Html => {
            std::fs::read_to_string(&file.path).map_err(|e| err(e.to_string()))
        }
        DocumentKind::Other => read_any(&file.path).map_err(err),
    }
}

// ── PDF ──────────────────────────────────────────────────────────────────

fn bind_pdfium(lib_dir: Option<&Path>) -> Result<Pdfium, String> {
    let bindings = match lib_dir {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| format!("pdfium library unavailable: {e:?}"))?;
    Ok(Pdfium::new(bindings))
}

fn extract_pdf(path: &Path, lib_dir: Option<&Path>) -> Result<String, String> {
    let pdfium = bind_pdfium(lib_dir)?;
    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| format!("could not open PDF: {e:?}"))?;

    let mut text = String::new();
    for (i, page) in document.pages().iter().enumerate() {
        let page_text = page
            .text()
            .map_err(|e| format!("could not read text of page {}: {e:?}", i + 1))?;
        text.push_str(&page_text.all());
        text.push('\n');
    }
    info!("PDF text layer: {} chars", text.len());
    Ok(text)
}

/// Text-only "PDFs" (and mislabelled text files) survive a missing pdfium.
fn read_pdf_as_text(path: &Path) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    let meaningful = text.chars().filter(|c| !c.is_whitespace()).count();
    (meaningful > PDF_RAW_TEXT_MIN_CHARS).then_some(text)
}

// ── DOCX ─────────────────────────────────────────────────────────────────

fn extract_docx(path: &Path) -> Result<String, String> {
    let file = std::fs::File::open(path).map_err(|e| e.to_string())?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| format!("not a DOCX archive: {e}"))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| format!("missing word/document.xml: {e}"))?
        .read_to_string(&mut xml)
        .map_err(|e| e.to_string())?;
    docx_xml_to_text(&xml)
}

/// Paragraph text from a WordprocessingML body.
///
/// One line per `w:p`; `w:tab` and `w:br` inside a run become `\t` and `\n`.
pub fn docx_xml_to_text(xml: &str) -> Result<String, String> {
    let mut reader = XmlReader::from_str(xml);
    let mut buf = Vec::new();
    let mut text = String::new();
    let mut in_run = false;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"r" => in_run = true,
                b"t" => in_text = in_run,
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"r" => in_run = false,
                b"t" => in_text = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            // Tab stops in paragraph properties are also `w:tab`; only runs count.
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"tab" if in_run => text.push('\t'),
                b"br" | b"cr" if in_run => text.push('\n'),
                b"p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text => {
                let run = e
                    .unescape()
                    .map_err(|err| format!("bad text in word/document.xml: {err}"))?;
                text.push_str(&run);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("XML parse error in word/document.xml: {e}")),
            _ => {}
        }
        buf.clear();
    }
    Ok(text.trim_end().to_string())
}

// ── Spreadsheets ─────────────────────────────────────────────────────────

fn extract_spreadsheet(path: &Path) -> Result<String, String> {
    let mut workbook = open_workbook_auto(path).map_err(|e| format!("could not open workbook: {e}"))?;
    let mut text = String::new();
    for sheet in workbook.sheet_names().to_owned() {
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| format!("could not read sheet '{sheet}': {e}"))?;
        text.push_str(&format!("Sheet: {sheet}\n"));
        for row in range.rows() {
            let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
            text.push_str(&cells.join("\t"));
            text.push('\n');
        }
        text.push('\n');
    }
    Ok(text)
}

// ── Anything else ────────────────────────────────────────────────────────

fn read_any(path: &Path) -> Result<String, String> {
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            let bytes = e.into_bytes();
            let end = bytes.len().min(LOSSY_READ_LIMIT);
            String::from_utf8_lossy(&bytes[..end]).into_owned()
        }
    };
    if text.trim().is_empty() {
        return Err("Unable to extract readable text from this file type".to_string());
    }
    Ok(text)
}

// ── Multi-file ───────────────────────────────────────────────────────────

/// Concatenated text of several documents.
#[derive(Debug, Clone, Default)]
pub struct CombinedText {
    pub text: String,
    pub extracted: usize,
    pub failures: Vec<ExtractionError>,
}

/// Extract every file, in order, into one delimited text.
///
/// A file that fails becomes an inline error block; the rest still count.
pub async fn extract_many(
    extractor: &dyn TextExtractor,
    files: &[InputFile],
    progress: Option<&dyn FormatProgressCallback>,
) -> CombinedText {
    let progress = progress.unwrap_or(&NoopProgressCallback);
    progress.on_extraction_start(files.len());

    let mut combined = CombinedText::default();
    for (i, file) in files.iter().enumerate() {
        let num = i + 1;
        match extractor.extract(file).await {
            Ok(text) => {
                progress.on_file_extracted(num, &file.name, text.chars().count());
                combined
                    .text
                    .push_str(&format!("\n\n=== FILE {num}: {} ===\n{text}\n", file.name));
                combined.extracted += 1;
            }
            Err(e) => {
                warn!("{}", e);
                progress.on_file_error(num, &file.name, &e.reason);
                combined.text.push_str(&format!(
                    "\n\n=== FILE {num}: {} (ERROR) ===\nFailed to extract: {}\n",
                    file.name, e.reason
                ));
                combined.failures.push(e);
            }
        }
    }
    combined
}
