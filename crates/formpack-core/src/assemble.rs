//! Package assembly
//!
//! Loads templates, fills them, converts attachments and merges everything
//! into one PDF in a fixed order: filled forms first (cover sheet, non-travel,
//! travel), then attachments in upload order.

use crate::calc::build_records;
use crate::collect::CollectedForms;
use crate::config::Config;
use crate::error::FormPackError;
use crate::fill::fill_template;
use crate::image_page::image_to_pdf;
use crate::merge::merge_documents;
use chrono::NaiveDateTime;
use image::ImageFormat;
use lopdf::Document;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Attachment extensions accepted, compared case-insensitively
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["pdf", "png", "jpg", "jpeg", "gif", "bmp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Pdf,
    Image(ImageFormat),
}

impl AttachmentKind {
    /// Kind for a file name, by extension
    pub fn from_name(name: &str) -> Result<Self, FormPackError> {
        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(AttachmentKind::Pdf),
            "png" => Ok(AttachmentKind::Image(ImageFormat::Png)),
            "jpg" | "jpeg" => Ok(AttachmentKind::Image(ImageFormat::Jpeg)),
            "gif" => Ok(AttachmentKind::Image(ImageFormat::Gif)),
            "bmp" => Ok(AttachmentKind::Image(ImageFormat::Bmp)),
            _ => Err(FormPackError::UnsupportedAttachment(format!(
                "{} (expected one of: {})",
                name,
                SUPPORTED_EXTENSIONS.join(", ")
            ))),
        }
    }
}

/// A supporting document uploaded with the forms
#[derive(Debug, Clone)]
pub struct Attachment {
    pub name: String,
    pub kind: AttachmentKind,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, FormPackError> {
        let name = name.into();
        let kind = AttachmentKind::from_name(&name)?;
        Ok(Self { name, kind, bytes })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, FormPackError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        // Reject by extension before reading the file
        AttachmentKind::from_name(&name)?;
        let bytes = fs::read(path)?;
        Self::new(name, bytes)
    }

    /// Parse or convert the attachment into a PDF document
    pub fn into_document(self) -> Result<Document, FormPackError> {
        match self.kind {
            AttachmentKind::Pdf => Document::load_mem(&self.bytes)
                .map_err(|e| FormPackError::ParseError(format!("{}: {}", self.name, e))),
            AttachmentKind::Image(format) => image_to_pdf(&self.bytes, format).map_err(|e| match e {
                FormPackError::ImageError(msg) => {
                    FormPackError::ImageError(format!("{}: {}", self.name, msg))
                }
                other => other,
            }),
        }
    }
}

/// The assembled output, ready to be written or downloaded
#[derive(Debug, Clone)]
pub struct Package {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

impl Package {
    pub fn mime_type(&self) -> &'static str {
        PDF_MIME_TYPE
    }

    /// Write the package into `dir`, creating it if needed. Returns the file path.
    pub fn write_to_dir<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf, FormPackError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.bytes)?;
        info!("Wrote {} ({} pages, {} bytes)", path.display(), self.page_count, self.bytes.len());
        Ok(path)
    }
}

/// `<prefix>_<YYYYmmdd_HHMMSS>.pdf`
pub fn package_file_name(prefix: &str, generated_at: NaiveDateTime) -> String {
    format!("{}_{}.pdf", prefix, generated_at.format("%Y%m%d_%H%M%S"))
}

/// Merge filled forms and attachments into one package.
///
/// Forms must already be in assembly order. Any attachment that fails to
/// parse or convert fails the whole package.
pub fn assemble_package(
    forms: Vec<Document>,
    attachments: Vec<Attachment>,
    file_prefix: &str,
    generated_at: NaiveDateTime,
) -> Result<Package, FormPackError> {
    let mut documents = forms;
    for attachment in attachments {
        debug!("Adding attachment {}", attachment.name);
        documents.push(attachment.into_document()?);
    }

    if documents.is_empty() {
        return Err(FormPackError::OperationError(
            "Nothing to assemble: no forms selected and no attachments".into(),
        ));
    }

    let mut merged = merge_documents(documents)?;
    let page_count = merged.get_pages().len();
    merged.compress();

    let mut bytes = Vec::new();
    merged
        .save_to(&mut bytes)
        .map_err(|e| FormPackError::OperationError(format!("Failed to save: {}", e)))?;

    Ok(Package {
        file_name: package_file_name(file_prefix, generated_at),
        bytes,
        page_count,
    })
}

/// Read a template from disk
pub fn load_template(path: &Path) -> Result<Vec<u8>, FormPackError> {
    if !path.is_file() {
        return Err(FormPackError::TemplateNotFound(path.display().to_string()));
    }
    Ok(fs::read(path)?)
}

/// Fill every selected form from its configured template and assemble the package
pub fn generate_package(
    collected: &CollectedForms,
    config: &Config,
    attachments: Vec<Attachment>,
    generated_at: NaiveDateTime,
) -> Result<Package, FormPackError> {
    let records = build_records(collected, &config.derived.department_prefix);

    let mut forms = Vec::with_capacity(records.len());
    for record in &records {
        let path = config.templates.path_for(record.form);
        debug!("Filling {} from {}", record.form.title(), path.display());
        let template = load_template(path)?;
        forms.push(fill_template(&template, record)?);
    }

    info!(
        "Assembling {} forms and {} attachments",
        forms.len(),
        attachments.len()
    );
    assemble_package(forms, attachments, &config.output.file_prefix, generated_at)
}
