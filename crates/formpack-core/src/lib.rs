//! Finance form filling and package assembly
//!
//! This crate turns collected form inputs into a single PDF package:
//! - `collect`: normalize a session's form inputs and derive the shared context
//! - `calc`: derived fields and totals, producing one `FormRecord` per form
//! - `mapping` / `fill`: write records into AcroForm templates through static field tables
//! - `assemble`: merge filled forms and attachments into the final PDF

pub mod acroform;
pub mod assemble;
pub mod calc;
pub mod collect;
pub mod config;
pub mod error;
pub mod fill;
pub mod image_page;
pub mod mapping;
pub mod merge;
pub mod model;
pub mod record;

pub use assemble::{
    assemble_package, generate_package, package_file_name, Attachment, AttachmentKind, Package,
};
pub use calc::{build_records, Calculator, PackageTotals, Total};
pub use collect::{CollectedForms, FormSession};
pub use config::Config;
pub use error::FormPackError;
pub use fill::{field_values, fill_document, fill_template};
pub use merge::merge_documents;
pub use model::FormKind;
pub use record::{FieldValue, FormRecord};

