//! Synthetic AcroForm templates carrying the real template field names
//!
//! Each template page gets a content stream naming the form and page, so
//! page order can be checked after assembly.

#![allow(dead_code)]

use formpack_core::mapping::{mapping_for, row_field_name};
use formpack_core::FormKind;
use image::{Rgba, RgbaImage};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::io::Cursor;

const FF_RADIO: i64 = 1 << 15;

/// Field not named by any mapping table
pub const UNMAPPED_FIELD: &str = "Office Use Only";

pub const PICKUP_FIELD: &str = "If RCC or Gift Reimbursement pick up check";
pub const PICKUP_LABELS: [&str; 3] = ["Yes", "No", "NA"];

#[derive(Debug, Clone)]
pub enum TemplateField {
    Text(String),
    Checkbox(String),
    Radio(String, Vec<&'static str>),
}

fn is_checkbox(logical: &str) -> bool {
    (logical.starts_with("account_") && logical != "account_number")
        || (logical.starts_with("expense_") && logical != "expense_purpose")
        || logical.starts_with("entity_")
}

/// Fields on every page of a form's template, from its mapping table.
///
/// Sections get `extra_rows` more row fields than their capacity.
pub fn template_fields(form: FormKind, extra_rows: usize) -> Vec<Vec<TemplateField>> {
    let mapping = mapping_for(form);
    let page_count = mapping.pages.iter().map(|p| p.page).max().unwrap_or(1) as usize;
    let mut pages: Vec<Vec<TemplateField>> = vec![Vec::new(); page_count];

    for page in mapping.pages {
        let fields_on_page = &mut pages[page.page as usize - 1];
        for binding in page.fields {
            let name = binding.template.to_string();
            let field = if binding.logical == "pickup_check" {
                TemplateField::Radio(name, PICKUP_LABELS.to_vec())
            } else if is_checkbox(binding.logical) {
                TemplateField::Checkbox(name)
            } else {
                TemplateField::Text(name)
            };
            fields_on_page.push(field);
        }
        for section in page.sections {
            for index in 0..section.section.capacity() + extra_rows {
                for column in section.columns {
                    let name = row_field_name(column.template, index);
                    fields_on_page.push(TemplateField::Text(name));
                }
            }
        }
    }

    pages[0].push(TemplateField::Text(UNMAPPED_FIELD.to_string()));
    pages
}

/// Template bytes for a form, shaped like the finance office PDF
pub fn template_for(form: FormKind) -> Vec<u8> {
    build_form_pdf(&format!("{:?}", form), &template_fields(form, 0))
}

fn appearance(doc: &mut Document, states: &[&str]) -> Dictionary {
    let stream = doc.add_object(Stream::new(Dictionary::new(), Vec::new()));
    let mut normal = Dictionary::new();
    for state in states {
        normal.set(state.as_bytes().to_vec(), stream);
    }
    dictionary! { "N" => normal }
}

/// Empty normal appearance, as an unfilled text field carries
fn blank_text_appearance(doc: &mut Document) -> Dictionary {
    let stream = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), 200.into(), 16.into()],
        },
        b"/Tx BMC EMC".to_vec(),
    ));
    dictionary! { "N" => stream }
}

fn page_content(doc: &mut Document, marker: &str) -> ObjectId {
    let text = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", marker);
    doc.add_object(Stream::new(Dictionary::new(), text.into_bytes()))
}

/// Build a form PDF; page `n` carries the content marker `<label> p<n>`
pub fn build_form_pdf(label: &str, pages: &[Vec<TemplateField>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    let mut fields = Vec::new();

    for (index, fields_on_page) in pages.iter().enumerate() {
        let page_id = doc.new_object_id();
        let mut annots = Vec::new();

        for field in fields_on_page {
            match field {
                TemplateField::Text(name) => {
                    let ap = blank_text_appearance(&mut doc);
                    let id = doc.add_object(dictionary! {
                        "Type" => "Annot",
                        "Subtype" => "Widget",
                        "FT" => "Tx",
                        "T" => Object::string_literal(name.as_str()),
                        "Rect" => vec![72.into(), 700.into(), 272.into(), 716.into()],
                        "AP" => ap,
                        "P" => page_id,
                    });
                    annots.push(Object::Reference(id));
                    fields.push(Object::Reference(id));
                }
                TemplateField::Checkbox(name) => {
                    let ap = appearance(&mut doc, &["Yes", "Off"]);
                    let id = doc.add_object(dictionary! {
                        "Type" => "Annot",
                        "Subtype" => "Widget",
                        "FT" => "Btn",
                        "T" => Object::string_literal(name.as_str()),
                        "AS" => "Off",
                        "AP" => ap,
                        "P" => page_id,
                    });
                    annots.push(Object::Reference(id));
                    fields.push(Object::Reference(id));
                }
                TemplateField::Radio(name, labels) => {
                    let parent_id = doc.new_object_id();
                    let mut radio_kids = Vec::new();
                    for label in labels {
                        let ap = appearance(&mut doc, &[*label, "Off"]);
                        let id = doc.add_object(dictionary! {
                            "Type" => "Annot",
                            "Subtype" => "Widget",
                            "Parent" => parent_id,
                            "AS" => "Off",
                            "AP" => ap,
                            "P" => page_id,
                        });
                        annots.push(Object::Reference(id));
                        radio_kids.push(Object::Reference(id));
                    }
                    doc.objects.insert(
                        parent_id,
                        Object::Dictionary(dictionary! {
                            "FT" => "Btn",
                            "Ff" => FF_RADIO,
                            "T" => Object::string_literal(name.as_str()),
                            "Kids" => radio_kids,
                        }),
                    );
                    fields.push(Object::Reference(parent_id));
                }
            }
        }

        let content_id = page_content(&mut doc, &format!("{} p{}", label, index + 1));
        doc.objects.insert(
            page_id,
            Object::Dictionary(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Annots" => annots,
            }),
        );
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );

    let acroform_id = doc.add_object(dictionary! {
        "Fields" => fields,
        "DA" => Object::string_literal("/Helv 0 Tf 0 g"),
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
        "AcroForm" => acroform_id,
    });
    doc.trailer.set("Root", catalog_id);

    save(&mut doc)
}

/// A PDF with no form fields; page `n` carries the marker `<label> p<n>`
pub fn plain_pdf(label: &str, page_count: usize) -> Vec<u8> {
    build_form_pdf(label, &vec![Vec::new(); page_count])
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([30, 60, 90, 255]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

pub fn save(doc: &mut Document) -> Vec<u8> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Decoded content of every page, in page order
pub fn page_contents(doc: &Document) -> Vec<String> {
    doc.get_pages()
        .values()
        .map(|id| {
            let content = doc.get_page_content(*id).unwrap_or_default();
            String::from_utf8_lossy(&content).into_owned()
        })
        .collect()
}

/// Decoded `/AP /N` stream content of the first widget named `name`
pub fn text_appearance(doc: &Document, name: &str) -> Option<String> {
    let widget = formpack_core::acroform::list_widgets(doc)
        .into_iter()
        .find(|w| w.name == name)?;
    let ap = doc
        .get_object(widget.widget_id)
        .ok()?
        .as_dict()
        .ok()?
        .get(b"AP")
        .ok()?
        .as_dict()
        .ok()?;
    let stream_id = ap.get(b"N").ok()?.as_reference().ok()?;
    let stream = doc.get_object(stream_id).ok()?.as_stream().ok()?;
    let content = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());
    Some(String::from_utf8_lossy(&content).into_owned())
}

/// Whether a page draws an image XObject
pub fn page_has_image(doc: &Document, page_id: ObjectId) -> bool {
    doc.get_object(page_id)
        .and_then(Object::as_dict)
        .and_then(|page| page.get(b"Resources"))
        .and_then(Object::as_dict)
        .and_then(|resources| resources.get(b"XObject"))
        .and_then(Object::as_dict)
        .map(|xobjects| xobjects.has(b"Im0"))
        .unwrap_or(false)
}
