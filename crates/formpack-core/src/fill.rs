//! Template filling
//!
//! Applies a `FormRecord` to a freshly loaded template through the form's
//! mapping table. Template fields the table does not name are left alone;
//! record values with no matching template field are dropped.

use crate::acroform::{self, Widget, WidgetKind};
use crate::error::FormPackError;
use crate::mapping::mapping_for;
use crate::record::{FieldValue, FormRecord};
use lopdf::Document;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Load a template and fill it with a record
pub fn fill_template(template: &[u8], record: &FormRecord) -> Result<Document, FormPackError> {
    let mut doc =
        Document::load_mem(template).map_err(|e| FormPackError::ParseError(e.to_string()))?;
    fill_document(&mut doc, record)?;
    Ok(doc)
}

/// Fill an already loaded template in place. Returns the number of widgets written.
pub fn fill_document(doc: &mut Document, record: &FormRecord) -> Result<usize, FormPackError> {
    let mapping = mapping_for(record.form);
    let pages = doc.get_pages();
    let mut written = 0;

    for page_mapping in mapping.pages {
        let Some(&page_id) = pages.get(&page_mapping.page) else {
            debug!(
                "{:?}: template has no page {}",
                record.form, page_mapping.page
            );
            continue;
        };

        let writes = page_mapping.resolve(record);
        if writes.is_empty() {
            continue;
        }

        let widgets = acroform::page_widgets(doc, page_mapping.page, page_id);
        let mut matched: HashSet<&str> = HashSet::new();
        let mut radio_groups: BTreeMap<&str, Vec<&Widget>> = BTreeMap::new();

        for widget in &widgets {
            let Some(value) = writes.get(&widget.name) else {
                continue;
            };
            matched.insert(widget.name.as_str());

            match (value, widget.kind) {
                (FieldValue::Text(text), WidgetKind::Text | WidgetKind::Choice) => {
                    acroform::set_text(doc, widget, text)?;
                    written += 1;
                }
                (FieldValue::Checkbox(checked), WidgetKind::Checkbox | WidgetKind::Radio) => {
                    acroform::set_checkbox(doc, widget, *checked)?;
                    written += 1;
                }
                (FieldValue::Radio(_), WidgetKind::Radio | WidgetKind::Checkbox) => {
                    radio_groups
                        .entry(widget.name.as_str())
                        .or_default()
                        .push(widget);
                }
                (value, kind) => {
                    debug!(
                        "{:?}: '{}' is a {:?} field, skipping {:?}",
                        record.form, widget.name, kind, value
                    );
                }
            }
        }

        for (name, group) in radio_groups {
            let Some(FieldValue::Radio(label)) = writes.get(name) else {
                continue;
            };
            if acroform::select_radio(doc, &group, label)? {
                written += group.len();
            } else {
                debug!(
                    "{:?}: no '{}' widget offers option '{}'",
                    record.form, name, label
                );
            }
        }

        for name in writes.keys() {
            if !matched.contains(name.as_str()) {
                debug!(
                    "{:?}: page {} has no field named '{}'",
                    record.form, page_mapping.page, name
                );
            }
        }
    }

    acroform::set_need_appearances(doc)?;
    debug!("{:?}: wrote {} widgets", record.form, written);
    Ok(written)
}

/// Field name to current value for every widget that has one
pub fn field_values(doc: &Document) -> BTreeMap<String, String> {
    acroform::list_widgets(doc)
        .iter()
        .filter_map(|w| acroform::read_value(doc, w).map(|v| (w.name.clone(), v)))
        .collect()
}
