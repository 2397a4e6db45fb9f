//! PDF merge
//!
//! Page-append concatenation of several documents into one, keeping each
//! source's page order and its form fields.

use crate::acroform::catalog_id;
use crate::error::FormPackError;
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_PAGE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Merge documents into one, in the given order
///
/// The algorithm:
/// 1. If empty, return error
/// 2. If single document, return it as-is
/// 3. Use the first document as the destination
/// 4. For each source document:
///    a. Push inherited page attributes down onto its pages
///    b. Offset its object IDs past the destination's to avoid conflicts
///    c. Import all objects with remapped IDs
///    d. Append its pages and AcroForm fields to the destination lists
/// 5. Rebuild the destination page tree and AcroForm, drop unreachable objects
pub fn merge_documents(documents: Vec<Document>) -> Result<Document, FormPackError> {
    let mut documents = documents.into_iter();
    let Some(mut dest) = documents.next() else {
        return Err(FormPackError::OperationError("No documents to merge".into()));
    };

    let rest: Vec<Document> = documents.collect();
    if rest.is_empty() {
        return Ok(dest);
    }

    let mut dest_page_refs = get_page_references(&dest);
    push_down_inherited_attributes(&mut dest, &dest_page_refs);
    let mut field_refs = acroform_fields(&dest);
    let mut form_defaults = acroform_dict(&dest).unwrap_or_else(Dictionary::new);
    let mut dest_max_id = dest.max_id;

    for mut source in rest {
        let source_pages = get_page_references(&source);
        push_down_inherited_attributes(&mut source, &source_pages);
        let source_fields = acroform_fields(&source);
        let source_form = acroform_dict(&source);

        let id_offset = dest_max_id;

        for (old_id, object) in std::mem::take(&mut source.objects) {
            let new_id = (old_id.0 + id_offset, old_id.1);
            dest.objects.insert(new_id, remap_object_refs(object, id_offset));
        }

        dest_page_refs.extend(source_pages.iter().map(|id| (id.0 + id_offset, id.1)));
        field_refs.extend(source_fields.iter().map(|id| (id.0 + id_offset, id.1)));

        // Default appearance and resources come from the first form that has them
        if let Some(form) = source_form {
            for key in [b"DA".as_slice(), b"DR".as_slice()] {
                if !form_defaults.has(key) {
                    if let Ok(value) = form.get(key) {
                        let value = remap_object_refs(value.clone(), id_offset);
                        form_defaults.set(key.to_vec(), value);
                    }
                }
            }
        }

        dest_max_id = (source.max_id + id_offset).max(dest_max_id);
    }

    dest.max_id = dest_max_id;
    update_page_tree(&mut dest, &dest_page_refs)?;
    update_acroform(&mut dest, field_refs, form_defaults)?;
    dest.prune_objects();

    Ok(dest)
}

/// Get all page object references from a document, in page order
fn get_page_references(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().values().copied().collect()
}

/// Recursively remap object references in an object
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            remap_dict(&mut dict, offset);
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            remap_dict(&mut stream.dict, offset);
            Object::Stream(stream)
        }
        other => other,
    }
}

fn remap_dict(dict: &mut Dictionary, offset: u32) {
    for (_, value) in dict.iter_mut() {
        *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
    }
}

/// Copy attributes a page inherits from its ancestors onto the page itself,
/// so it can be re-parented without losing them.
fn push_down_inherited_attributes(doc: &mut Document, pages: &[ObjectId]) {
    for &page_id in pages {
        let mut inherited = Vec::new();
        if let Ok(page) = doc.get_object(page_id).and_then(Object::as_dict) {
            for key in INHERITABLE_PAGE_KEYS {
                if page.has(key) {
                    continue;
                }
                if let Some(value) = find_inherited(doc, page, key) {
                    inherited.push((key.to_vec(), value));
                }
            }
        }

        if inherited.is_empty() {
            continue;
        }
        if let Ok(page) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
            for (key, value) in inherited {
                page.set(key, value);
            }
        }
    }
}

fn find_inherited(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok()?;
    for _ in 0..32 {
        let node = doc.get_object(parent).and_then(Object::as_dict).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
    None
}

/// The document's AcroForm dictionary, resolved
fn acroform_dict(doc: &Document) -> Option<Dictionary> {
    let catalog = doc.get_object(catalog_id(doc).ok()?).and_then(Object::as_dict).ok()?;
    match catalog.get(b"AcroForm").ok()? {
        Object::Reference(id) => doc.get_object(*id).and_then(Object::as_dict).ok().cloned(),
        Object::Dictionary(dict) => Some(dict.clone()),
        _ => None,
    }
}

/// Top-level field references of the document's AcroForm
fn acroform_fields(doc: &Document) -> Vec<ObjectId> {
    let Some(form) = acroform_dict(doc) else {
        return Vec::new();
    };
    let fields = match form.get(b"Fields") {
        Ok(Object::Reference(id)) => doc.get_object(*id).and_then(Object::as_array).ok(),
        Ok(Object::Array(arr)) => Some(arr),
        _ => None,
    };
    fields
        .map(|arr| arr.iter().filter_map(|o| o.as_reference().ok()).collect())
        .unwrap_or_default()
}

/// Point the destination AcroForm at every merged field
fn update_acroform(
    doc: &mut Document,
    field_refs: Vec<ObjectId>,
    mut form: Dictionary,
) -> Result<(), FormPackError> {
    if field_refs.is_empty() {
        return Ok(());
    }

    form.set(
        "Fields",
        Object::Array(field_refs.into_iter().map(Object::Reference).collect()),
    );
    form.set("NeedAppearances", Object::Boolean(true));

    let form_id = doc.add_object(Object::Dictionary(form));
    let catalog_id = catalog_id(doc)?;
    doc.get_object_mut(catalog_id)
        .and_then(Object::as_dict_mut)
        .map_err(|_| FormPackError::OperationError("Invalid catalog".into()))?
        .set("AcroForm", Object::Reference(form_id));

    Ok(())
}

/// Update the page tree in the destination document with new page references
fn update_page_tree(doc: &mut Document, page_refs: &[ObjectId]) -> Result<(), FormPackError> {
    let catalog_id = catalog_id(doc)?;

    let catalog = doc
        .objects
        .get(&catalog_id)
        .ok_or_else(|| FormPackError::OperationError("Catalog not found".into()))?
        .as_dict()
        .map_err(|_| FormPackError::OperationError("Invalid catalog".into()))?;

    let pages_id = catalog
        .get(b"Pages")
        .map_err(|_| FormPackError::OperationError("No Pages in catalog".into()))?
        .as_reference()
        .map_err(|_| FormPackError::OperationError("Pages is not a reference".into()))?;

    if let Some(Object::Dictionary(ref mut pages_dict)) = doc.objects.get_mut(&pages_id) {
        let kids = page_refs
            .iter()
            .map(|&id| Object::Reference(id))
            .collect::<Vec<_>>();
        pages_dict.set("Kids", Object::Array(kids));
        pages_dict.set("Count", Object::Integer(page_refs.len() as i64));
    } else {
        return Err(FormPackError::OperationError(
            "Invalid pages dictionary".into(),
        ));
    }

    for page_id in page_refs {
        if let Some(Object::Dictionary(page)) = doc.objects.get_mut(page_id) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    Ok(())
}
