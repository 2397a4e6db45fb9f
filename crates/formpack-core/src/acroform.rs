//! AcroForm widget access using lopdf
//!
//! Finds the widget annotations on a page, resolves their fully qualified
//! field names and types, and writes text, checkbox and radio values.

use crate::error::FormPackError;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use serde::Serialize;

/// Field flag bit for radio buttons (bit 16)
const FF_RADIO: i64 = 1 << 15;
/// Field flag bit for push buttons (bit 17)
const FF_PUSHBUTTON: i64 = 1 << 16;
/// Guards `/Parent` walks against cyclic field trees
const MAX_FIELD_DEPTH: usize = 32;
/// Appearance size for a text widget without `/Rect`
const DEFAULT_WIDGET_WIDTH: f32 = 100.0;
const DEFAULT_WIDGET_HEIGHT: f32 = 14.0;
/// Font resource name used when no `/DA` names one
const DEFAULT_FONT: &[u8] = b"Helv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WidgetKind {
    Text,
    Checkbox,
    Radio,
    PushButton,
    Choice,
    Signature,
    Unknown,
}

/// One widget annotation and the field it belongs to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Widget {
    pub page: u32,
    #[serde(skip)]
    pub widget_id: ObjectId,
    #[serde(skip)]
    pub field_id: ObjectId,
    /// Fully qualified field name
    pub name: String,
    pub kind: WidgetKind,
    /// Normal appearance state names, for buttons
    pub states: Vec<String>,
}

impl Widget {
    /// Appearance state that means "checked"
    pub fn on_state(&self) -> &str {
        self.states
            .iter()
            .map(String::as_str)
            .find(|s| *s != "Off")
            .unwrap_or("Yes")
    }

    pub fn has_state(&self, label: &str) -> bool {
        self.states.iter().any(|s| s == label)
    }
}

/// Decode a PDF text string (UTF-16BE with BOM, else PDFDocEncoding as Latin-1)
pub fn decode_text(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

/// Encode a value as a PDF text string
pub fn encode_text(value: &str) -> Object {
    if value.is_ascii() {
        Object::String(value.as_bytes().to_vec(), StringFormat::Literal)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in value.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

/// Follow a reference to its object, leaving direct objects as they are
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn parent_id(dict: &Dictionary) -> Option<ObjectId> {
    dict.get(b"Parent").ok()?.as_reference().ok()
}

/// Look up an inheritable field attribute, walking up `/Parent`
fn inherited<'a>(doc: &'a Document, id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = id;
    for _ in 0..MAX_FIELD_DEPTH {
        let dict = doc.get_object(current).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return resolve(doc, value);
        }
        current = parent_id(dict)?;
    }
    None
}

/// Terminal field owning a widget and its fully qualified name
fn field_owner(doc: &Document, widget_id: ObjectId) -> Option<(ObjectId, String)> {
    let mut parts = Vec::new();
    let mut field_id = None;
    let mut current = Some(widget_id);

    for _ in 0..MAX_FIELD_DEPTH {
        let Some(id) = current else { break };
        let dict = doc.get_object(id).ok()?.as_dict().ok()?;
        if let Ok(Object::String(bytes, _)) = dict.get(b"T") {
            parts.push(decode_text(bytes));
            field_id.get_or_insert(id);
        }
        current = parent_id(dict);
    }

    let field_id = field_id?;
    parts.reverse();
    Some((field_id, parts.join(".")))
}

fn widget_kind(doc: &Document, widget_id: ObjectId) -> WidgetKind {
    let field_type = inherited(doc, widget_id, b"FT").and_then(|o| o.as_name().ok());
    let flags = inherited(doc, widget_id, b"Ff")
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(0);

    match field_type {
        Some(b"Tx") => WidgetKind::Text,
        Some(b"Ch") => WidgetKind::Choice,
        Some(b"Sig") => WidgetKind::Signature,
        Some(b"Btn") if flags & FF_PUSHBUTTON != 0 => WidgetKind::PushButton,
        Some(b"Btn") if flags & FF_RADIO != 0 => WidgetKind::Radio,
        Some(b"Btn") => WidgetKind::Checkbox,
        _ => WidgetKind::Unknown,
    }
}

/// Names of the widget's normal appearance states (`/AP /N` keys)
fn appearance_states(doc: &Document, widget: &Dictionary) -> Vec<String> {
    let normal = widget
        .get(b"AP")
        .ok()
        .and_then(|ap| resolve(doc, ap))
        .and_then(|ap| ap.as_dict().ok())
        .and_then(|ap| ap.get(b"N").ok())
        .and_then(|n| resolve(doc, n));

    match normal {
        Some(Object::Dictionary(states)) => states
            .iter()
            .map(|(name, _)| String::from_utf8_lossy(name).into_owned())
            .collect(),
        _ => Vec::new(),
    }
}

/// Widgets on one page, in `/Annots` order
pub fn page_widgets(doc: &Document, page: u32, page_id: ObjectId) -> Vec<Widget> {
    let annots = doc
        .get_object(page_id)
        .ok()
        .and_then(|p| p.as_dict().ok())
        .and_then(|p| p.get(b"Annots").ok())
        .and_then(|a| resolve(doc, a))
        .and_then(|a| a.as_array().ok());

    let Some(annots) = annots else {
        return Vec::new();
    };

    annots
        .iter()
        .filter_map(|annot| {
            // Widgets are indirect in every form we fill; inline ones cannot be written back
            let widget_id = annot.as_reference().ok()?;
            let dict = doc.get_object(widget_id).ok()?.as_dict().ok()?;
            let is_widget = dict
                .get(b"Subtype")
                .and_then(Object::as_name)
                .map(|s| s == b"Widget")
                .unwrap_or(false);
            if !is_widget {
                return None;
            }
            let (field_id, name) = field_owner(doc, widget_id)?;
            Some(Widget {
                page,
                widget_id,
                field_id,
                name,
                kind: widget_kind(doc, widget_id),
                states: appearance_states(doc, dict),
            })
        })
        .collect()
}

/// Every widget in the document, page by page
pub fn list_widgets(doc: &Document) -> Vec<Widget> {
    doc.get_pages()
        .into_iter()
        .flat_map(|(page, page_id)| page_widgets(doc, page, page_id))
        .collect()
}

/// Current value of a widget's field, as text
pub fn read_value(doc: &Document, widget: &Widget) -> Option<String> {
    match inherited(doc, widget.field_id, b"V")? {
        Object::String(bytes, _) => Some(decode_text(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

fn dict_mut(doc: &mut Document, id: ObjectId) -> Result<&mut Dictionary, FormPackError> {
    doc.get_object_mut(id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| FormPackError::OperationError(format!("Object {:?}: {}", id, e)))
}

/// Write a text value and replace the widget's normal appearance with one
/// drawing the new value.
pub fn set_text(doc: &mut Document, widget: &Widget, value: &str) -> Result<(), FormPackError> {
    dict_mut(doc, widget.field_id)?.set("V", encode_text(value));
    let appearance = text_appearance(doc, widget.widget_id, value);
    let appearance_id = doc.add_object(appearance);
    dict_mut(doc, widget.widget_id)?.set("AP", dictionary! { "N" => appearance_id });
    Ok(())
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Widget width and height from `/Rect`
fn widget_size(doc: &Document, widget_id: ObjectId) -> (f32, f32) {
    let rect: Vec<f32> = doc
        .get_object(widget_id)
        .ok()
        .and_then(|w| w.as_dict().ok())
        .and_then(|w| w.get(b"Rect").ok())
        .and_then(|r| resolve(doc, r))
        .and_then(|r| r.as_array().ok())
        .map(|r| r.iter().filter_map(number).collect())
        .unwrap_or_default();

    match rect.as_slice() {
        [x1, y1, x2, y2] => ((x2 - x1).abs(), (y2 - y1).abs()),
        _ => (DEFAULT_WIDGET_WIDTH, DEFAULT_WIDGET_HEIGHT),
    }
}

/// The AcroForm dictionary, inline or referenced from the catalog
fn acroform(doc: &Document) -> Option<&Dictionary> {
    let catalog = doc.get_object(catalog_id(doc).ok()?).ok()?.as_dict().ok()?;
    resolve(doc, catalog.get(b"AcroForm").ok()?)?.as_dict().ok()
}

/// Font resource name and size from the default appearance string (`/DA`).
///
/// The widget's own or inherited `/DA` wins over the AcroForm's. A size of
/// zero means auto-size and is returned as `None`.
fn default_appearance(doc: &Document, widget_id: ObjectId) -> (Vec<u8>, Option<f32>) {
    let da = inherited(doc, widget_id, b"DA")
        .or_else(|| acroform(doc)?.get(b"DA").ok())
        .and_then(|da| match da {
            Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        })
        .unwrap_or_default();

    let tokens: Vec<&str> = da.split_whitespace().collect();
    let tf = tokens.iter().position(|t| *t == "Tf");
    match tf {
        Some(i) if i >= 2 && tokens[i - 2].starts_with('/') => {
            let font = tokens[i - 2][1..].as_bytes().to_vec();
            let size = tokens[i - 1].parse::<f32>().ok().filter(|s| *s > 0.0);
            (font, size)
        }
        _ => (DEFAULT_FONT.to_vec(), None),
    }
}

/// Font object for the appearance resources: the AcroForm's `/DR` entry when
/// it has one, else standard Helvetica.
fn appearance_font(doc: &Document, font: &[u8]) -> Object {
    acroform(doc)
        .and_then(|form| form.get(b"DR").ok())
        .and_then(|dr| resolve(doc, dr))
        .and_then(|dr| dr.as_dict().ok())
        .and_then(|dr| dr.get(b"Font").ok())
        .and_then(|fonts| resolve(doc, fonts))
        .and_then(|fonts| fonts.as_dict().ok())
        .and_then(|fonts| fonts.get(font).ok())
        .cloned()
        .unwrap_or_else(|| {
            Object::Dictionary(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            })
        })
}

/// Escape a value for a PDF literal string in a single-byte font.
///
/// Latin-1 characters become octal escapes; anything wider becomes `?`.
fn escape_pdf_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            c if (c as u32) < 0x100 => out.push_str(&format!("\\{:03o}", c as u32)),
            _ => out.push('?'),
        }
    }
    out
}

/// Form XObject drawing `value` on one line, vertically centered
fn text_appearance(doc: &Document, widget_id: ObjectId, value: &str) -> Stream {
    let (width, height) = widget_size(doc, widget_id);
    let (font, size) = default_appearance(doc, widget_id);
    let font_size = size.unwrap_or_else(|| (height * 0.6).clamp(8.0, 14.0));
    let text_y = ((height - font_size) / 2.0).max(0.0) + font_size * 0.2;

    let content = format!(
        "/Tx BMC q BT /{} {:.1} Tf 0 g 2 {:.2} Td ({}) Tj ET Q EMC",
        String::from_utf8_lossy(&font),
        font_size,
        text_y,
        escape_pdf_string(value)
    );

    let resources = dictionary! {
        "Font" => Object::Dictionary(Dictionary::from_iter(vec![(
            font.clone(),
            appearance_font(doc, &font),
        )])),
    };
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Form",
        "BBox" => vec![0.into(), 0.into(), Object::Real(width), Object::Real(height)],
        "Resources" => resources,
    };
    Stream::new(dict, content.into_bytes())
}

/// Switch a checkbox widget on or off
pub fn set_checkbox(
    doc: &mut Document,
    widget: &Widget,
    checked: bool,
) -> Result<(), FormPackError> {
    let state = if checked { widget.on_state() } else { "Off" };
    let name = Object::Name(state.as_bytes().to_vec());
    dict_mut(doc, widget.field_id)?.set("V", name.clone());
    dict_mut(doc, widget.widget_id)?.set("AS", name);
    Ok(())
}

/// Select a radio option by its appearance state label.
///
/// Widgets sharing a field name may stand for different options; the widget
/// offering `label` among its states is switched on and the rest off.
/// Returns false, writing nothing, when no widget offers the label.
pub fn select_radio(
    doc: &mut Document,
    group: &[&Widget],
    label: &str,
) -> Result<bool, FormPackError> {
    if !group.iter().any(|w| w.has_state(label)) {
        return Ok(false);
    }

    let value = Object::Name(label.as_bytes().to_vec());
    for widget in group {
        let state = if widget.has_state(label) {
            value.clone()
        } else {
            Object::Name(b"Off".to_vec())
        };
        dict_mut(doc, widget.widget_id)?.set("AS", state);
        dict_mut(doc, widget.field_id)?.set("V", value.clone());
    }
    Ok(true)
}

/// Catalog object id from the trailer
pub(crate) fn catalog_id(doc: &Document) -> Result<ObjectId, FormPackError> {
    doc.trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| FormPackError::OperationError("No Root in trailer".into()))
}

/// Ask viewers to rebuild field appearances from their values
pub fn set_need_appearances(doc: &mut Document) -> Result<(), FormPackError> {
    let catalog_id = catalog_id(doc)?;
    let acroform = dict_mut(doc, catalog_id)?.get(b"AcroForm").ok().cloned();

    match acroform {
        Some(Object::Reference(id)) => {
            dict_mut(doc, id)?.set("NeedAppearances", Object::Boolean(true));
        }
        Some(Object::Dictionary(mut form)) => {
            form.set("NeedAppearances", Object::Boolean(true));
            dict_mut(doc, catalog_id)?.set("AcroForm", Object::Dictionary(form));
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One page with a text field, a checkbox and a two-widget radio group
    fn form_document() -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.new_object_id();

        let text_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "FT" => "Tx",
            "T" => Object::string_literal("Club Name"),
            "Rect" => vec![72.into(), 700.into(), 272.into(), 720.into()],
            "DA" => Object::string_literal("/Helv 10 Tf 0 g"),
            "P" => page_id,
        });
        let check_on = doc.add_object(lopdf::Stream::new(Dictionary::new(), Vec::new()));
        let check_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "FT" => "Btn",
            "T" => Object::string_literal("RCC"),
            "AP" => dictionary! {
                "N" => dictionary! { "On" => check_on, "Off" => check_on },
            },
        });

        let radio_parent = doc.new_object_id();
        let yes_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "Parent" => radio_parent,
            "AP" => dictionary! {
                "N" => dictionary! { "Yes" => check_on, "Off" => check_on },
            },
        });
        let no_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "Parent" => radio_parent,
            "AP" => dictionary! {
                "N" => dictionary! { "No" => check_on, "Off" => check_on },
            },
        });
        doc.objects.insert(
            radio_parent,
            Object::Dictionary(dictionary! {
                "FT" => "Btn",
                "Ff" => FF_RADIO,
                "T" => Object::string_literal("Pickup"),
                "Kids" => vec![yes_id.into(), no_id.into()],
            }),
        );

        doc.objects.insert(
            page_id,
            Object::Dictionary(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Annots" => vec![text_id.into(), check_id.into(), yes_id.into(), no_id.into()],
            }),
        );
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let acroform_id = doc.add_object(dictionary! {
            "Fields" => vec![text_id.into(), check_id.into(), radio_parent.into()],
        });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
            "AcroForm" => acroform_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    #[test]
    fn test_list_widgets_kinds_and_names() {
        let doc = form_document();
        let widgets = list_widgets(&doc);
        let summary: Vec<(&str, WidgetKind)> =
            widgets.iter().map(|w| (w.name.as_str(), w.kind)).collect();
        assert_eq!(
            summary,
            vec![
                ("Club Name", WidgetKind::Text),
                ("RCC", WidgetKind::Checkbox),
                ("Pickup", WidgetKind::Radio),
                ("Pickup", WidgetKind::Radio),
            ]
        );
        assert_eq!(widgets[1].on_state(), "On");
        assert_eq!(widgets[2].field_id, widgets[3].field_id);
    }

    #[test]
    fn test_set_text_round_trips() {
        let mut doc = form_document();
        let widgets = list_widgets(&doc);
        set_text(&mut doc, &widgets[0], "Échecs Club").unwrap();
        assert_eq!(read_value(&doc, &widgets[0]).as_deref(), Some("Échecs Club"));
    }

    fn normal_appearance(doc: &Document, widget: &Widget) -> (Dictionary, String) {
        let ap = doc
            .get_object(widget.widget_id)
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"AP")
            .unwrap()
            .as_dict()
            .unwrap();
        let stream_id = ap.get(b"N").unwrap().as_reference().unwrap();
        let stream = doc.get_object(stream_id).unwrap().as_stream().unwrap();
        (
            stream.dict.clone(),
            String::from_utf8_lossy(&stream.content).into_owned(),
        )
    }

    #[test]
    fn test_set_text_draws_value_appearance() {
        let mut doc = form_document();
        let widgets = list_widgets(&doc);
        set_text(&mut doc, &widgets[0], "Ski (Alpine) Club").unwrap();

        let (dict, content) = normal_appearance(&doc, &widgets[0]);
        assert_eq!(dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Form");
        let bbox: Vec<f32> = dict
            .get(b"BBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .filter_map(number)
            .collect();
        assert_eq!(bbox, vec![0.0, 0.0, 200.0, 20.0]);
        assert!(content.contains("/Helv 10.0 Tf"));
        assert!(content.contains("(Ski \\(Alpine\\) Club) Tj"));

        let fonts = dict
            .get(b"Resources")
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"Font")
            .unwrap()
            .as_dict()
            .unwrap();
        assert!(fonts.has(b"Helv"));
    }

    #[test]
    fn test_set_text_appearance_auto_size_without_rect() {
        let mut doc = form_document();
        let widgets = list_widgets(&doc);
        let dict = doc
            .get_object_mut(widgets[0].widget_id)
            .unwrap()
            .as_dict_mut()
            .unwrap();
        dict.remove(b"Rect");
        dict.remove(b"DA");

        set_text(&mut doc, &widgets[0], "Café 東").unwrap();
        let (_, content) = normal_appearance(&doc, &widgets[0]);
        // Auto size is 60% of the default 14pt height
        assert!(content.contains("/Helv 8.4 Tf"));
        assert!(content.contains("(Caf\\351 ?) Tj"));
    }

    #[test]
    fn test_set_checkbox_uses_widget_on_state() {
        let mut doc = form_document();
        let widgets = list_widgets(&doc);
        set_checkbox(&mut doc, &widgets[1], true).unwrap();
        assert_eq!(read_value(&doc, &widgets[1]).as_deref(), Some("On"));
        set_checkbox(&mut doc, &widgets[1], false).unwrap();
        assert_eq!(read_value(&doc, &widgets[1]).as_deref(), Some("Off"));
    }

    #[test]
    fn test_select_radio_by_label() {
        let mut doc = form_document();
        let widgets = list_widgets(&doc);
        let group = vec![&widgets[2], &widgets[3]];

        assert!(select_radio(&mut doc, &group, "No").unwrap());
        assert_eq!(read_value(&doc, &widgets[2]).as_deref(), Some("No"));
        let yes_as = doc
            .get_object(widgets[2].widget_id)
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"AS")
            .unwrap()
            .as_name()
            .unwrap()
            .to_vec();
        assert_eq!(yes_as, b"Off".to_vec());

        assert!(!select_radio(&mut doc, &group, "NA").unwrap());
        assert_eq!(read_value(&doc, &widgets[2]).as_deref(), Some("No"));
    }

    #[test]
    fn test_need_appearances_on_referenced_acroform() {
        let mut doc = form_document();
        set_need_appearances(&mut doc).unwrap();
        let catalog = doc.get_object(catalog_id(&doc).unwrap()).unwrap().as_dict().unwrap();
        let form_id = catalog.get(b"AcroForm").unwrap().as_reference().unwrap();
        let form = doc.get_object(form_id).unwrap().as_dict().unwrap();
        assert!(form.get(b"NeedAppearances").unwrap().as_bool().unwrap());
    }

    #[test]
    fn test_decode_text_utf16() {
        let encoded = encode_text("Café");
        if let Object::String(bytes, _) = encoded {
            assert_eq!(&bytes[..2], &[0xFE, 0xFF]);
            assert_eq!(decode_text(&bytes), "Café");
        } else {
            panic!("expected string");
        }
        assert_eq!(decode_text(b"plain"), "plain");
    }
}
