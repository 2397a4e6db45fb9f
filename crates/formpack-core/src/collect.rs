//! Session collection
//!
//! A `FormSession` is what the user typed: any subset of the three forms plus
//! the attachment list. Collecting it normalizes the inputs the way the entry
//! form constrains them (row caps, expense types per account branch, detail
//! fields per entity type, address presets) and derives the shared context.

use crate::error::FormPackError;
use crate::model::{
    CoverSheet, EntityType, ExpenseType, FormKind, NonTravelExpense, PayeeAddress,
    PickupCheck, Section, SharedContext, TravelExpense,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormSession {
    pub cover_sheet: Option<CoverSheet>,
    pub non_travel: Option<NonTravelExpense>,
    pub travel: Option<TravelExpense>,
    /// Supporting documents, in upload order
    pub attachments: Vec<PathBuf>,
}

impl FormSession {
    pub fn from_json(json: &str) -> Result<Self, FormPackError> {
        serde_json::from_str(json).map_err(|e| FormPackError::SerializationError(e.to_string()))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, FormPackError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Selected forms in assembly order
    pub fn selected_forms(&self) -> Vec<FormKind> {
        let mut forms = Vec::new();
        if self.cover_sheet.is_some() {
            forms.push(FormKind::CoverSheet);
        }
        if self.non_travel.is_some() {
            forms.push(FormKind::NonTravelExpense);
        }
        if self.travel.is_some() {
            forms.push(FormKind::TravelExpense);
        }
        forms
    }

    /// Normalize the inputs and derive the shared context
    pub fn collect(&self, address_book: &BTreeMap<String, String>) -> CollectedForms {
        let cover_sheet = self
            .cover_sheet
            .clone()
            .map(|cover| normalize_cover_sheet(cover, address_book));
        let shared = cover_sheet
            .as_ref()
            .map(SharedContext::from_cover_sheet)
            .unwrap_or_default();

        let non_travel = self.non_travel.clone().map(|mut form| {
            cap_rows(&mut form.items, Section::Expense);
            form
        });
        let travel = self.travel.clone().map(|mut form| {
            cap_rows(&mut form.incidentals, Section::Incidentals);
            cap_rows(&mut form.transportation, Section::Transportation);
            cap_rows(&mut form.lodging, Section::Lodging);
            cap_rows(&mut form.meals, Section::Meals);
            form
        });

        CollectedForms {
            shared,
            cover_sheet,
            non_travel,
            travel,
        }
    }
}

/// Normalized form inputs, ready for calculation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectedForms {
    pub shared: SharedContext,
    pub cover_sheet: Option<CoverSheet>,
    pub non_travel: Option<NonTravelExpense>,
    pub travel: Option<TravelExpense>,
}

impl CollectedForms {
    pub fn is_empty(&self) -> bool {
        self.cover_sheet.is_none() && self.non_travel.is_none() && self.travel.is_none()
    }
}

/// Keep only as many rows as the section has room for
pub fn cap_rows<T>(rows: &mut Vec<T>, section: Section) {
    let capacity = section.capacity();
    if rows.len() > capacity {
        debug!(
            "{:?}: keeping {} of {} rows",
            section,
            capacity,
            rows.len()
        );
        rows.truncate(capacity);
    }
}

fn normalize_cover_sheet(
    mut cover: CoverSheet,
    address_book: &BTreeMap<String, String>,
) -> CoverSheet {
    cap_rows(&mut cover.reimbursement_items, Section::Reimbursement);

    if !cover.expense_type.allowed_for(cover.account_type) {
        debug!(
            "{:?} is not offered for {}, using Reimbursement",
            cover.expense_type,
            cover.account_type.label()
        );
        cover.expense_type = ExpenseType::Reimbursement;
    }

    // Only asked for RCC/Gift reimbursements
    let asks_pickup =
        cover.account_type.is_rcc_or_gift() && cover.expense_type == ExpenseType::Reimbursement;
    if !asks_pickup {
        cover.pickup_check = PickupCheck::NotApplicable;
    }

    if cover.entity_type != EntityType::Student {
        cover.student_id.clear();
    }
    if cover.entity_type != EntityType::FamilyMember {
        cover.relationship.clear();
    }
    if cover.entity_type != EntityType::Other {
        cover.other_entity.clear();
    }

    if let PayeeAddress::Preset { preset } = &cover.address {
        let line_1 = match address_book.get(preset) {
            Some(address) => address.clone(),
            None => {
                debug!("Address preset '{}' not in address book", preset);
                preset.clone()
            }
        };
        cover.address = PayeeAddress::Lines {
            line_1,
            line_2: String::new(),
        };
    }

    cover
}
