//! Logical field to template field name tables
//!
//! One table per template, per page. Scalar bindings map a logical key to a
//! template field name (a key may feed several fields). Section bindings map
//! a column key to a name prefix; row `n` (1-based) writes `<prefix><n>`.
//!
//! The template names are the exact names baked into the finance office PDF
//! forms, typos included.

use crate::model::{FormKind, Section};
use crate::record::{FieldValue, FormRecord};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldBinding {
    pub logical: &'static str,
    pub template: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct SectionBinding {
    pub section: Section,
    /// `template` is the field name prefix
    pub columns: &'static [FieldBinding],
}

#[derive(Debug, Clone, Copy)]
pub struct PageMapping {
    /// 1-based page number
    pub page: u32,
    pub fields: &'static [FieldBinding],
    pub sections: &'static [SectionBinding],
}

#[derive(Debug, Clone, Copy)]
pub struct TemplateMapping {
    pub form: FormKind,
    pub pages: &'static [PageMapping],
}

const fn bind(logical: &'static str, template: &'static str) -> FieldBinding {
    FieldBinding { logical, template }
}

// ============================================================
// Expense Cover Sheet
// ============================================================

const COVER_PAGE_1: &[FieldBinding] = &[
    bind("club_name", "Club Name"),
    bind("date_submitted", "Date Submitted"),
    bind("submitter_name", "Submitter Name"),
    bind("submitter_phone", "Submitter Phone"),
    bind("submitter_email", "Submitter Email"),
    bind("preferred_date", "Preferred Date to be Completed not guaranteed"),
    bind("account_number", "Account Number"),
    bind("short_title", "Short Title"),
    bind("total_amount", "Total Dollar Amount"),
    bind(
        "expense_purpose",
        "Expense Purpose and Summary who what where when why 1",
    ),
    bind("payable_to", "Payable To"),
    bind("student_id", "Student ID"),
    bind("relationship", "Family Member of Student Relationship"),
    bind("other_entity", "Other"),
    bind(
        "address_line_1",
        "Address Street Address AptSte  City State Zip Code 1",
    ),
    bind(
        "address_line_2",
        "Address Street Address AptSte  City State Zip Code 2",
    ),
    bind("contact_number", "Contact Number"),
    bind("contact_email", "Contact Email"),
    // Checkboxes
    bind("account_credit_union", "Credit Union"),
    bind("account_rcc", "RCC"),
    bind("account_gift", "Gift"),
    bind("expense_reimbursement", "Reimbursement"),
    bind("expense_reimbursement_rcc_gift", "Reimbursement_2"),
    bind("expense_pay_ahead", "Pay Ahead"),
    bind("expense_purchase_order", "Purchase Order"),
    bind("expense_requisition", "Requisition"),
    bind("expense_credit_card", "Credit Card"),
    bind("entity_student", "Is the above entity a"),
    bind("entity_company", "Company  Organization"),
    // Radio group
    bind("pickup_check", "If RCC or Gift Reimbursement pick up check"),
];

const COVER_PAGE_2: &[FieldBinding] = &[bind(
    "total_reimbursement",
    "Total Item AmountTotal Reimbursement Amount",
)];

const COVER_REIMBURSEMENT: &[SectionBinding] = &[SectionBinding {
    section: Section::Reimbursement,
    columns: &[
        bind("description", "Description"),
        bind("quantity", "Quantity"),
        bind("amount", "Total Item Amount"),
    ],
}];

pub static COVER_SHEET: TemplateMapping = TemplateMapping {
    form: FormKind::CoverSheet,
    pages: &[
        PageMapping {
            page: 1,
            fields: COVER_PAGE_1,
            sections: &[],
        },
        PageMapping {
            page: 2,
            fields: COVER_PAGE_2,
            sections: COVER_REIMBURSEMENT,
        },
    ],
};

// ============================================================
// Non-Travel Expense Report
// ============================================================

pub static NON_TRAVEL: TemplateMapping = TemplateMapping {
    form: FormKind::NonTravelExpense,
    pages: &[PageMapping {
        page: 1,
        fields: &[
            bind("department", "nter-dept"),
            bind("account", "nter-acct"),
            bind("check_request", "nter-crq-no"),
            bind("business_purpose", "nter-purpose"),
            bind("total_amount", "tot-amt"),
            bind("reimbursee_signature_date", "Text3"),
        ],
        sections: &[SectionBinding {
            section: Section::Expense,
            columns: &[
                bind("date", "nter-dt"),
                bind("description", "nter-desc"),
                bind("quantity", "nter-qty"),
                bind("amount", "nter-amt"),
                bind("gu_amount", "nter-unall-amt"),
            ],
        }],
    }],
};

// ============================================================
// Travel Expense Report
// ============================================================

pub static TRAVEL: TemplateMapping = TemplateMapping {
    form: FormKind::TravelExpense,
    pages: &[PageMapping {
        page: 1,
        fields: &[
            bind("reimbursee_name", "ter-reimburseename"),
            bind("department", "ter-dept"),
            bind("account", "ter-acct"),
            bind("check_request", "ter-cr"),
            bind("destination", "ter-dest"),
            bind("period_covered", "ter-travel-pd"),
            bind("business_purpose", "ter-prupose"),
            bind("incidentals_total", "tot-inc"),
            bind("incidentals_total", "ter-inc-total"),
            bind("incidentals_gu_total", "tot-inc-gu"),
            bind("transportation_total", "tot-tr"),
            bind("transportation_total", "ter-tr-total"),
            bind("transportation_gu_total", "tot-tr-gu"),
            bind("lodging_total", "tot-hotel"),
            bind("meals_total", "tot-meals-temp"),
            bind("meals_total", "ter-meals-total"),
            bind("meals_gu_total", "tot-meals-gu"),
            bind("total_expenditure", "tot-travel-reimb"),
        ],
        sections: &[
            SectionBinding {
                section: Section::Incidentals,
                columns: &[
                    bind("date", "ter-inc-dt"),
                    bind("description", "ter-inc-desc"),
                    bind("amount", "ter-inc-amt"),
                    bind("gu_amount", "ter-inc-gu-amt"),
                ],
            },
            SectionBinding {
                section: Section::Transportation,
                columns: &[
                    bind("kind", "ter-tr-type"),
                    bind("company", "ter-tr-co"),
                    bind("date", "ter-tr-dt"),
                    bind("amount", "ter-tr-amt"),
                    bind("gu_amount", "ter-tr-gu-amt"),
                ],
            },
            SectionBinding {
                section: Section::Lodging,
                columns: &[
                    bind("hotel", "ter-flr-hotel"),
                    bind("from_date", "ter-flr-dt"),
                    bind("to_date", "ter-flr-todt"),
                    bind("days", "ter-flr-days"),
                    bind("rate", "ter-flr-rate"),
                    bind("amount", "ter-flr-amt"),
                ],
            },
            SectionBinding {
                section: Section::Meals,
                columns: &[
                    bind("date", "ter-meals-dt"),
                    bind("breakfast", "ter-ml-bf"),
                    bind("lunch", "ter-ml-lun"),
                    bind("dinner", "ter-ml-dinr"),
                    bind("gu", "ter-ml-gu"),
                ],
            },
        ],
    }],
};

pub fn mapping_for(form: FormKind) -> &'static TemplateMapping {
    match form {
        FormKind::CoverSheet => &COVER_SHEET,
        FormKind::NonTravelExpense => &NON_TRAVEL,
        FormKind::TravelExpense => &TRAVEL,
    }
}

/// Template field name of one section cell
pub fn row_field_name(prefix: &str, index: usize) -> String {
    format!("{}{}", prefix, index + 1)
}

impl PageMapping {
    /// Resolve a record against this page: template field name to value.
    ///
    /// Logical fields with no binding are left out, and so are section rows
    /// past the section's capacity.
    pub fn resolve(&self, record: &FormRecord) -> HashMap<String, FieldValue> {
        let mut writes = HashMap::new();

        for binding in self.fields {
            if let Some(value) = record.get(binding.logical) {
                writes.insert(binding.template.to_string(), value.clone());
            }
        }

        for section in self.sections {
            let rows = record.rows(section.section);
            for (index, row) in rows.iter().take(section.section.capacity()).enumerate() {
                for column in section.columns {
                    if let Some(cell) = row.get(column.logical) {
                        writes.insert(
                            row_field_name(column.template, index),
                            FieldValue::Text(cell.clone()),
                        );
                    }
                }
            }
        }

        writes
    }
}

impl TemplateMapping {
    /// Logical keys with at least one binding on any page
    pub fn bound_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.pages
            .iter()
            .flat_map(|page| page.fields.iter().map(|b| b.logical))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::{Calculator, DEFAULT_DEPARTMENT_PREFIX};
    use crate::model::{
        CoverSheet, ExpenseItem, IncidentalItem, LodgingItem, MealItem, NonTravelExpense,
        ReimbursementItem, SharedContext, TransportationItem, TravelExpense,
    };
    use crate::record::row;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    /// Logical fields computed on purpose without a template field
    const UNBOUND: &[(FormKind, &str)] = &[
        (FormKind::NonTravelExpense, "total_gu_amount"),
        (FormKind::TravelExpense, "reimbursee_signature_date"),
    ];

    fn full_records() -> Vec<FormRecord> {
        let cover = CoverSheet {
            reimbursement_items: vec![ReimbursementItem::default()],
            ..Default::default()
        };
        let ctx = SharedContext::from_cover_sheet(&cover);
        let calc = Calculator::new(&ctx, DEFAULT_DEPARTMENT_PREFIX);
        vec![
            calc.cover_sheet(&cover),
            calc.non_travel(&NonTravelExpense {
                items: vec![ExpenseItem::default()],
                ..Default::default()
            }),
            calc.travel(&TravelExpense {
                incidentals: vec![IncidentalItem::default()],
                transportation: vec![TransportationItem::default()],
                lodging: vec![LodgingItem::default()],
                meals: vec![MealItem::default()],
                ..Default::default()
            }),
        ]
    }

    #[test]
    fn test_every_computed_field_is_bound() {
        for record in full_records() {
            let mapping = mapping_for(record.form);
            let bound: HashSet<&str> = mapping.bound_keys().collect();
            for key in record.fields.keys() {
                let expected_unbound = UNBOUND.contains(&(record.form, *key));
                assert_eq!(
                    bound.contains(key),
                    !expected_unbound,
                    "{:?} field '{}'",
                    record.form,
                    key
                );
            }
        }
    }

    #[test]
    fn test_every_row_column_is_bound() {
        for record in full_records() {
            let mapping = mapping_for(record.form);
            for (section, rows) in &record.sections {
                let binding = mapping
                    .pages
                    .iter()
                    .flat_map(|p| p.sections.iter())
                    .find(|s| s.section == *section)
                    .expect("section has a binding");
                let columns: HashSet<&str> = binding.columns.iter().map(|c| c.logical).collect();
                for key in rows[0].keys() {
                    assert!(columns.contains(key), "{:?} column '{}'", section, key);
                }
            }
        }
    }

    #[test]
    fn test_sections_live_on_their_form() {
        for form in FormKind::ALL {
            for page in mapping_for(form).pages {
                for section in page.sections {
                    assert_eq!(section.section.form(), form);
                }
            }
        }
    }

    #[test]
    fn test_template_names_unique_per_page() {
        for form in FormKind::ALL {
            for page in mapping_for(form).pages {
                let mut seen = HashSet::new();
                for binding in page.fields {
                    assert!(
                        seen.insert(binding.template),
                        "duplicate template field {}",
                        binding.template
                    );
                }
            }
        }
    }

    #[test]
    fn test_row_field_name_is_one_based() {
        assert_eq!(row_field_name("nter-dt", 0), "nter-dt1");
        assert_eq!(row_field_name("Total Item Amount", 9), "Total Item Amount10");
    }

    #[test]
    fn test_one_logical_field_feeds_two_template_fields() {
        let mut record = FormRecord::new(FormKind::TravelExpense);
        record.set_text("incidentals_total", "12.00");
        let writes = TRAVEL.pages[0].resolve(&record);
        assert_eq!(writes["tot-inc"], FieldValue::text("12.00"));
        assert_eq!(writes["ter-inc-total"], FieldValue::text("12.00"));
        assert_eq!(writes.len(), 2);
    }

    #[test]
    fn test_resolve_drops_rows_past_capacity() {
        let mut record = FormRecord::new(FormKind::TravelExpense);
        for i in 0..5 {
            record.push_row(Section::Lodging, row([("hotel", format!("Hotel {}", i + 1))]));
        }
        let writes = TRAVEL.pages[0].resolve(&record);
        assert_eq!(writes["ter-flr-hotel1"], FieldValue::text("Hotel 1"));
        assert_eq!(writes["ter-flr-hotel3"], FieldValue::text("Hotel 3"));
        assert!(!writes.contains_key("ter-flr-hotel4"));
        assert!(!writes.contains_key("ter-flr-hotel5"));
    }

    #[test]
    fn test_resolve_ignores_unknown_logical_fields() {
        let mut record = FormRecord::new(FormKind::NonTravelExpense);
        record.set_text("not_a_field", "value");
        record.set_text("check_request", "CR-7");
        let writes = NON_TRAVEL.pages[0].resolve(&record);
        assert_eq!(writes.len(), 1);
        assert_eq!(writes["nter-crq-no"], FieldValue::text("CR-7"));
    }
}
