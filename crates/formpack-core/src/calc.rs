//! Derived fields and totals
//!
//! Turns collected form inputs into `FormRecord`s: auto-filled fields
//! (account number, department, business purpose), checkbox and radio
//! selections, line-item rows and section totals.
//!
//! Amounts are free text. Anything that does not parse as a finite number
//! counts as zero; no warning is raised.

use crate::collect::CollectedForms;
use crate::model::{
    format_date, AccountType, CoverSheet, EntityType, ExpenseType, FormKind, NonTravelExpense,
    Section, SharedContext, TravelExpense,
};
use crate::record::{row, FieldValue, FormRecord};
use serde::Serialize;
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

pub const DEFAULT_DEPARTMENT_PREFIX: &str = "Recreational Club Council";

/// Entered and computed totals may differ by rounding noise up to this much
const RECONCILE_TOLERANCE: f64 = 0.005;

/// A summed amount. Displays with exactly two decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize)]
pub struct Total(f64);

impl Total {
    pub const ZERO: Total = Total(0.0);

    pub fn new(value: f64) -> Self {
        Total(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Add for Total {
    type Output = Total;

    fn add(self, rhs: Total) -> Total {
        Total(self.0 + rhs.0)
    }
}

impl Sum for Total {
    fn sum<I: Iterator<Item = Total>>(iter: I) -> Total {
        iter.fold(Total::ZERO, Add::add)
    }
}

impl fmt::Display for Total {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Anything that rounds to zero cents prints without a sign
        let cents = (self.0 * 100.0).round();
        let value = if cents == 0.0 { 0.0 } else { self.0 };
        write!(f, "{:.2}", value)
    }
}

/// Parse an amount, treating anything unparseable as zero
pub fn parse_amount(text: &str) -> f64 {
    match text.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

/// Sum a sequence of amount strings
pub fn sum_amounts<'a, I>(amounts: I) -> Total
where
    I: IntoIterator<Item = &'a str>,
{
    amounts.into_iter().map(|a| Total(parse_amount(a))).sum()
}

/// Amount and G/U (gift/unallowable) subtotals of one section
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SectionTotals {
    pub amount: Total,
    pub gu: Total,
}

/// All travel form subtotals
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TravelTotals {
    pub incidentals: SectionTotals,
    pub transportation: SectionTotals,
    pub lodging: Total,
    pub meals: SectionTotals,
    /// Incidentals + transportation + lodging + meals amounts
    pub grand: Total,
}

impl TravelTotals {
    pub fn compute(travel: &TravelExpense) -> Self {
        let incidentals = SectionTotals {
            amount: sum_amounts(travel.incidentals.iter().map(|i| i.amount.as_str())),
            gu: sum_amounts(travel.incidentals.iter().map(|i| i.gu_amount.as_str())),
        };
        let transportation = SectionTotals {
            amount: sum_amounts(travel.transportation.iter().map(|t| t.amount.as_str())),
            gu: sum_amounts(travel.transportation.iter().map(|t| t.gu_amount.as_str())),
        };
        let lodging = sum_amounts(travel.lodging.iter().map(|l| l.amount.as_str()));
        let meals = SectionTotals {
            amount: travel
                .meals
                .iter()
                .map(|m| sum_amounts([m.breakfast.as_str(), m.lunch.as_str(), m.dinner.as_str()]))
                .sum(),
            gu: sum_amounts(travel.meals.iter().map(|m| m.gu.as_str())),
        };

        Self {
            incidentals,
            transportation,
            lodging,
            meals,
            grand: grand_total(incidentals.amount, transportation.amount, lodging, meals.amount),
        }
    }
}

/// Travel grand total from the four section amount totals
pub fn grand_total(
    incidentals: Total,
    transportation: Total,
    lodging: Total,
    meals: Total,
) -> Total {
    incidentals + transportation + lodging + meals
}

pub fn cover_sheet_total(cover: &CoverSheet) -> Total {
    sum_amounts(cover.reimbursement_items.iter().map(|i| i.amount.as_str()))
}

pub fn non_travel_totals(form: &NonTravelExpense) -> SectionTotals {
    SectionTotals {
        amount: sum_amounts(form.items.iter().map(|i| i.amount.as_str())),
        gu: sum_amounts(form.items.iter().map(|i| i.gu_amount.as_str())),
    }
}

/// Department string: "<prefix> <club name>", trimmed
pub fn department(prefix: &str, club_name: &str) -> String {
    format!("{} {}", prefix, club_name).trim().to_string()
}

/// Shared account number when the cover sheet supplied one, else the manual entry
pub fn resolve_account(ctx: &SharedContext, manual: &str) -> String {
    if ctx.account_number.is_empty() {
        manual.to_string()
    } else {
        ctx.account_number.clone()
    }
}

/// Builds form records against one shared context
pub struct Calculator<'a> {
    ctx: &'a SharedContext,
    department_prefix: &'a str,
}

impl<'a> Calculator<'a> {
    pub fn new(ctx: &'a SharedContext, department_prefix: &'a str) -> Self {
        Self {
            ctx,
            department_prefix,
        }
    }

    fn department(&self) -> String {
        department(self.department_prefix, &self.ctx.club_name)
    }

    fn business_purpose(&self) -> String {
        self.ctx.short_title.clone()
    }

    pub fn cover_sheet(&self, cover: &CoverSheet) -> FormRecord {
        let mut record = FormRecord::new(FormKind::CoverSheet);

        record.set_text("club_name", &cover.club_name);
        record.set_text("date_submitted", format_date(cover.date_submitted));
        record.set_text("submitter_name", &cover.submitter_name);
        record.set_text("submitter_phone", &cover.submitter_phone);
        record.set_text("submitter_email", &cover.submitter_email);
        record.set_text("preferred_date", format_date(cover.preferred_date));
        record.set_text("account_number", cover.account_type.account_number());
        record.set_text("short_title", &cover.short_title);
        record.set_text("total_amount", &cover.total_amount);
        record.set_text("expense_purpose", &cover.expense_purpose);
        record.set_text("payable_to", &cover.payable_to);
        record.set_text("student_id", &cover.student_id);
        record.set_text("relationship", &cover.relationship);
        record.set_text("other_entity", &cover.other_entity);
        let (line_1, line_2) = cover.address.lines();
        record.set_text("address_line_1", line_1);
        record.set_text("address_line_2", line_2);
        record.set_text("contact_number", &cover.contact_number);
        record.set_text("contact_email", &cover.contact_email);

        let account = cover.account_type;
        record.set_checkbox("account_credit_union", account == AccountType::CreditUnion);
        record.set_checkbox("account_rcc", account == AccountType::Rcc);
        record.set_checkbox("account_gift", account == AccountType::Gift);

        // The template has one Reimbursement box per account branch; only the
        // box of the selected branch is touched.
        let reimbursement = cover.expense_type == ExpenseType::Reimbursement;
        if account == AccountType::CreditUnion {
            record.set_checkbox("expense_reimbursement", reimbursement);
        } else {
            record.set_checkbox("expense_reimbursement_rcc_gift", reimbursement);
        }
        record.set_checkbox("expense_pay_ahead", cover.expense_type == ExpenseType::PayAhead);
        record.set_checkbox(
            "expense_purchase_order",
            cover.expense_type == ExpenseType::PurchaseOrder,
        );
        record.set_checkbox(
            "expense_requisition",
            cover.expense_type == ExpenseType::Requisition,
        );
        record.set_checkbox(
            "expense_credit_card",
            cover.expense_type == ExpenseType::CreditCard,
        );

        record.set_checkbox("entity_student", cover.entity_type == EntityType::Student);
        record.set_checkbox("entity_company", cover.entity_type == EntityType::Company);

        record.set(
            "pickup_check",
            FieldValue::Radio(cover.pickup_check.export_label().to_string()),
        );

        if !cover.reimbursement_items.is_empty() {
            for item in &cover.reimbursement_items {
                record.push_row(
                    Section::Reimbursement,
                    row([
                        ("description", item.description.clone()),
                        ("quantity", item.quantity.clone()),
                        ("amount", item.amount.clone()),
                    ]),
                );
            }
            record.set_text("total_reimbursement", cover_sheet_total(cover).to_string());
        }

        record
    }

    pub fn non_travel(&self, form: &NonTravelExpense) -> FormRecord {
        let mut record = FormRecord::new(FormKind::NonTravelExpense);

        record.set_text("department", self.department());
        record.set_text("account", resolve_account(self.ctx, &form.account));
        record.set_text("check_request", &form.check_request);
        record.set_text("business_purpose", self.business_purpose());
        record.set_text(
            "reimbursee_signature_date",
            format_date(form.reimbursee_signature_date),
        );

        for item in &form.items {
            record.push_row(
                Section::Expense,
                row([
                    ("date", format_date(item.date)),
                    ("description", item.description.clone()),
                    ("quantity", item.quantity.clone()),
                    ("amount", item.amount.clone()),
                    ("gu_amount", item.gu_amount.clone()),
                ]),
            );
        }

        let totals = non_travel_totals(form);
        record.set_text("total_amount", totals.amount.to_string());
        record.set_text("total_gu_amount", totals.gu.to_string());

        record
    }

    pub fn travel(&self, form: &TravelExpense) -> FormRecord {
        let mut record = FormRecord::new(FormKind::TravelExpense);

        record.set_text("reimbursee_name", &form.reimbursee_name);
        record.set_text("department", self.department());
        record.set_text("account", resolve_account(self.ctx, &form.account));
        record.set_text("check_request", &form.check_request);
        record.set_text("destination", &form.destination);
        record.set_text("period_covered", &form.period_covered);
        record.set_text("business_purpose", self.business_purpose());
        record.set_text(
            "reimbursee_signature_date",
            format_date(form.reimbursee_signature_date),
        );

        for item in &form.incidentals {
            record.push_row(
                Section::Incidentals,
                row([
                    ("date", format_date(item.date)),
                    ("description", item.description.clone()),
                    ("amount", item.amount.clone()),
                    ("gu_amount", item.gu_amount.clone()),
                ]),
            );
        }
        for item in &form.transportation {
            record.push_row(
                Section::Transportation,
                row([
                    ("kind", item.kind.clone()),
                    ("company", item.company.clone()),
                    ("date", format_date(item.date)),
                    ("amount", item.amount.clone()),
                    ("gu_amount", item.gu_amount.clone()),
                ]),
            );
        }
        for item in &form.lodging {
            record.push_row(
                Section::Lodging,
                row([
                    ("hotel", item.hotel.clone()),
                    ("from_date", format_date(item.from_date)),
                    ("to_date", format_date(item.to_date)),
                    ("days", item.days.clone()),
                    ("rate", item.rate.clone()),
                    ("amount", item.amount.clone()),
                ]),
            );
        }
        for item in &form.meals {
            record.push_row(
                Section::Meals,
                row([
                    ("date", format_date(item.date)),
                    ("breakfast", item.breakfast.clone()),
                    ("lunch", item.lunch.clone()),
                    ("dinner", item.dinner.clone()),
                    ("gu", item.gu.clone()),
                ]),
            );
        }

        let totals = TravelTotals::compute(form);
        record.set_text("incidentals_total", totals.incidentals.amount.to_string());
        record.set_text("incidentals_gu_total", totals.incidentals.gu.to_string());
        record.set_text(
            "transportation_total",
            totals.transportation.amount.to_string(),
        );
        record.set_text(
            "transportation_gu_total",
            totals.transportation.gu.to_string(),
        );
        record.set_text("lodging_total", totals.lodging.to_string());
        record.set_text("meals_total", totals.meals.amount.to_string());
        record.set_text("meals_gu_total", totals.meals.gu.to_string());
        record.set_text("total_expenditure", totals.grand.to_string());

        record
    }
}

/// Records for every selected form, in assembly order
pub fn build_records(collected: &CollectedForms, department_prefix: &str) -> Vec<FormRecord> {
    let calc = Calculator::new(&collected.shared, department_prefix);
    let mut records = Vec::new();

    if let Some(cover) = &collected.cover_sheet {
        records.push(calc.cover_sheet(cover));
    }
    if let Some(form) = &collected.non_travel {
        records.push(calc.non_travel(form));
    }
    if let Some(form) = &collected.travel {
        records.push(calc.travel(form));
    }

    records
}

/// The cover sheet's typed total disagrees with every computed form total
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalMismatch {
    pub entered: Total,
    pub computed: Vec<(FormKind, Total)>,
}

/// Compare a typed total against computed totals.
///
/// Returns a mismatch only when the typed value parses and none of the
/// computed totals is within half a cent of it. Nothing is corrected.
pub fn reconcile(entered: &str, computed: &[(FormKind, Total)]) -> Option<TotalMismatch> {
    let cleaned: String = entered
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    let entered = cleaned.parse::<f64>().ok().filter(|v| v.is_finite())?;

    if computed.is_empty() {
        return None;
    }
    if computed
        .iter()
        .any(|(_, total)| (total.value() - entered).abs() < RECONCILE_TOLERANCE)
    {
        return None;
    }

    Some(TotalMismatch {
        entered: Total(entered),
        computed: computed.to_vec(),
    })
}

/// Every total computed for a session, for reporting
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PackageTotals {
    pub cover_reimbursement: Option<Total>,
    pub non_travel: Option<SectionTotals>,
    pub travel: Option<TravelTotals>,
    pub mismatch: Option<TotalMismatch>,
}

impl PackageTotals {
    pub fn compute(collected: &CollectedForms) -> Self {
        let cover_reimbursement = collected
            .cover_sheet
            .as_ref()
            .filter(|c| !c.reimbursement_items.is_empty())
            .map(cover_sheet_total);
        let non_travel = collected.non_travel.as_ref().map(non_travel_totals);
        let travel = collected.travel.as_ref().map(TravelTotals::compute);

        let mut computed = Vec::new();
        if let Some(total) = cover_reimbursement {
            computed.push((FormKind::CoverSheet, total));
        }
        if let Some(totals) = non_travel {
            computed.push((FormKind::NonTravelExpense, totals.amount));
        }
        if let Some(totals) = travel {
            computed.push((FormKind::TravelExpense, totals.grand));
        }

        let mismatch = collected
            .cover_sheet
            .as_ref()
            .and_then(|c| reconcile(&c.total_amount, &computed));
        if let Some(m) = &mismatch {
            tracing::warn!(
                "Entered total {} does not match any computed total {:?}",
                m.entered,
                m.computed
            );
        }

        Self {
            cover_reimbursement,
            non_travel,
            travel,
            mismatch,
        }
    }
}
