//! Form input types
//!
//! These are the typed values collected for the three finance forms, the
//! closed enumerations offered by the form choices, and the context shared
//! between forms within one session.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The logical forms, declared in package assembly order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FormKind {
    CoverSheet,
    NonTravelExpense,
    TravelExpense,
}

impl FormKind {
    pub const ALL: [FormKind; 3] = [
        FormKind::CoverSheet,
        FormKind::NonTravelExpense,
        FormKind::TravelExpense,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            FormKind::CoverSheet => "Expense Cover Sheet",
            FormKind::NonTravelExpense => "Non-Travel Expense Report",
            FormKind::TravelExpense => "Travel Expense Report",
        }
    }
}

/// Expense account type selected on the cover sheet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    #[default]
    #[serde(rename = "Credit Union")]
    CreditUnion,
    #[serde(rename = "RCC")]
    Rcc,
    #[serde(rename = "Gift")]
    Gift,
}

impl AccountType {
    pub const ALL: [AccountType; 3] = [
        AccountType::CreditUnion,
        AccountType::Rcc,
        AccountType::Gift,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AccountType::CreditUnion => "Credit Union",
            AccountType::Rcc => "RCC",
            AccountType::Gift => "Gift",
        }
    }

    /// Fixed account number for this account type
    pub fn account_number(&self) -> &'static str {
        match self {
            AccountType::CreditUnion => "1233",
            AccountType::Rcc => "1222",
            AccountType::Gift => "1244",
        }
    }

    pub fn is_rcc_or_gift(&self) -> bool {
        matches!(self, AccountType::Rcc | AccountType::Gift)
    }
}

/// How the expense is paid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpenseType {
    #[default]
    Reimbursement,
    #[serde(rename = "Pay Ahead")]
    PayAhead,
    #[serde(rename = "Purchase Order")]
    PurchaseOrder,
    Requisition,
    #[serde(rename = "Credit Card")]
    CreditCard,
}

impl ExpenseType {
    /// Whether this expense type is offered for the given account type.
    ///
    /// Credit Union accounts offer Reimbursement and Pay Ahead; RCC and Gift
    /// accounts offer Reimbursement, Purchase Order, Requisition and Credit Card.
    pub fn allowed_for(&self, account: AccountType) -> bool {
        match self {
            ExpenseType::Reimbursement => true,
            ExpenseType::PayAhead => account == AccountType::CreditUnion,
            ExpenseType::PurchaseOrder | ExpenseType::Requisition | ExpenseType::CreditCard => {
                account.is_rcc_or_gift()
            }
        }
    }
}

/// Kind of payee named on the cover sheet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    #[default]
    Student,
    #[serde(rename = "Company / Organization")]
    Company,
    #[serde(rename = "Family Member of Student")]
    FamilyMember,
    Other,
}

/// Answer to "If RCC or Gift Reimbursement, pick up check?"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PickupCheck {
    Yes,
    No,
    #[default]
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl PickupCheck {
    /// Appearance state name used by the template's radio widgets
    pub fn export_label(&self) -> &'static str {
        match self {
            PickupCheck::Yes => "Yes",
            PickupCheck::No => "No",
            PickupCheck::NotApplicable => "NA",
        }
    }
}

/// Payee address, either typed out or picked from the address book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayeeAddress {
    Preset {
        preset: String,
    },
    Lines {
        #[serde(default)]
        line_1: String,
        #[serde(default)]
        line_2: String,
    },
}

impl Default for PayeeAddress {
    fn default() -> Self {
        PayeeAddress::Lines {
            line_1: String::new(),
            line_2: String::new(),
        }
    }
}

impl PayeeAddress {
    /// The two address lines. An unresolved preset contributes its key as line 1.
    pub fn lines(&self) -> (&str, &str) {
        match self {
            PayeeAddress::Preset { preset } => (preset.as_str(), ""),
            PayeeAddress::Lines { line_1, line_2 } => (line_1.as_str(), line_2.as_str()),
        }
    }
}

/// Repeating line-item sections across the three forms
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Section {
    Reimbursement,
    Expense,
    Incidentals,
    Transportation,
    Lodging,
    Meals,
}

impl Section {
    /// Maximum number of rows the template has room for
    pub fn capacity(&self) -> usize {
        match self {
            Section::Reimbursement => 10,
            Section::Expense => 16,
            Section::Incidentals => 4,
            Section::Transportation => 3,
            Section::Lodging => 3,
            Section::Meals => 4,
        }
    }

    pub fn form(&self) -> FormKind {
        match self {
            Section::Reimbursement => FormKind::CoverSheet,
            Section::Expense => FormKind::NonTravelExpense,
            Section::Incidentals | Section::Transportation | Section::Lodging | Section::Meals => {
                FormKind::TravelExpense
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReimbursementItem {
    pub description: String,
    pub quantity: String,
    pub amount: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpenseItem {
    pub date: Option<NaiveDate>,
    pub description: String,
    pub quantity: String,
    pub amount: String,
    pub gu_amount: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncidentalItem {
    pub date: Option<NaiveDate>,
    pub description: String,
    pub amount: String,
    pub gu_amount: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportationItem {
    /// Mode of transport (airfare, rental car, ...)
    pub kind: String,
    pub company: String,
    pub date: Option<NaiveDate>,
    pub amount: String,
    pub gu_amount: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodgingItem {
    pub hotel: String,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub days: String,
    pub rate: String,
    pub amount: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MealItem {
    pub date: Option<NaiveDate>,
    pub breakfast: String,
    pub lunch: String,
    pub dinner: String,
    pub gu: String,
}

/// Form 1: Expense Cover Sheet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverSheet {
    pub club_name: String,
    pub date_submitted: Option<NaiveDate>,
    pub submitter_name: String,
    pub submitter_phone: String,
    pub submitter_email: String,
    pub preferred_date: Option<NaiveDate>,
    pub short_title: String,
    /// User-entered total, written as typed
    pub total_amount: String,
    pub account_type: AccountType,
    pub expense_type: ExpenseType,
    pub pickup_check: PickupCheck,
    pub expense_purpose: String,
    pub payable_to: String,
    pub entity_type: EntityType,
    pub student_id: String,
    pub relationship: String,
    pub other_entity: String,
    pub address: PayeeAddress,
    pub contact_number: String,
    pub contact_email: String,
    pub reimbursement_items: Vec<ReimbursementItem>,
}

/// Form 2: Non-Travel Expense Report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NonTravelExpense {
    /// Manually entered account, used only when no cover sheet supplies one
    pub account: String,
    pub check_request: String,
    pub items: Vec<ExpenseItem>,
    pub reimbursee_signature_date: Option<NaiveDate>,
}

/// Form 3: Travel Expense Report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TravelExpense {
    pub reimbursee_name: String,
    /// Manually entered account, used only when no cover sheet supplies one
    pub account: String,
    pub check_request: String,
    pub destination: String,
    /// Free text, e.g. "01/01/2025 - 01/05/2025"
    pub period_covered: String,
    pub incidentals: Vec<IncidentalItem>,
    pub transportation: Vec<TransportationItem>,
    pub lodging: Vec<LodgingItem>,
    pub meals: Vec<MealItem>,
    pub reimbursee_signature_date: Option<NaiveDate>,
}

/// Values filled on the cover sheet and reused, read-only, by the other forms
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SharedContext {
    pub account_type: Option<AccountType>,
    pub account_number: String,
    pub club_name: String,
    pub short_title: String,
}

impl SharedContext {
    pub fn from_cover_sheet(cover: &CoverSheet) -> Self {
        Self {
            account_type: Some(cover.account_type),
            account_number: cover.account_type.account_number().to_string(),
            club_name: cover.club_name.clone(),
            short_title: cover.short_title.clone(),
        }
    }
}

/// Render an optional date the way the templates expect it
pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
