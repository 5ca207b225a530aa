use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::*;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExpenseCategory {
    Material,
    Travel,
    Catering,
    Fees,
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 5] = [
        ExpenseCategory::Material,
        ExpenseCategory::Travel,
        ExpenseCategory::Catering,
        ExpenseCategory::Fees,
        ExpenseCategory::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ExpenseCategory::Material => "Material",
            ExpenseCategory::Travel => "Travel",
            ExpenseCategory::Catering => "Catering",
            ExpenseCategory::Fees => "Fees",
            ExpenseCategory::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ExpenseStatus {
    #[default]
    Submitted,
    Approved,
    Rejected,
    Paid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewExpense {
    pub submitted_by: Uuid,
    pub description: String,
    pub amount: f64,
    pub spent_on: NaiveDate,
    pub category: ExpenseCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<Uuid>,
    #[serde(default)]
    pub status: ExpenseStatus,
}

/// A reimbursement claim for a single receipt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expense {
    pub id: Uuid,
    pub submitted_by: Uuid,
    pub description: String,
    pub amount: f64,
    pub spent_on: NaiveDate,
    pub category: ExpenseCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<Uuid>,
    #[serde(default)]
    pub status: ExpenseStatus,
}

impl Identifiable for Expense {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for Expense {
    fn display_label(&self) -> String {
        format!(
            "{} {} – {:.2} ({})",
            self.spent_on,
            self.description,
            self.amount,
            self.category.label()
        )
    }
}

impl Persisted for Expense {
    const COLLECTION: &'static str = "expenses";
    const NOUN: &'static str = "expense";
    type Payload = NewExpense;
}
