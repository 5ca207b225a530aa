use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::device::DataUri;
use crate::domain::{Expense, ExpenseCategory, ExpenseStatus, Member, NewExpense, Team};
use crate::errors::{CommitError, StoreError};
use crate::notify::{fan_out, Notification};
use crate::storage::Filter;
use crate::wizard::field::{format_amount, non_blank, parse_date, parse_decimal};
use crate::wizard::{
    make_choice_validator, ChoiceMapper, CommitCheckpoint, CommitReport, FieldDescriptor,
    FieldKind, StepForm, StepKind, ValidationError, Validator, WizardFlow,
};

use super::{data_uri_validator, entity_choices, Services};

pub const MAX_ITEMS: usize = 20;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseItemDraft {
    pub description: String,
    pub amount: Option<f64>,
    pub date: Option<NaiveDate>,
    pub category: Option<ExpenseCategory>,
    pub receipt: Option<DataUri>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseDraft {
    pub item_count: usize,
    pub items: Vec<ExpenseItemDraft>,
    pub team_id: Option<Uuid>,
}

impl ExpenseDraft {
    pub fn with_items(count: usize) -> Self {
        let mut draft = Self::default();
        draft.resize(count);
        draft
    }

    /// Grows or shrinks the item list; existing items keep their values.
    pub fn resize(&mut self, count: usize) {
        self.item_count = count;
        self.items.resize_with(count, ExpenseItemDraft::default);
    }

    pub fn total(&self) -> f64 {
        self.items.iter().filter_map(|item| item.amount).sum()
    }

    /// One payload per item, all carrying the same submitter.
    pub fn to_payloads(&self, submitted_by: Uuid) -> Result<Vec<NewExpense>, ValidationError> {
        if self.items.is_empty() {
            return Err(ValidationError::new("Add at least one expense"));
        }
        self.items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let position = index + 1;
                let missing =
                    |what: &str| ValidationError::new(format!("Item {}: {} is required", position, what));
                Ok(NewExpense {
                    submitted_by,
                    description: non_blank(&item.description)
                        .ok_or_else(|| missing("description"))?,
                    amount: item
                        .amount
                        .filter(|amount| *amount > 0.0)
                        .ok_or_else(|| missing("a positive amount"))?,
                    spent_on: item.date.ok_or_else(|| missing("date"))?,
                    category: item.category.ok_or_else(|| missing("category"))?,
                    receipt: item.receipt.clone().map(DataUri::into_string),
                    team_id: self.team_id,
                    status: ExpenseStatus::Submitted,
                })
            })
            .collect()
    }
}

pub fn item_key(index: usize, field: &str) -> String {
    format!("items[{}].{}", index, field)
}

fn parse_item_key(key: &str) -> Option<(usize, &str)> {
    let rest = key.strip_prefix("items[")?;
    let (index, field) = rest.split_once("].")?;
    Some((index.parse().ok()?, field))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpenseStep {
    Overview,
    Items,
    Receipts,
    Review,
}

impl StepKind<ExpenseDraft> for ExpenseStep {
    fn all() -> &'static [Self] {
        &[
            ExpenseStep::Overview,
            ExpenseStep::Items,
            ExpenseStep::Receipts,
            ExpenseStep::Review,
        ]
    }

    fn key(&self) -> &'static str {
        match self {
            ExpenseStep::Overview => "overview",
            ExpenseStep::Items => "items",
            ExpenseStep::Receipts => "receipts",
            ExpenseStep::Review => "review",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ExpenseStep::Overview => "Overview",
            ExpenseStep::Items => "Expenses",
            ExpenseStep::Receipts => "Receipts",
            ExpenseStep::Review => "Review",
        }
    }

    fn icon(&self) -> &'static str {
        match self {
            ExpenseStep::Overview => "🧾",
            ExpenseStep::Items => "💰",
            ExpenseStep::Receipts => "📷",
            ExpenseStep::Review => "✔",
        }
    }
}

/// Submits one or more expenses on behalf of the acting member.
pub struct ExpenseWizard {
    services: Services,
    actor: Uuid,
    team_choices: ChoiceMapper<Uuid>,
    category_choices: ChoiceMapper<ExpenseCategory>,
}

impl ExpenseWizard {
    pub fn new(services: Services, actor: Uuid, teams: Vec<Team>) -> Self {
        let category_choices = ChoiceMapper::from_pairs(
            ExpenseCategory::ALL
                .iter()
                .map(|category| (category.label().to_string(), *category))
                .collect(),
        );
        Self {
            services,
            actor,
            team_choices: entity_choices(&teams),
            category_choices,
        }
    }

    pub async fn load(services: Services, actor: Uuid) -> Result<Self, StoreError> {
        let teams = services.repo.list::<Team>(&Filter::All).await?;
        Ok(Self::new(services, actor, teams))
    }

    fn item_count_validator() -> Validator {
        Validator::Custom(Arc::new(|input| {
            match input.trim().parse::<usize>() {
                Ok(count) if (1..=MAX_ITEMS).contains(&count) => Ok(count.to_string()),
                _ => Err(format!("Enter a number between 1 and {}", MAX_ITEMS)),
            }
        }))
    }
}

impl StepForm for ExpenseWizard {
    type Draft = ExpenseDraft;
    type Step = ExpenseStep;

    fn initial_draft(&self) -> ExpenseDraft {
        ExpenseDraft::with_items(1)
    }

    fn fields(&self, step: ExpenseStep, draft: &ExpenseDraft) -> Vec<FieldDescriptor> {
        match step {
            ExpenseStep::Overview => vec![
                FieldDescriptor::new(
                    "item_count",
                    "Number of receipts",
                    FieldKind::Integer,
                    Self::item_count_validator(),
                ),
                FieldDescriptor::new(
                    "team_id",
                    "Team",
                    FieldKind::Choice(self.team_choices.options()),
                    make_choice_validator(&self.team_choices, "team"),
                )
                .with_optional()
                .with_help("Leave empty for club-wide expenses"),
            ],
            ExpenseStep::Items => (0..draft.items.len())
                .flat_map(|index| {
                    let position = index + 1;
                    [
                        FieldDescriptor::new(
                            item_key(index, "description"),
                            format!("Item {}: description", position),
                            FieldKind::Text,
                            Validator::NonEmpty,
                        ),
                        FieldDescriptor::new(
                            item_key(index, "amount"),
                            format!("Item {}: amount (CHF)", position),
                            FieldKind::Decimal,
                            Validator::PositiveNumber,
                        ),
                        FieldDescriptor::new(
                            item_key(index, "date"),
                            format!("Item {}: date", position),
                            FieldKind::Date,
                            Validator::None,
                        ),
                        FieldDescriptor::new(
                            item_key(index, "category"),
                            format!("Item {}: category", position),
                            FieldKind::Choice(self.category_choices.options()),
                            make_choice_validator(&self.category_choices, "category"),
                        ),
                    ]
                })
                .collect(),
            ExpenseStep::Receipts => (0..draft.items.len())
                .map(|index| {
                    FieldDescriptor::new(
                        item_key(index, "receipt"),
                        format!("Item {}: receipt", index + 1),
                        FieldKind::Attachment,
                        data_uri_validator(),
                    )
                    .with_optional()
                    .with_help("Attach a scan or capture it with the camera")
                })
                .collect(),
            ExpenseStep::Review => Vec::new(),
        }
    }

    fn read(&self, _step: ExpenseStep, draft: &ExpenseDraft, key: &str) -> Option<String> {
        match key {
            "item_count" => Some(draft.item_count.to_string()),
            "team_id" => draft
                .team_id
                .and_then(|id| self.team_choices.display_for_value(&id)),
            _ => {
                let (index, field) = parse_item_key(key)?;
                let item = draft.items.get(index)?;
                match field {
                    "description" => Some(item.description.clone()),
                    "amount" => item.amount.map(format_amount),
                    "date" => item.date.map(|date| date.to_string()),
                    "category" => item.category.map(|category| category.label().to_string()),
                    "receipt" => item.receipt.as_ref().map(ToString::to_string),
                    _ => None,
                }
            }
        }
    }

    fn bind(
        &self,
        _step: ExpenseStep,
        draft: &mut ExpenseDraft,
        key: &str,
        value: &str,
    ) -> Result<(), ValidationError> {
        match key {
            "item_count" => {
                let count = value
                    .parse::<usize>()
                    .map_err(|_| ValidationError::new("Enter a whole number"))?;
                draft.resize(count);
            }
            "team_id" => draft.team_id = self.team_choices.value_for(value).copied(),
            _ => {
                let unknown = || ValidationError::new(format!("Unknown field `{}`", key));
                let (index, field) = parse_item_key(key).ok_or_else(unknown)?;
                let item = draft.items.get_mut(index).ok_or_else(unknown)?;
                match field {
                    "description" => item.description = value.to_string(),
                    "amount" => item.amount = parse_decimal(value),
                    "date" => item.date = parse_date(value),
                    "category" => item.category = self.category_choices.value_for(value).copied(),
                    "receipt" => item.receipt = DataUri::parse(value),
                    _ => return Err(unknown()),
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl WizardFlow for ExpenseWizard {
    type Output = Vec<Expense>;

    fn collection(&self) -> &'static str {
        "expenses"
    }

    fn headline(&self, expenses: &Vec<Expense>) -> String {
        let total: f64 = expenses.iter().map(|expense| expense.amount).sum();
        format!(
            "{} expense{} submitted (CHF {:.2})",
            expenses.len(),
            if expenses.len() == 1 { "" } else { "s" },
            total
        )
    }

    async fn commit(
        &self,
        draft: &ExpenseDraft,
        checkpoint: &mut CommitCheckpoint,
    ) -> Result<CommitReport<Vec<Expense>>, CommitError> {
        let payloads = draft.to_payloads(self.actor)?;
        let submitter: Member = self.services.resolve(self.actor).await?;
        let team: Option<Team> = match draft.team_id {
            Some(id) => Some(self.services.resolve(id).await?),
            None => None,
        };

        let repo = &self.services.repo;
        let mut expenses = Vec::with_capacity(payloads.len());
        for (index, payload) in payloads.iter().enumerate() {
            let key = format!("expense:{}", index);
            let expense: Expense = checkpoint
                .persist(&key, || repo.create::<Expense>(payload))
                .await?;
            expenses.push(expense);
        }

        let mut batch = Vec::new();
        if let Some(treasurer) = &self.services.treasurer_email {
            let lines: Vec<String> = expenses
                .iter()
                .map(|expense| {
                    format!(
                        "- {} {}: CHF {:.2} ({})",
                        expense.spent_on,
                        expense.description,
                        expense.amount,
                        expense.category.label()
                    )
                })
                .collect();
            batch.push(Notification::new(
                treasurer.clone(),
                format!("New expenses from {}", submitter.full_name()),
                format!(
                    "{} submitted {} expense(s){}:\n\n{}\n\nTotal: CHF {:.2}",
                    submitter.full_name(),
                    expenses.len(),
                    team.as_ref()
                        .map(|team| format!(" for {}", team.name))
                        .unwrap_or_default(),
                    lines.join("\n"),
                    draft.total()
                ),
            ));
        } else {
            tracing::warn!("no treasurer email configured; expenses submitted without notice");
        }

        let notifications = fan_out(self.services.notifier.as_ref(), batch).await;
        tracing::info!(submitted_by = %submitter.id, count = expenses.len(), "expenses submitted");
        Ok(CommitReport::new(expenses, notifications))
    }
}
