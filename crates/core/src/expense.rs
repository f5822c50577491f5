use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpenseId(pub i64);

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Marketing,
    #[serde(rename = "Office Supplies")]
    OfficeSupplies,
    Travel,
    Meals,
    Software,
    Education,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Marketing,
        Category::OfficeSupplies,
        Category::Travel,
        Category::Meals,
        Category::Software,
        Category::Education,
        Category::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Marketing => "Marketing",
            Category::OfficeSupplies => "Office Supplies",
            Category::Travel => "Travel",
            Category::Meals => "Meals",
            Category::Software => "Software",
            Category::Education => "Education",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValidationError::UnknownCategory(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Deductibility {
    #[serde(rename = "Fully Deductible")]
    Fully,
    #[serde(rename = "Partially Deductible")]
    Partially,
    #[serde(rename = "Not Deductible")]
    Not,
}

impl Deductibility {
    pub const ALL: [Deductibility; 3] = [
        Deductibility::Fully,
        Deductibility::Partially,
        Deductibility::Not,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Deductibility::Fully => "Fully Deductible",
            Deductibility::Partially => "Partially Deductible",
            Deductibility::Not => "Not Deductible",
        }
    }
}

impl fmt::Display for Deductibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Deductibility {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Deductibility::ALL
            .into_iter()
            .find(|d| d.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValidationError::UnknownDeductibility(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Vendor must not be empty")]
    EmptyVendor,
    #[error("Invalid amount: '{0}'")]
    InvalidAmount(String),
    #[error("Amount must not be negative: {0}")]
    NegativeAmount(Money),
    #[error("Amount {0} exceeds the maximum of 99999999.99")]
    AmountTooLarge(Money),
    #[error("Unknown category: '{0}'")]
    UnknownCategory(String),
    #[error("Unknown deductibility: '{0}'")]
    UnknownDeductibility(String),
}

/// A persisted expense record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: ExpenseId,
    pub date: NaiveDate,
    pub vendor: String,
    pub amount: Money,
    pub description: String,
    pub category: Option<Category>,
    pub deductibility: Option<Deductibility>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    /// Category absent means the record is still waiting on the classifier.
    pub fn is_pending_classification(&self) -> bool {
        self.category.is_none()
    }

    pub fn needs_classification(&self) -> bool {
        self.category.is_none() || self.deductibility.is_none()
    }
}

/// Raw expense fields as they arrive from a form, API body or spreadsheet row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnvalidatedExpense {
    pub date: String,
    pub vendor: String,
    pub amount: String,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub deductibility: Option<String>,
}

/// Expense fields that passed validation and are ready for the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    pub date: NaiveDate,
    pub vendor: String,
    pub amount: Money,
    pub description: String,
    pub category: Option<Category>,
    pub deductibility: Option<Deductibility>,
}

impl NewExpense {
    pub fn validate(raw: UnvalidatedExpense) -> Result<NewExpense, ValidationError> {
        let date = parse_date(&raw.date)?;

        let vendor = raw.vendor.trim();
        if vendor.is_empty() {
            return Err(ValidationError::EmptyVendor);
        }

        let amount: Money = raw
            .amount
            .parse()
            .map_err(|_| ValidationError::InvalidAmount(raw.amount.clone()))?;
        check_amount(amount)?;

        let category = non_blank(raw.category.as_deref())
            .map(str::parse::<Category>)
            .transpose()?;
        let deductibility = non_blank(raw.deductibility.as_deref())
            .map(str::parse::<Deductibility>)
            .transpose()?;

        Ok(NewExpense {
            date,
            vendor: vendor.to_string(),
            amount,
            description: raw.description,
            category,
            deductibility,
        })
    }
}

/// Partial update. For `category` and `deductibility` an absent key keeps the
/// current value, an explicit `null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpensePatch {
    #[serde(
        default,
        deserialize_with = "patch_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<Option<Category>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub deductibility: Option<Option<Deductibility>>,
}

impl ExpensePatch {
    pub fn classification(
        category: Option<Category>,
        deductibility: Option<Deductibility>,
    ) -> Self {
        ExpensePatch {
            category: category.map(Some),
            deductibility: deductibility.map(Some),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == ExpensePatch::default()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(vendor) = &self.vendor {
            if vendor.trim().is_empty() {
                return Err(ValidationError::EmptyVendor);
            }
        }
        if let Some(amount) = self.amount {
            check_amount(amount)?;
        }
        Ok(())
    }

    /// Merge the provided fields onto `expense`. Identity and timestamps are
    /// left to the caller.
    pub fn apply_to(self, expense: &mut Expense) {
        if let Some(date) = self.date {
            expense.date = date;
        }
        if let Some(vendor) = self.vendor {
            expense.vendor = vendor.trim().to_string();
        }
        if let Some(amount) = self.amount {
            expense.amount = amount;
        }
        if let Some(description) = self.description {
            expense.description = description;
        }
        if let Some(category) = self.category {
            expense.category = category;
        }
        if let Some(deductibility) = self.deductibility {
            expense.deductibility = deductibility;
        }
    }
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Same `YYYY-MM-DD` rule as creation; `null` leaves the date alone.
fn patch_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|s| parse_date(&s).map_err(serde::de::Error::custom))
        .transpose()
}

fn check_amount(amount: Money) -> Result<(), ValidationError> {
    if amount.is_negative() {
        return Err(ValidationError::NegativeAmount(amount));
    }
    if amount > Money::max_amount() {
        return Err(ValidationError::AmountTooLarge(amount));
    }
    Ok(())
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, ValidationError> {
    let s = s.trim();
    if s.len() != 10 {
        return Err(ValidationError::InvalidDate(s.to_string()));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate(s.to_string()))
}
