use serde::{Deserialize, Serialize, Serializer};

use super::expense::{Deductibility, Expense};
use super::money::Money;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_expenses: Money,
    pub deductible_amount: Money,
    pub categorized_count: usize,
    /// Share of expenses that carry a category, as a rounded percentage.
    #[serde(rename = "aiAccuracy", serialize_with = "as_percent")]
    pub categorized_percent: u32,
}

fn as_percent<S: Serializer>(value: &u32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{value}%"))
}

pub fn dashboard_stats(expenses: &[Expense]) -> DashboardStats {
    let total_expenses = expenses.iter().map(|e| e.amount).sum();
    let deductible_amount = expenses
        .iter()
        .filter(|e| e.deductibility == Some(Deductibility::Fully))
        .map(|e| e.amount)
        .sum();
    let categorized_count = expenses.iter().filter(|e| e.category.is_some()).count();

    DashboardStats {
        total_expenses,
        deductible_amount,
        categorized_count,
        categorized_percent: rounded_percent(categorized_count, expenses.len()),
    }
}

/// `round(part / whole * 100)` with halves rounded up; 0 when `whole` is 0.
fn rounded_percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    let scaled = (part as u64 * 200 + whole as u64) / (whole as u64 * 2);
    u32::try_from(scaled).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxBucket {
    pub deductibility: Deductibility,
    pub total: Money,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxSummary {
    pub buckets: Vec<TaxBucket>,
}

impl TaxSummary {
    pub fn bucket(&self, deductibility: Deductibility) -> Option<&TaxBucket> {
        self.buckets.iter().find(|b| b.deductibility == deductibility)
    }
}

/// One bucket per deductibility class. Unclassified expenses land in none.
pub fn tax_summary(expenses: &[Expense]) -> TaxSummary {
    let buckets = Deductibility::ALL
        .into_iter()
        .map(|deductibility| {
            let matching = expenses
                .iter()
                .filter(|e| e.deductibility == Some(deductibility));
            let (total, count) = matching.fold((Money::zero(), 0), |(total, count), e| {
                (total + e.amount, count + 1)
            });
            TaxBucket {
                deductibility,
                total,
                count,
            }
        })
        .collect();

    TaxSummary { buckets }
}

/// Per-expense input handed to the insight summarizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightInput {
    pub category: String,
    pub deductibility: String,
    pub amount: Money,
    pub description: String,
}

pub fn insight_inputs(expenses: &[Expense]) -> Vec<InsightInput> {
    expenses
        .iter()
        .map(|e| InsightInput {
            category: e
                .category
                .map_or_else(|| "Uncategorized".to_string(), |c| c.to_string()),
            deductibility: e
                .deductibility
                .map_or_else(|| "Unknown".to_string(), |d| d.to_string()),
            amount: e.amount,
            description: e.description.clone(),
        })
        .collect()
}
