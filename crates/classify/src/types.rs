use deductly_core::{Category, Deductibility, Expense, Money};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// What the classifier gets to see about an expense.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationRequest {
    pub description: String,
    pub vendor: String,
    pub amount: Money,
}

impl From<&Expense> for ClassificationRequest {
    fn from(e: &Expense) -> Self {
        Self {
            description: e.description.clone(),
            vendor: e.vendor.clone(),
            amount: e.amount,
        }
    }
}

/// Confidence in `[0, 1]`; NaN counts as no confidence at all.
fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySuggestion {
    pub category: Category,
    pub confidence: f32,
}

impl CategorySuggestion {
    pub fn new(category: Category, confidence: f32) -> Self {
        Self {
            category,
            confidence: clamp_confidence(confidence),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeductibilitySuggestion {
    pub deductibility: Deductibility,
    pub reasoning: String,
    pub confidence: f32,
}

impl DeductibilitySuggestion {
    pub fn new(deductibility: Deductibility, reasoning: impl Into<String>, confidence: f32) -> Self {
        Self {
            deductibility,
            reasoning: reasoning.into(),
            confidence: clamp_confidence(confidence),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryShare {
    pub category: String,
    pub percentage: f64,
    #[serde(deserialize_with = "text_or_number")]
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeductibilityShare {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(deserialize_with = "text_or_number")]
    pub amount: String,
    pub count: u64,
}

/// Model output puts totals in either form.
fn text_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Narrative summary of the expense set produced by the classifier.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseInsights {
    pub summary: String,
    pub top_categories: Vec<CategoryShare>,
    pub deductibility_breakdown: Vec<DeductibilityShare>,
    pub recommendations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggestions_clamp_confidence() {
        assert_eq!(CategorySuggestion::new(Category::Meals, 1.7).confidence, 1.0);
        assert_eq!(CategorySuggestion::new(Category::Meals, -0.2).confidence, 0.0);
        assert_eq!(
            DeductibilitySuggestion::new(Deductibility::Fully, "", f32::NAN).confidence,
            0.0
        );
        assert_eq!(
            DeductibilitySuggestion::new(Deductibility::Fully, "", 0.42).confidence,
            0.42
        );
    }

    #[test]
    fn insights_serialize_with_wire_names() {
        let insights = ExpenseInsights {
            summary: "ok".to_string(),
            top_categories: vec![],
            deductibility_breakdown: vec![DeductibilityShare {
                kind: "Fully Deductible".to_string(),
                amount: "10.00".to_string(),
                count: 1,
            }],
            recommendations: vec![],
        };
        let json = serde_json::to_value(&insights).unwrap();
        assert_eq!(json["deductibilityBreakdown"][0]["type"], "Fully Deductible");
        assert!(json["topCategories"].as_array().unwrap().is_empty());
    }

    #[test]
    fn share_amounts_accept_numbers_or_strings() {
        let insights: ExpenseInsights = serde_json::from_str(
            r#"{
                "summary": "ok",
                "topCategories": [{"category": "Software", "percentage": 60, "amount": 52.99}],
                "deductibilityBreakdown": [{"type": "Fully Deductible", "amount": "52.99", "count": 1}],
                "recommendations": []
            }"#,
        )
        .unwrap();
        assert_eq!(insights.top_categories[0].amount, "52.99");
        assert_eq!(insights.deductibility_breakdown[0].amount, "52.99");
    }
}
