use std::time::Duration;

use async_trait::async_trait;
use deductly_core::{Category, Deductibility, InsightInput};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::classifier::{Classifier, ClassifierError};
use crate::types::{
    CategoryShare, CategorySuggestion, ClassificationRequest, DeductibilityShare,
    DeductibilitySuggestion, ExpenseInsights,
};

const DEFAULT_CONFIDENCE: f32 = 0.5;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            timeout_secs: 30,
        }
    }
}

impl OpenAiConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// Classifier backed by an OpenAI-compatible chat completions endpoint.
pub struct OpenAiClassifier {
    http: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiClassifier {
    pub fn new(config: OpenAiConfig) -> Result<Self, ClassifierError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }

    /// Sends `prompt` and returns the JSON object the model answered with.
    async fn complete_json<T: DeserializeOwned>(&self, prompt: String) -> Result<T, ClassifierError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ClassifierError::NotConfigured)?;

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.config.model,
            "messages": [{ "role": "user", "content": prompt }],
            "response_format": { "type": "json_object" },
        });

        let response = self
            .http
            .post(url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletion = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ClassifierError::Malformed("completion has no content".to_string()))?;

        parse_content(&content)
    }
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    async fn classify_category(
        &self,
        request: &ClassificationRequest,
    ) -> Result<CategorySuggestion, ClassifierError> {
        let raw: RawCategory = self.complete_json(category_prompt(request)).await?;
        raw.into_suggestion()
    }

    async fn classify_deductibility(
        &self,
        request: &ClassificationRequest,
        category: Category,
    ) -> Result<DeductibilitySuggestion, ClassifierError> {
        let raw: RawDeductibility = self
            .complete_json(deductibility_prompt(request, category))
            .await?;
        raw.into_suggestion()
    }

    async fn summarize(&self, expenses: &[InsightInput]) -> Result<ExpenseInsights, ClassifierError> {
        let raw: RawInsights = self.complete_json(insights_prompt(expenses)).await?;
        Ok(raw.into_insights())
    }
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCategory {
    category: Option<String>,
    confidence: Option<f32>,
}

impl RawCategory {
    fn into_suggestion(self) -> Result<CategorySuggestion, ClassifierError> {
        let category = match self.category.as_deref().map(str::trim) {
            None | Some("") => Category::Other,
            Some(label) => label
                .parse()
                .map_err(|e| ClassifierError::Malformed(format!("{e}")))?,
        };
        Ok(CategorySuggestion::new(
            category,
            self.confidence.unwrap_or(DEFAULT_CONFIDENCE),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct RawDeductibility {
    deductibility: Option<String>,
    reasoning: Option<String>,
    confidence: Option<f32>,
}

impl RawDeductibility {
    fn into_suggestion(self) -> Result<DeductibilitySuggestion, ClassifierError> {
        let deductibility = match self.deductibility.as_deref().map(str::trim) {
            None | Some("") => Deductibility::Not,
            Some(label) => label
                .parse()
                .map_err(|e| ClassifierError::Malformed(format!("{e}")))?,
        };
        let reasoning = self
            .reasoning
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| "Unable to determine deductibility".to_string());
        Ok(DeductibilitySuggestion::new(
            deductibility,
            reasoning,
            self.confidence.unwrap_or(DEFAULT_CONFIDENCE),
        ))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawInsights {
    summary: Option<String>,
    top_categories: Vec<CategoryShare>,
    deductibility_breakdown: Vec<DeductibilityShare>,
    recommendations: Vec<String>,
}

impl RawInsights {
    fn into_insights(self) -> ExpenseInsights {
        ExpenseInsights {
            summary: self
                .summary
                .unwrap_or_else(|| "Unable to generate insights".to_string()),
            top_categories: self.top_categories,
            deductibility_breakdown: self.deductibility_breakdown,
            recommendations: self.recommendations,
        }
    }
}

fn parse_content<T: DeserializeOwned>(content: &str) -> Result<T, ClassifierError> {
    serde_json::from_str(content).map_err(|e| ClassifierError::Malformed(e.to_string()))
}

// ── Prompts ───────────────────────────────────────────────────────────────────

fn category_list() -> String {
    Category::ALL
        .iter()
        .map(|c| c.label())
        .collect::<Vec<_>>()
        .join(", ")
}

fn category_prompt(request: &ClassificationRequest) -> String {
    format!(
        "You are a business expense classification assistant. Suggest the most accurate \
         bookkeeping category for this expense.\n\n\
         Vendor: {}\nDescription: {}\nAmount: ${}\n\n\
         Respond with JSON: {{ \"category\": \"category_name\", \"confidence\": number_between_0_and_1 }}\n\
         Available categories: {}",
        request.vendor,
        request.description,
        request.amount,
        category_list()
    )
}

fn deductibility_prompt(request: &ClassificationRequest, category: Category) -> String {
    let options = Deductibility::ALL
        .iter()
        .map(|d| format!("\"{d}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Classify this small business expense by its tax deductibility.\n\n\
         Vendor: {}\nDescription: {}\nAmount: ${}\nCategory: {}\n\n\
         Respond with JSON: {{ \"deductibility\": \"deductibility_type\", \"reasoning\": \"brief_explanation\", \
         \"confidence\": number_between_0_and_1 }}\n\
         Available deductibility types: {}",
        request.vendor, request.description, request.amount, category, options
    )
}

fn insights_prompt(expenses: &[InsightInput]) -> String {
    let lines = expenses
        .iter()
        .map(|e| {
            format!(
                "Category: {}, Amount: ${}, Deductibility: {}, Description: {}",
                e.category, e.amount, e.deductibility, e.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Summarize these business expenses for the owner, highlighting spending patterns and \
         tax deduction opportunities.\n\nExpenses:\n{lines}\n\n\
         Respond with JSON: {{ \"summary\": \"one_paragraph\", \
         \"topCategories\": [{{\"category\": \"name\", \"percentage\": number, \"amount\": \"total\"}}], \
         \"deductibilityBreakdown\": [{{\"type\": \"deductibility_type\", \"amount\": \"total\", \"count\": number}}], \
         \"recommendations\": [\"...\"] }}"
    )
}
