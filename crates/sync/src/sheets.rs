use std::time::Duration;

use async_trait::async_trait;
use deductly_core::Expense;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::rows::{export_rows, rows_to_candidates};
use crate::source::{CandidateExpense, RecordSource, SourceError};

const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    pub client_email: Option<String>,
    /// PEM-encoded service account key.
    pub private_key: Option<String>,
    pub spreadsheet_id: Option<String>,
    pub range: String,
    pub token_uri: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            client_email: None,
            private_key: None,
            spreadsheet_id: None,
            range: "Sheet1!A:F".to_string(),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            api_base: "https://sheets.googleapis.com/v4".to_string(),
            timeout_secs: 30,
        }
    }
}

struct Credentials<'a> {
    client_email: &'a str,
    private_key: &'a str,
    spreadsheet_id: &'a str,
}

impl SheetsConfig {
    pub fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }

    fn credentials(&self) -> Result<Credentials<'_>, SourceError> {
        fn filled(v: &Option<String>) -> Option<&str> {
            v.as_deref().map(str::trim).filter(|s| !s.is_empty())
        }
        match (
            filled(&self.client_email),
            filled(&self.private_key),
            filled(&self.spreadsheet_id),
        ) {
            (Some(client_email), Some(private_key), Some(spreadsheet_id)) => Ok(Credentials {
                client_email,
                private_key,
                spreadsheet_id,
            }),
            _ => Err(SourceError::NotConfigured),
        }
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Google Sheets as a record source, authenticated as a service account.
pub struct GoogleSheetsSource {
    http: reqwest::Client,
    config: SheetsConfig,
}

impl GoogleSheetsSource {
    pub fn new(config: SheetsConfig) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }

    async fn access_token(&self, creds: &Credentials<'_>) -> Result<String, SourceError> {
        let iat = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: creds.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.config.token_uri,
            iat,
            exp: iat + TOKEN_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(creds.private_key.as_bytes())
            .map_err(|e| SourceError::Auth(e.to_string()))?;
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| SourceError::Auth(e.to_string()))?;

        let response = self
            .http
            .post(&self.config.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let response = check_status(response).await?;
        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    /// `{api_base}/spreadsheets/{id}/{tail...}` with each segment escaped.
    fn url(&self, spreadsheet_id: &str, tail: &[&str]) -> Result<Url, SourceError> {
        let mut url =
            Url::parse(&self.config.api_base).map_err(|e| SourceError::Config(e.to_string()))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| SourceError::Config("api_base cannot be a base URL".to_string()))?;
            segments.pop_if_empty().push("spreadsheets").push(spreadsheet_id);
            segments.extend(tail);
        }
        Ok(url)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SourceError::Status {
        status: status.as_u16(),
        body,
    })
}

fn cell_text(cell: Value) -> String {
    match cell {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl RecordSource for GoogleSheetsSource {
    async fn read_all(&self) -> Result<Vec<CandidateExpense>, SourceError> {
        let creds = self.config.credentials()?;
        let token = self.access_token(&creds).await?;
        let url = self.url(creds.spreadsheet_id, &["values", self.config.range.as_str()])?;

        let response = self.http.get(url).bearer_auth(token).send().await?;
        let response = check_status(response).await?;
        let range: ValueRange = response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))?;

        let rows = range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect();
        Ok(rows_to_candidates(rows))
    }

    async fn write_all(&self, expenses: &[Expense]) -> Result<(), SourceError> {
        let creds = self.config.credentials()?;
        let token = self.access_token(&creds).await?;

        // Clear first so rows left over from a longer previous export go away.
        let clear_range = format!("{}:clear", self.config.range);
        let clear = self.url(creds.spreadsheet_id, &["values", clear_range.as_str()])?;
        let response = self
            .http
            .post(clear)
            .bearer_auth(&token)
            .json(&json!({}))
            .send()
            .await?;
        check_status(response).await?;

        let mut update = self.url(creds.spreadsheet_id, &["values", self.config.range.as_str()])?;
        update
            .query_pairs_mut()
            .append_pair("valueInputOption", "RAW");
        let body = json!({
            "range": self.config.range,
            "majorDimension": "ROWS",
            "values": export_rows(expenses),
        });
        let response = self
            .http
            .put(update)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn test_connection(&self) -> bool {
        let probe = async {
            let creds = self.config.credentials()?;
            let token = self.access_token(&creds).await?;
            let url = self.url(creds.spreadsheet_id, &[])?;
            let response = self.http.get(url).bearer_auth(token).send().await?;
            check_status(response).await.map(|_| ())
        };
        match probe.await {
            Ok(()) => true,
            Err(SourceError::NotConfigured) => false,
            Err(e) => {
                tracing::warn!("Google Sheets connection test failed: {e}");
                false
            }
        }
    }
}
