use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use contracts::usecases::u601_upload_to_sheets::HEADER_RANGE;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use super::credentials::ServiceAccountCredentials;
use super::errors::{AuthError, RemoteError};

const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Токен, которому осталось жить меньше этого, перевыпускается до запроса
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Лист внутри таблицы
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRef {
    pub spreadsheet_id: String,
    pub title: String,
}

impl SheetRef {
    pub fn new(spreadsheet_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            title: title.into(),
        }
    }

    /// Имя листа в кавычках, например `'Hoja 1'`
    pub fn quoted_title(&self) -> String {
        format!("'{}'", self.title.replace('\'', "''"))
    }

    /// Диапазон A1 на этом листе, например `'Hoja 1'!A1:F1`
    pub fn a1(&self, cells: &str) -> String {
        format!("{}!{}", self.quoted_title(), cells)
    }
}

/// Удалённые операции над таблицей, нужные для загрузки
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Первый лист (index 0) таблицы
    async fn first_sheet(&self, spreadsheet_id: &str) -> Result<SheetRef, RemoteError>;

    /// Содержимое первой строки как есть; пусто, если строка пустая
    async fn read_header_row(&self, sheet: &SheetRef) -> Result<Vec<String>, RemoteError>;

    /// Перезаписать A1:F1 значениями `headers`
    async fn write_header_row(&self, sheet: &SheetRef, headers: &[String])
        -> Result<(), RemoteError>;

    /// Дописать после последней строки листа, вернуть число записанных строк
    async fn append_rows(&self, sheet: &SheetRef, rows: Vec<Vec<Value>>)
        -> Result<usize, RemoteError>;
}

/// Claims JWT assertion сервисного аккаунта
#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn expires_soon(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) >= self.expires_at
    }
}

/// Аутентифицированная сессия Google Sheets API v4
///
/// Создаётся один раз при старте и общая для всех пакетов. Access token
/// перевыпускается по сохранённому ключу, когда срок подходит к концу.
pub struct SheetsSession {
    client: reqwest::Client,
    credentials: ServiceAccountCredentials,
    encoding_key: EncodingKey,
    api_base_url: String,
    token: Mutex<AccessToken>,
}

impl SheetsSession {
    /// Обменять ключ сервисного аккаунта на access token
    pub async fn connect(
        credentials: ServiceAccountCredentials,
        api_base_url: &str,
        timeout: std::time::Duration,
    ) -> Result<Self, AuthError> {
        let encoding_key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())
            .map_err(|e| AuthError::MalformedCredentials(format!("private_key: {}", e)))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Network(format!("no se pudo crear el cliente HTTP: {}", e)))?;

        tracing::info!(
            "Sheets auth: requesting token for {} at {}",
            credentials.client_email,
            credentials.token_uri
        );

        let token = request_token(&client, &credentials, &encoding_key).await?;

        tracing::info!(
            "Sheets auth: token issued, expires at {}",
            token.expires_at.to_rfc3339()
        );

        Ok(Self {
            client,
            credentials,
            encoding_key,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            token: Mutex::new(token),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.credentials.client_email
    }

    async fn bearer(&self) -> Result<String, RemoteError> {
        let mut token = self.token.lock().await;

        if token.expires_soon(Utc::now()) {
            tracing::info!("Sheets auth: access token about to expire, requesting a new one");
            *token = request_token(&self.client, &self.credentials, &self.encoding_key)
                .await
                .map_err(|e| RemoteError::Token(e.to_string()))?;
        }

        Ok(token.value.clone())
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str) -> String {
        values_url(&self.api_base_url, spreadsheet_id, range)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<T, RemoteError> {
        let bearer = self.bearer().await?;

        let response = request
            .bearer_auth(bearer)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Sheets API: {} -> {}", what, status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = api_error_message(&body);
            tracing::error!("Sheets API: {} failed with {}: {}", what, status, message);
            return Err(RemoteError::from_status(status.as_u16(), message));
        }

        let body = response.text().await?;
        serde_json::from_str::<T>(&body).map_err(|e| {
            let preview: String = body.chars().take(300).collect();
            RemoteError::UnexpectedResponse(format!("{}: {} ({})", what, e, preview))
        })
    }
}

#[async_trait]
impl SheetStore for SheetsSession {
    async fn first_sheet(&self, spreadsheet_id: &str) -> Result<SheetRef, RemoteError> {
        let url = format!("{}/v4/spreadsheets/{}", self.api_base_url, spreadsheet_id);
        let request = self
            .client
            .get(&url)
            .query(&[("fields", "sheets.properties(sheetId,title,index)")]);

        let metadata: SpreadsheetMetadata = self.send(request, "spreadsheet metadata").await?;

        let sheet = metadata
            .sheets
            .into_iter()
            .min_by_key(|s| s.properties.index)
            .ok_or_else(|| {
                RemoteError::UnexpectedResponse(format!(
                    "la hoja de cálculo {} no tiene hojas",
                    spreadsheet_id
                ))
            })?;

        tracing::info!(
            "Sheets API: spreadsheet {} first sheet is '{}'",
            spreadsheet_id,
            sheet.properties.title
        );

        Ok(SheetRef::new(spreadsheet_id, sheet.properties.title))
    }

    async fn read_header_row(&self, sheet: &SheetRef) -> Result<Vec<String>, RemoteError> {
        let url = self.values_url(&sheet.spreadsheet_id, &sheet.a1("1:1"));
        let request = self.client.get(&url).query(&[("majorDimension", "ROWS")]);

        let range: ValueRange = self.send(request, "read header row").await?;

        Ok(range
            .values
            .into_iter()
            .next()
            .map(|row| row.iter().map(value_to_string).collect())
            .unwrap_or_default())
    }

    async fn write_header_row(
        &self,
        sheet: &SheetRef,
        headers: &[String],
    ) -> Result<(), RemoteError> {
        let range = sheet.a1(HEADER_RANGE);
        let url = self.values_url(&sheet.spreadsheet_id, &range);
        let body = serde_json::json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": [headers],
        });
        let request = self
            .client
            .put(&url)
            .query(&[("valueInputOption", "RAW")])
            .json(&body);

        let _: Value = self.send(request, "write header row").await?;
        Ok(())
    }

    async fn append_rows(
        &self,
        sheet: &SheetRef,
        rows: Vec<Vec<Value>>,
    ) -> Result<usize, RemoteError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let requested = rows.len();
        let url = format!(
            "{}:append",
            self.values_url(&sheet.spreadsheet_id, &sheet.quoted_title())
        );
        let body = serde_json::json!({
            "majorDimension": "ROWS",
            "values": rows,
        });
        let request = self
            .client
            .post(&url)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&body);

        let response: AppendResponse = self.send(request, "append rows").await?;

        let written = response
            .updates
            .and_then(|u| u.updated_rows)
            .unwrap_or(requested);

        tracing::info!(
            "Sheets API: appended {} rows to '{}'",
            written,
            sheet.title
        );

        Ok(written)
    }
}

// ============================================================================
// Sheets API v4 payloads
// ============================================================================

#[derive(Debug, Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
    #[serde(default)]
    index: i64,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct AppendResponse {
    #[serde(default)]
    updates: Option<UpdateValuesResponse>,
}

#[derive(Debug, Deserialize)]
struct UpdateValuesResponse {
    #[serde(rename = "updatedRows", default)]
    updated_rows: Option<usize>,
}

// ============================================================================
// Helpers
// ============================================================================

fn values_url(api_base_url: &str, spreadsheet_id: &str, range: &str) -> String {
    format!(
        "{}/v4/spreadsheets/{}/values/{}",
        api_base_url,
        spreadsheet_id,
        urlencoding::encode(range)
    )
}

fn build_assertion(
    credentials: &ServiceAccountCredentials,
    key: &EncodingKey,
    now: DateTime<Utc>,
) -> Result<String, AuthError> {
    let iat = now.timestamp();
    let claims = AssertionClaims {
        iss: credentials.client_email.clone(),
        scope: SPREADSHEETS_SCOPE.to_string(),
        aud: credentials.token_uri.clone(),
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    };

    let mut header = Header::new(Algorithm::RS256);
    if !credentials.private_key_id.is_empty() {
        header.kid = Some(credentials.private_key_id.clone());
    }

    encode(&header, &claims, key)
        .map_err(|e| AuthError::MalformedCredentials(format!("no se pudo firmar la aserción: {}", e)))
}

async fn request_token(
    client: &reqwest::Client,
    credentials: &ServiceAccountCredentials,
    key: &EncodingKey,
) -> Result<AccessToken, AuthError> {
    let now = Utc::now();
    let assertion = build_assertion(credentials, key, now)?;

    let response = client
        .post(&credentials.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await
        .map_err(|e| AuthError::Network(format!("{}: {}", credentials.token_uri, e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::error!("Sheets auth: token request failed with {}: {}", status, body);
        return Err(AuthError::Rejected(format!("HTTP {}: {}", status, body)));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| AuthError::Rejected(format!("respuesta de token ilegible: {}", e)))?;

    Ok(AccessToken {
        value: token.access_token,
        expires_at: now + Duration::seconds(token.expires_in),
    })
}

/// Тело ошибки Google имеет вид `{"error": {"code": 403, "message": "..."}}`
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        other => other.to_string(),
    }
}
