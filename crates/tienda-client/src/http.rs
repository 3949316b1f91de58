//! # REST Backend
//!
//! [`PosBackend`] over HTTP with `reqwest`.
//!
//! ## Status Mapping
//! ```text
//! ┌──────────────────────┬────────────────────────────────────────────────┐
//! │ Response             │ ClientError                                    │
//! ├──────────────────────┼────────────────────────────────────────────────┤
//! │ 2xx                  │ (decoded body)                                 │
//! │ 401                  │ Unauthorized  + credentials cleared            │
//! │ 409 on open session  │ SessionAlreadyActive(message)                  │
//! │ 409 elsewhere        │ Conflict(message)                              │
//! │ other 4xx            │ Rejected { status, message }                   │
//! │ 5xx                  │ Server { status, message }                     │
//! │ connect / timeout    │ Transport                                      │
//! └──────────────────────┴────────────────────────────────────────────────┘
//! ```
//!
//! `message` is the body's `error` (or `message`) field, unchanged.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};
use url::Url;

use tienda_core::{
    CashSession, ClosingReport, Customer, Money, Page, PageQuery, Product, Sale, SaleRequest,
};

use crate::auth::TokenStore;
use crate::backend::PosBackend;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Header carrying the per-checkout deduplication key.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Longest plain-text body we are willing to show as an error message.
const MAX_RAW_MESSAGE_LEN: usize = 200;

// =============================================================================
// Wire DTOs
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OpenSessionBody {
    opening_amount: Money,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CloseSessionBody {
    counted_amount: Money,
}

/// `{"resumen": {...}}` returned by the close endpoint.
#[derive(Debug, Deserialize)]
struct CloseSessionResponse {
    resumen: ClosingSummary,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClosingSummary {
    opening_amount: Money,
    #[serde(default)]
    cash_sales_accumulated: Option<Money>,
    expected_amount: Money,
    #[serde(default)]
    counted_amount: Option<Money>,
}

impl ClosingSummary {
    /// The backend's `expectedAmount` is authoritative; a missing cash-sales
    /// figure is derived from it. Difference and verdict are recomputed.
    fn into_report(self, counted_fallback: Money) -> ClosingReport {
        let cash_sales = match self.cash_sales_accumulated {
            Some(cash) => {
                if self.opening_amount + cash != self.expected_amount {
                    warn!(
                        opening = %self.opening_amount,
                        cash_sales = %cash,
                        expected = %self.expected_amount,
                        "Closing summary does not add up; keeping the backend's expected amount"
                    );
                }
                cash
            }
            None => self.expected_amount - self.opening_amount,
        };

        ClosingReport::new(
            self.opening_amount,
            cash_sales,
            self.expected_amount,
            self.counted_amount.unwrap_or(counted_fallback),
        )
    }
}

/// Which endpoint a 409 came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Products,
    Customers,
    Sales,
    SessionStatus,
    SessionOpen,
    SessionClose,
}

impl Endpoint {
    fn path(&self) -> &'static str {
        match self {
            Endpoint::Products => "products",
            Endpoint::Customers => "customers",
            Endpoint::Sales => "sales",
            Endpoint::SessionStatus => "cash-sessions/current",
            Endpoint::SessionOpen => "cash-sessions/open",
            Endpoint::SessionClose => "cash-sessions/close",
        }
    }
}

// =============================================================================
// HttpBackend
// =============================================================================

/// REST implementation of [`PosBackend`].
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    tokens: TokenStore,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig, tokens: TokenStore) -> ClientResult<Self> {
        config.validate()?;

        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(HttpBackend {
            client,
            base_url: normalize_base_url(&config.api.base_url)?,
            tokens,
        })
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    fn url(&self, endpoint: Endpoint) -> ClientResult<Url> {
        Ok(self.base_url.join(endpoint.path())?)
    }

    /// Attaches the bearer token, sends, and maps non-2xx to `ClientError`.
    async fn send(&self, request: RequestBuilder, endpoint: Endpoint) -> ClientResult<Response> {
        let request = match self.tokens.bearer().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(|e| {
            error!(endpoint = endpoint.path(), error = %e, "Backend unreachable");
            ClientError::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            debug!(endpoint = endpoint.path(), status = status.as_u16(), "Backend OK");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = map_status(status, &body, endpoint);

        if matches!(err, ClientError::Unauthorized) {
            self.tokens.clear().await;
        }
        if status.is_server_error() {
            error!(endpoint = endpoint.path(), status = status.as_u16(), "Backend error");
        } else {
            warn!(endpoint = endpoint.path(), status = status.as_u16(), message = %err, "Backend rejected request");
        }

        Err(err)
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        query: &PageQuery,
    ) -> ClientResult<Page<T>> {
        let query = query.clone().validated()?;

        let mut params = vec![
            ("page", query.page.to_string()),
            ("pageSize", query.page_size.to_string()),
        ];
        if let Some(search) = &query.search {
            params.push(("search", search.clone()));
        }

        let request = self.client.get(self.url(endpoint)?).query(&params);
        let response = self.send(request, endpoint).await?;
        read_json(response).await
    }
}

impl PosBackend for HttpBackend {
    async fn list_products(&self, query: &PageQuery) -> ClientResult<Page<Product>> {
        self.get_page(Endpoint::Products, query).await
    }

    async fn list_customers(&self, query: &PageQuery) -> ClientResult<Page<Customer>> {
        self.get_page(Endpoint::Customers, query).await
    }

    async fn submit_sale(&self, request: &SaleRequest, idempotency_key: &str) -> ClientResult<Sale> {
        let builder = self
            .client
            .post(self.url(Endpoint::Sales)?)
            .header(IDEMPOTENCY_HEADER, idempotency_key)
            .json(request);

        let response = self.send(builder, Endpoint::Sales).await?;
        read_json(response).await
    }

    async fn current_session(&self) -> ClientResult<Option<CashSession>> {
        let builder = self.client.get(self.url(Endpoint::SessionStatus)?);

        let response = match self.send(builder, Endpoint::SessionStatus).await {
            Ok(response) => response,
            // Some deployments answer "no open session" with 404.
            Err(ClientError::Rejected { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(serde_json::from_str::<Option<CashSession>>(&body)?)
    }

    async fn open_session(&self, opening_amount: Money) -> ClientResult<CashSession> {
        let builder = self
            .client
            .post(self.url(Endpoint::SessionOpen)?)
            .json(&OpenSessionBody { opening_amount });

        let response = self.send(builder, Endpoint::SessionOpen).await?;
        read_json(response).await
    }

    async fn close_session(&self, counted_amount: Money) -> ClientResult<ClosingReport> {
        let builder = self
            .client
            .post(self.url(Endpoint::SessionClose)?)
            .json(&CloseSessionBody { counted_amount });

        let response = self.send(builder, Endpoint::SessionClose).await?;
        let CloseSessionResponse { resumen } = read_json(response).await?;
        Ok(resumen.into_report(counted_amount))
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Ensures the base URL ends with `/` so `join` appends instead of replacing
/// the last path segment.
fn normalize_base_url(raw: &str) -> ClientResult<Url> {
    let trimmed = raw.trim();
    if trimmed.ends_with('/') {
        Ok(Url::parse(trimmed)?)
    } else {
        Ok(Url::parse(&format!("{trimmed}/"))?)
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

/// Pulls the operator-facing message out of an error body.
fn extract_message(status: StatusCode, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        for key in ["error", "message"] {
            if let Some(msg) = json.get(key).and_then(Value::as_str) {
                return msg.to_string();
            }
        }
    }

    let raw = body.trim();
    if !raw.is_empty() && raw.len() <= MAX_RAW_MESSAGE_LEN && !raw.starts_with('<') {
        return raw.to_string();
    }

    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

fn map_status(status: StatusCode, body: &str, endpoint: Endpoint) -> ClientError {
    let message = extract_message(status, body);
    match status.as_u16() {
        401 => ClientError::Unauthorized,
        409 if endpoint == Endpoint::SessionOpen => ClientError::SessionAlreadyActive(message),
        409 => ClientError::Conflict(message),
        s @ 400..=499 => ClientError::Rejected { status: s, message },
        s => ClientError::Server { status: s, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tienda_core::Verdict;

    #[test]
    fn test_extract_message_prefers_error_field() {
        let body = r#"{"error":"Ya existe una caja abierta","message":"ignored"}"#;
        assert_eq!(
            extract_message(StatusCode::CONFLICT, body),
            "Ya existe una caja abierta"
        );
        assert_eq!(
            extract_message(StatusCode::BAD_REQUEST, r#"{"message":"Stock insuficiente"}"#),
            "Stock insuficiente"
        );
    }

    #[test]
    fn test_extract_message_fallbacks() {
        assert_eq!(
            extract_message(StatusCode::BAD_REQUEST, "plain text"),
            "plain text"
        );
        assert_eq!(
            extract_message(StatusCode::BAD_GATEWAY, "<html>nginx</html>"),
            "Bad Gateway"
        );
        assert_eq!(
            extract_message(StatusCode::INTERNAL_SERVER_ERROR, ""),
            "Internal Server Error"
        );
    }

    #[test]
    fn test_closing_summary_derives_missing_cash_sales() {
        let body = r#"{"resumen": {"openingAmount": 50, "expectedAmount": 170, "countedAmount": 165}}"#;
        let CloseSessionResponse { resumen } = serde_json::from_str(body).unwrap();
        let report = resumen.into_report(Money::zero());

        assert_eq!(report.opening_amount, Money::from_cents(5000));
        assert_eq!(report.cash_sales_accumulated, Money::from_cents(12000));
        assert_eq!(report.expected_amount, Money::from_cents(17000));
        assert_eq!(report.difference, Money::from_cents(-500));
        assert_eq!(report.verdict, Verdict::Shortage);
    }

    #[test]
    fn test_closing_summary_uses_request_count_when_absent() {
        let body = r#"{"resumen": {"openingAmount": "50.00", "cashSalesAccumulated": 120, "expectedAmount": 170}}"#;
        let CloseSessionResponse { resumen } = serde_json::from_str(body).unwrap();
        let report = resumen.into_report(Money::from_cents(17500));

        assert_eq!(report.counted_amount, Money::from_cents(17500));
        assert_eq!(report.difference, Money::from_cents(500));
        assert_eq!(report.verdict, Verdict::Overage);
    }

    #[test]
    fn test_map_status() {
        assert!(matches!(
            map_status(StatusCode::UNAUTHORIZED, "", Endpoint::Sales),
            ClientError::Unauthorized
        ));
        assert!(matches!(
            map_status(StatusCode::CONFLICT, r#"{"error":"x"}"#, Endpoint::SessionOpen),
            ClientError::SessionAlreadyActive(ref m) if m == "x"
        ));
        assert!(matches!(
            map_status(StatusCode::CONFLICT, r#"{"error":"x"}"#, Endpoint::Sales),
            ClientError::Conflict(_)
        ));
        assert!(matches!(
            map_status(StatusCode::UNPROCESSABLE_ENTITY, "", Endpoint::Sales),
            ClientError::Rejected { status: 422, .. }
        ));
        assert!(matches!(
            map_status(StatusCode::SERVICE_UNAVAILABLE, "", Endpoint::Products),
            ClientError::Server { status: 503, .. }
        ));
    }

    #[test]
    fn test_base_url_join_keeps_prefix() {
        let base = normalize_base_url("http://localhost:3000/api").unwrap();
        assert_eq!(
            base.join(Endpoint::SessionOpen.path()).unwrap().as_str(),
            "http://localhost:3000/api/cash-sessions/open"
        );

        let base = normalize_base_url("http://localhost:3000/api/").unwrap();
        assert_eq!(
            base.join(Endpoint::Products.path()).unwrap().as_str(),
            "http://localhost:3000/api/products"
        );
    }
}
