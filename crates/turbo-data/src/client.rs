//! The storefront API client.

use crate::retry::RetryPolicy;
use crate::wire::{
    error_message, CreateOrderBody, LoginBody, LoginGrant, OrderEnvelope, OrderList,
    ProductEnvelope, ProductList,
};
use crate::ApiError;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use turbo_commerce::catalog::Product;
use turbo_commerce::checkout::{OrderReceipt, OrderRecord, OrderSubmission};
use turbo_commerce::gateway::{
    CouponValidationRequest, CouponValidationResponse, CouponValidator, GatewayError,
    OrderGateway,
};
use turbo_commerce::money::Currency;

/// Endpoint paths, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiPaths {
    pub coupons_validate: String,
    pub orders: String,
    pub products: String,
    pub login: String,
}

impl Default for ApiPaths {
    fn default() -> Self {
        Self {
            coupons_validate: "/coupons/validate".into(),
            orders: "/orders".into(),
            products: "/products".into(),
            login: "/auth/login".into(),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub paths: ApiPaths,
    /// Whole-request timeout.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Applied to GET requests only.
    pub retry: RetryPolicy,
    /// Currency amounts in responses are expressed in.
    pub currency: Currency,
    pub user_agent: String,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            paths: ApiPaths::default(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            currency: Currency::default(),
            user_agent: concat!("turbo-storefront/", env!("CARGO_PKG_VERSION")).into(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }
}

/// HTTP client for the storefront API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ApiConfig,
    http: Client,
}

impl ApiClient {
    /// Create a new client from the given configuration.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let base = config.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ApiError::InvalidUrl(config.base_url.clone()));
        }
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Full URL for `path`.
    pub fn url(&self, path: &str) -> String {
        join_url(&self.config.base_url, path)
    }

    /// Validate a coupon against a cart.
    ///
    /// A 4xx answer that still carries a `{valid: false, message}` body is
    /// a rejection, not an error.
    pub async fn validate_coupon(
        &self,
        request: &CouponValidationRequest,
    ) -> Result<CouponValidationResponse, ApiError> {
        let url = self.url(&self.config.paths.coupons_validate);
        tracing::debug!(code = %request.code, url = %url, "POST coupon validation");

        let response = self.http.post(&url).json(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_client_error() {
            if let Ok(parsed) = serde_json::from_str::<CouponValidationResponse>(&body) {
                if !parsed.valid {
                    return Ok(parsed);
                }
            }
        }
        decode(status, &body)
    }

    /// Create an order. Never retried.
    pub async fn create_order(
        &self,
        submission: &OrderSubmission,
        bearer: &str,
    ) -> Result<OrderReceipt, ApiError> {
        let url = self.url(&self.config.paths.orders);
        tracing::debug!(url = %url, lines = submission.line_items.len(), "POST order");

        let response = self
            .http
            .post(&url)
            .bearer_auth(bearer)
            .json(&CreateOrderBody::from(submission))
            .send()
            .await?;
        let order: OrderEnvelope = read_json(response).await?;
        order.into_inner().into_receipt(self.config.currency)
    }

    /// The bearer's order history.
    pub async fn list_orders(&self, bearer: &str) -> Result<Vec<OrderRecord>, ApiError> {
        let url = self.url(&self.config.paths.orders);
        let orders: OrderList = self.get_json(&url, &[], Some(bearer)).await?;
        Ok(orders
            .into_inner()
            .into_iter()
            .map(|order| order.into_record(self.config.currency))
            .collect())
    }

    /// One order of the bearer.
    pub async fn get_order(&self, bearer: &str, order_id: &str) -> Result<OrderRecord, ApiError> {
        let url = self.url(&format!("{}/{}", self.config.paths.orders, encode_segment(order_id)));
        let order: OrderEnvelope = self.get_json(&url, &[], Some(bearer)).await?;
        Ok(order.into_inner().into_record(self.config.currency))
    }

    pub async fn get_product(&self, product_id: &str) -> Result<Product, ApiError> {
        let url = self.url(&format!(
            "{}/{}",
            self.config.paths.products,
            encode_segment(product_id)
        ));
        let product: ProductEnvelope = self.get_json(&url, &[], None).await?;
        Ok(product.into_inner())
    }

    /// Products matching `query`, at most `limit`.
    pub async fn search_products(&self, query: &str, limit: usize) -> Result<Vec<Product>, ApiError> {
        let url = self.url(&self.config.paths.products);
        let limit_param = limit.to_string();
        let params = [("search", query), ("limit", limit_param.as_str())];
        let products: ProductList = self.get_json(&url, &params, None).await?;
        let mut products = products.into_inner();
        products.truncate(limit);
        Ok(products)
    }

    /// Exchange credentials for a bearer token.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginGrant, ApiError> {
        let url = self.url(&self.config.paths.login);
        tracing::debug!(url = %url, username, "POST login");

        let response = self
            .http
            .post(&url)
            .json(&LoginBody { username, password })
            .send()
            .await?;
        read_json(response).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        bearer: Option<&str>,
    ) -> Result<T, ApiError> {
        let mut attempt = 0;
        loop {
            let mut request = self.request(Method::GET, url).query(query);
            if let Some(token) = bearer {
                request = request.bearer_auth(token);
            }

            let result = match request.send().await {
                Ok(response) => read_json(response).await,
                Err(e) => Err(e.into()),
            };

            match result {
                Err(e) if self.config.retry.should_retry(&e, attempt) => {
                    let delay = self.config.retry.backoff.delay_for_attempt(attempt);
                    tracing::warn!(url, attempt, error = %e, ?delay, "retrying GET");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http.request(method, url)
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await?;
    decode(status, &body)
}

fn decode<T: DeserializeOwned>(status: reqwest::StatusCode, body: &str) -> Result<T, ApiError> {
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            message: error_message(body, status.as_u16()),
        });
    }
    Ok(serde_json::from_str(body)?)
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[async_trait]
impl CouponValidator for ApiClient {
    async fn validate(
        &self,
        request: &CouponValidationRequest,
    ) -> Result<CouponValidationResponse, GatewayError> {
        Ok(self.validate_coupon(request).await?)
    }
}

#[async_trait]
impl OrderGateway for ApiClient {
    async fn create_order(
        &self,
        submission: &OrderSubmission,
        bearer: &str,
    ) -> Result<OrderReceipt, GatewayError> {
        Ok(ApiClient::create_order(self, submission, bearer).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve canned responses, one per connection, and hand back the raw
    /// requests received.
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let mut seen = Vec::new();
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                seen.push(read_request(&mut socket).await);
                let reply = format!(
                    "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
            seen
        });
        (format!("http://{addr}"), handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return text;
                }
            }
            if n == 0 {
                return text;
            }
        }
    }

    fn client(base: &str) -> ApiClient {
        ApiClient::new(ApiConfig::new(base).with_retry(RetryPolicy::new(2).with_backoff(
            crate::retry::BackoffStrategy::None,
        )))
        .unwrap()
    }

    #[test]
    fn test_url_join() {
        assert_eq!(join_url("https://api.shop/", "/orders"), "https://api.shop/orders");
        assert_eq!(join_url("https://api.shop/v1", "orders"), "https://api.shop/v1/orders");
        assert_eq!(encode_segment("a b/c"), "a%20b%2Fc");
    }

    #[test]
    fn test_rejects_non_http_base() {
        assert!(matches!(
            ApiClient::new(ApiConfig::new("ftp://x")),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_coupon_rejection_body_on_400_is_not_an_error() {
        let (base, server) =
            serve(vec![(400, r#"{"valid":false,"message":"Minimum not met"}"#)]).await;
        let request = CouponValidationRequest {
            code: "SAVE".into(),
            cart_total: 12.0,
            products: Vec::new(),
        };

        let response = client(&base).validate_coupon(&request).await.unwrap();
        assert!(!response.valid);
        assert_eq!(response.message.as_deref(), Some("Minimum not met"));

        let seen = server.await.unwrap();
        assert!(seen[0].starts_with("POST /coupons/validate"));
        assert!(seen[0].contains(r#""cartTotal":12.0"#));
    }

    #[tokio::test]
    async fn test_order_error_message_is_verbatim() {
        let (base, _server) = serve(vec![(409, r#"{"message":"Out of stock: Tee"}"#)]).await;
        let submission = OrderSubmission {
            shipping_address: Default::default(),
            line_items: Vec::new(),
            coupon: None,
            discount: Default::default(),
            subtotal: Default::default(),
            total: Default::default(),
            cart_revision: 1,
        };

        let err = OrderGateway::create_order(&client(&base), &submission, "tok")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            GatewayError::Rejected {
                status: 409,
                message: "Out of stock: Tee".into()
            }
        );
    }

    #[tokio::test]
    async fn test_get_is_retried_on_server_error() {
        let (base, server) = serve(vec![
            (503, r#"{"error":"busy"}"#),
            (200, r#"{"orders":[{"_id":"o1","status":"delivered","total":12.5}]}"#),
        ])
        .await;

        let orders = client(&base).list_orders("tok").await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].total.amount_cents, 1250);

        let seen = server.await.unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[1].to_lowercase().contains("authorization: bearer tok"));
    }

    #[tokio::test]
    async fn test_login_grant() {
        let (base, _server) = serve(vec![(200, r#"{"token":"abc","expiresIn":3600}"#)]).await;
        let grant = client(&base).login("alice", "pw").await.unwrap();
        assert_eq!(grant.token, "abc");
        assert_eq!(grant.expires_in, Some(3600));
    }
}
