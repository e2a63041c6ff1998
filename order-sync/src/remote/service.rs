//! HttpOrderGateway - reqwest client for the platform's REST order API

use super::gateway::{GatewayError, ListOrdersQuery, OrderGateway, OrderPage};
use super::wire::{self, WireNewOrder, WireOrder, WireOrderUpdate};
use crate::core::Config;
use crate::utils::AppError;
use async_trait::async_trait;
use reqwest::{Client, Response};
use shared::order::{NewRemoteOrder, OrderUpdatePatch, RemoteOrder};
use shared::util::millis_to_rfc3339;
use std::error::Error as StdError;
use std::time::Duration;

/// Total-pages header on list responses
pub const TOTAL_PAGES_HEADER: &str = "X-WP-TotalPages";

/// HTTP client for the remote order API (Basic auth with consumer key/secret)
pub struct HttpOrderGateway {
    client: Client,
    base_url: String,
    consumer_key: String,
    consumer_secret: String,
}

impl HttpOrderGateway {
    pub fn new(
        base_url: impl Into<String>,
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("order-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {e}")))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        tracing::info!(base_url = %base_url, "Remote order gateway configured");

        Ok(Self {
            client,
            base_url,
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(
            &config.remote_base_url,
            &config.consumer_key,
            &config.consumer_secret,
            config.request_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn orders_url(&self) -> String {
        format!("{}/orders", self.base_url)
    }

    /// Non-success responses become typed errors
    async fn check(response: Response) -> Result<Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GatewayError::from_status(
            status.as_u16(),
            &wire::error_message(&body),
        ))
    }
}

/// Request failure with its full source chain
fn transport_error(context: &str, e: reqwest::Error) -> GatewayError {
    let mut msg = format!("{context}: {e}");
    let mut source: Option<&dyn StdError> = StdError::source(&e);
    while let Some(s) = source {
        msg.push_str(&format!(" → {s}"));
        source = s.source();
    }
    GatewayError::Transport(msg)
}

#[async_trait]
impl OrderGateway for HttpOrderGateway {
    async fn list_orders(&self, query: &ListOrdersQuery) -> Result<OrderPage, GatewayError> {
        let mut params: Vec<(&str, String)> = vec![
            ("status", query.status.clone()),
            ("page", query.page.to_string()),
            ("per_page", query.per_page.to_string()),
            ("orderby", "date".into()),
            ("order", "asc".into()),
        ];
        if let Some(from) = query.date_from {
            params.push(("after", millis_to_rfc3339(from)));
        }
        if let Some(to) = query.date_to {
            params.push(("before", millis_to_rfc3339(to)));
        }

        let response = self
            .client
            .get(self.orders_url())
            .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
            .query(&params)
            .send()
            .await
            .map_err(|e| transport_error("List orders request failed", e))?;
        let response = Self::check(response).await?;

        let total_pages = response
            .headers()
            .get(TOTAL_PAGES_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u32>().ok());

        let values: Vec<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| transport_error("Failed to decode order page", e))?;
        let received = values.len();
        let (orders, rejected) = wire::parse_page(values);

        for rejection in &rejected {
            tracing::warn!(
                external_id = ?rejection.external_id,
                reason = %rejection.reason,
                status = %query.status,
                page = query.page,
                "Remote order failed validation"
            );
        }

        Ok(OrderPage {
            orders,
            rejected,
            has_more: OrderPage::has_more_after(query.page, query.per_page, total_pages, received),
            total_pages,
        })
    }

    async fn push_order_update(
        &self,
        external_id: i64,
        patch: &OrderUpdatePatch,
    ) -> Result<(), GatewayError> {
        let url = format!("{}/{external_id}", self.orders_url());
        let response = self
            .client
            .put(&url)
            .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
            .json(&WireOrderUpdate::from(patch))
            .send()
            .await
            .map_err(|e| transport_error("Order update request failed", e))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn create_order(&self, order: &NewRemoteOrder) -> Result<RemoteOrder, GatewayError> {
        let response = self
            .client
            .post(self.orders_url())
            .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
            .json(&WireNewOrder::from(order))
            .send()
            .await
            .map_err(|e| transport_error("Order create request failed", e))?;
        let response = Self::check(response).await?;

        let created: WireOrder = response
            .json()
            .await
            .map_err(|e| transport_error("Failed to decode created order", e))?;
        created
            .into_remote()
            .map_err(|reason| GatewayError::Transport(format!("Invalid created order: {reason}")))
    }
}
