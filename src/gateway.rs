use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

use crate::config::AppConfig;
use crate::errors::ServiceError;

/// Metadata attached to a remote order at creation time.
///
/// Binding the local order id on the remote side is load-bearing: reconciliation
/// reads it back from the gateway instead of trusting the callback payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteOrderNotes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_order_id: Option<String>,
}

/// Request to create a remote payment order (intent).
#[derive(Debug, Clone, Serialize)]
pub struct CreateRemoteOrder {
    /// Amount in minor currency units
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub notes: RemoteOrderNotes,
}

/// Gateway-side payment order as returned by the remote API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub notes: RemoteOrderNotes,
}

/// External payment gateway client seam.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a remote payment order for the given amount.
    async fn create_order(&self, req: &CreateRemoteOrder) -> Result<RemoteOrder, ServiceError>;

    /// Fetches a remote order by its gateway id.
    async fn fetch_order(&self, remote_order_id: &str) -> Result<RemoteOrder, ServiceError>;
}

/// HTTP implementation of [`PaymentGateway`] against a Razorpay-style orders API.
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl HttpPaymentGateway {
    pub fn new(cfg: &AppConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.gateway_timeout_secs))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("gateway client: {}", e)))?;

        Ok(Self {
            client,
            base_url: cfg.gateway_url.trim_end_matches('/').to_string(),
            key_id: cfg.gateway_key_id.clone(),
            key_secret: cfg.gateway_key_secret.clone(),
        })
    }

    fn map_transport_error(err: reqwest::Error) -> ServiceError {
        if err.is_timeout() || err.is_connect() {
            ServiceError::GatewayUnavailable(err.to_string())
        } else {
            ServiceError::GatewayError(err.to_string())
        }
    }

    async fn parse_order(response: reqwest::Response) -> Result<RemoteOrder, ServiceError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::GatewayError(format!(
                "gateway responded {}: {}",
                status, body
            )));
        }

        response
            .json::<RemoteOrder>()
            .await
            .map_err(|e| ServiceError::GatewayError(format!("invalid gateway response: {}", e)))
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[instrument(skip(self, req), fields(amount = req.amount, receipt = %req.receipt))]
    async fn create_order(&self, req: &CreateRemoteOrder) -> Result<RemoteOrder, ServiceError> {
        let response = self
            .client
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(req)
            .send()
            .await
            .map_err(Self::map_transport_error)?;

        Self::parse_order(response).await
    }

    #[instrument(skip(self))]
    async fn fetch_order(&self, remote_order_id: &str) -> Result<RemoteOrder, ServiceError> {
        let response = self
            .client
            .get(format!("{}/orders/{}", self.base_url, remote_order_id))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await
            .map_err(Self::map_transport_error)?;

        Self::parse_order(response).await
    }
}
