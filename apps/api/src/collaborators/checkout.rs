//! Mercado Pago subscription checkout.
//!
//! Creates a pending monthly pre-approval for the payer and returns the
//! hosted checkout URL (`init_point`). Payment itself happens on Mercado
//! Pago's pages.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{truncate, CollaboratorError};
use crate::config::CheckoutConfig;

#[derive(Debug, Serialize)]
struct PreapprovalRequest<'a> {
    reason: &'a str,
    auto_recurring: AutoRecurring<'a>,
    back_url: &'a str,
    payer_email: &'a str,
    payer_first_name: &'a str,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct AutoRecurring<'a> {
    frequency: u32,
    frequency_type: &'static str,
    transaction_amount: serde_json::Number,
    currency_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct PreapprovalResponse {
    id: Option<String>,
    init_point: Option<String>,
}

#[derive(Clone)]
pub struct CheckoutClient {
    http: reqwest::Client,
    config: CheckoutConfig,
}

impl CheckoutClient {
    pub fn new(config: CheckoutConfig) -> Result<Self, CollaboratorError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(CheckoutClient { http, config })
    }

    /// Creates a pending monthly subscription and returns its checkout URL.
    pub async fn create_subscription(&self, payer_email: &str, payer_name: &str) -> Result<String, CollaboratorError> {
        let token = self
            .config
            .access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(CollaboratorError::NotConfigured("Checkout"))?;

        let amount = serde_json::Number::from_str(&self.config.amount.normalize().to_string())
            .map_err(|_| CollaboratorError::NotConfigured("Checkout amount"))?;

        let body = PreapprovalRequest {
            reason: &self.config.reason,
            auto_recurring: AutoRecurring {
                frequency: 1,
                frequency_type: "months",
                transaction_amount: amount,
                currency_id: &self.config.currency,
            },
            back_url: &self.config.back_url,
            payer_email,
            payer_first_name: payer_name,
            status: "pending",
        };

        let url = format!("{}/preapproval", self.config.base_url.trim_end_matches('/'));
        let response = self.http.post(url).bearer_auth(token).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Status {
                status: status.as_u16(),
                body: truncate(&text),
            });
        }

        let created: PreapprovalResponse = response.json().await?;
        match created.init_point {
            Some(url) if !url.is_empty() => {
                info!(preapproval_id = ?created.id, "Subscription checkout created");
                Ok(url)
            }
            _ => {
                warn!(preapproval_id = ?created.id, "Pre-approval created without init_point");
                Err(CollaboratorError::MissingField("init_point"))
            }
        }
    }
}
