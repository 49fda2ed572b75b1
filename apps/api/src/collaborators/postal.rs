//! Postal code (CEP) lookup against a ViaCEP-compatible service.
//!
//! `GET {base}/ws/{cep}/json/`. An unknown CEP comes back as `200` with
//! `{"erro": true}`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{truncate, CollaboratorError};
use crate::config::PostalConfig;

/// Address fields the bakery dialog fills in from a CEP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddress {
    pub postal_code: String,
    pub street: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    logradouro: String,
    #[serde(default)]
    bairro: String,
    #[serde(default)]
    localidade: String,
    #[serde(default)]
    uf: String,
    #[serde(default)]
    erro: Option<serde_json::Value>,
}

impl ViaCepResponse {
    fn is_error(&self) -> bool {
        match &self.erro {
            Some(serde_json::Value::Bool(flag)) => *flag,
            Some(serde_json::Value::String(flag)) => flag == "true",
            _ => false,
        }
    }
}

#[derive(Clone)]
pub struct PostalClient {
    http: reqwest::Client,
    base_url: String,
}

impl PostalClient {
    pub fn new(config: &PostalConfig) -> Result<Self, CollaboratorError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(PostalClient {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Looks up an 8-digit CEP. `None` when the service doesn't know it.
    pub async fn lookup(&self, cep: &str) -> Result<Option<PostalAddress>, CollaboratorError> {
        let url = format!("{}/ws/{}/json/", self.base_url, cep);
        debug!(%cep, "Looking up postal code");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Status {
                status: status.as_u16(),
                body: truncate(&text),
            });
        }

        let found: ViaCepResponse = response.json().await?;
        if found.is_error() {
            return Ok(None);
        }

        Ok(Some(PostalAddress {
            postal_code: cep.to_string(),
            street: found.logradouro,
            neighborhood: found.bairro,
            city: found.localidade,
            state: found.uf,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::test_server;
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn viacep(Path(cep): Path<String>) -> (StatusCode, Json<Value>) {
        match cep.as_str() {
            "01310100" => (
                StatusCode::OK,
                Json(json!({
                    "cep": "01310-100",
                    "logradouro": "Avenida Paulista",
                    "bairro": "Bela Vista",
                    "localidade": "São Paulo",
                    "uf": "SP"
                })),
            ),
            "99999999" => (StatusCode::OK, Json(json!({ "erro": "true" }))),
            _ => (StatusCode::BAD_REQUEST, Json(json!({}))),
        }
    }

    async fn client() -> PostalClient {
        let base_url = test_server::spawn(Router::new().route("/ws/{cep}/json/", get(viacep))).await;
        PostalClient::new(&PostalConfig {
            base_url,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_lookup_found() {
        let address = client().await.lookup("01310100").await.unwrap().unwrap();
        assert_eq!(address.street, "Avenida Paulista");
        assert_eq!(address.city, "São Paulo");
        assert_eq!(address.state, "SP");
    }

    #[tokio::test]
    async fn test_lookup_not_found_and_failure() {
        let client = client().await;
        assert!(client.lookup("99999999").await.unwrap().is_none());
        assert!(matches!(
            client.lookup("00000000").await,
            Err(CollaboratorError::Status { status: 400, .. })
        ));
    }
}
