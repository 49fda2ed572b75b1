//! # Outbound Collaborators
//!
//! Third-party HTTP services the API delegates to:
//!
//! - [`checkout`] - Mercado Pago monthly subscription (pre-approval)
//! - [`postal`] - Brazilian postal code (CEP) lookup
//!
//! Neither is retried. A failure surfaces as `502 UPSTREAM_ERROR`.

pub mod checkout;
pub mod postal;

use tracing::error;

use crate::error::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Upstream response is missing {0}")]
    MissingField(&'static str),
}

impl From<CollaboratorError> for ApiError {
    fn from(err: CollaboratorError) -> Self {
        error!(error = %err, "Collaborator call failed");
        match err {
            CollaboratorError::NotConfigured(what) => {
                ApiError::upstream(format!("{} is not available right now", what))
            }
            _ => ApiError::upstream("The external service did not respond as expected"),
        }
    }
}

/// Keeps error bodies short enough to log.
pub(crate) fn truncate(body: &str) -> String {
    const MAX: usize = 300;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod test_server {
    use axum::Router;
    use tokio::net::TcpListener;

    /// Serves `router` on an ephemeral local port and returns its base URL.
    pub async fn spawn(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }
}
