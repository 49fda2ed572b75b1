//! # Application State
//!
//! Everything handlers share, built once in `main` and handed to the router.
//!
//! ## State Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         AppState (Clone)                                │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌─────────────┐ │
//! │  │   Database   │  │  SessionHub  │  │ FormRegistry │  │ JwtManager  │ │
//! │  │              │  │              │  │              │  │             │ │
//! │  │ SqlitePool   │  │ watch per    │  │ dialog state │  │ HS256       │ │
//! │  │ ChangeFeed   │  │ token        │  │ per token    │  │             │ │
//! │  └──────────────┘  └──────────────┘  └──────────────┘  └─────────────┘ │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐                  │
//! │  │  AppConfig   │  │CheckoutClient│  │ PostalClient │                  │
//! │  └──────────────┘  └──────────────┘  └──────────────┘                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every field is cheap to clone (pools, `Arc`s, reqwest clients).

pub mod forms;
pub mod session;

use std::sync::Arc;

use moinho_db::Database;

use crate::auth::JwtManager;
use crate::collaborators::checkout::CheckoutClient;
use crate::collaborators::postal::PostalClient;
use crate::collaborators::CollaboratorError;
use crate::config::AppConfig;

pub use forms::FormRegistry;
pub use session::{SessionHub, SessionState};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<AppConfig>,
    pub jwt: Arc<JwtManager>,
    pub sessions: SessionHub,
    pub forms: FormRegistry,
    pub checkout: CheckoutClient,
    pub postal: PostalClient,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Result<Self, CollaboratorError> {
        let jwt = JwtManager::new(config.auth.jwt_secret.clone(), config.auth.token_lifetime_secs);
        let checkout = CheckoutClient::new(config.checkout.clone())?;
        let postal = PostalClient::new(&config.postal)?;

        Ok(AppState {
            db,
            config: Arc::new(config),
            jwt: Arc::new(jwt),
            sessions: SessionHub::new(),
            forms: FormRegistry::new(),
            checkout,
            postal,
        })
    }
}
