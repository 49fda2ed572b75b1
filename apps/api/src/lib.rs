//! # Moinho API
//!
//! HTTP server behind the Moinho dashboards: accounts and sessions, CRUD for
//! flours, bakeries, clients and sales, dialog sessions, live lists over
//! server-sent events, and the checkout and postal collaborators.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Moinho API                                      │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  auth routes   │  │ entity routes  │  │  forms routes              ││
//! │  │                │  │                │  │                            ││
//! │  │ • signup/login │  │ • flours       │  │ • open (add / edit)        ││
//! │  │ • logout       │  │ • bakeries     │  │ • submit (one in flight)   ││
//! │  │ • session (SSE)│  │ • clients      │  │ • cancel                   ││
//! │  └────────────────┘  │ • sales        │  └────────────────────────────┘│
//! │                      └────────────────┘                                │
//! │  ┌────────────────┐  ┌────────────────┐                                │
//! │  │  live routes   │  │ billing routes │──► Mercado Pago, ViaCEP        │
//! │  │ (SSE snapshots)│  │                │                                │
//! │  └────────────────┘  └────────────────┘                                │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  AppState: Database + ChangeFeed • SessionHub • FormRegistry     │  │
//! │  │            JwtManager • AppConfig • collaborator clients         │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Defaults, then `moinho.toml`, then `MOINHO_*` environment variables
//! (see [`config`]). For example:
//! - `MOINHO_SERVER__PORT` - HTTP port (default: 8080)
//! - `MOINHO_DATABASE__PATH` - SQLite file (default: `moinho.db`)
//! - `MOINHO_AUTH__JWT_SECRET` - Secret for JWT signing
//! - `MOINHO_CHECKOUT__ACCESS_TOKEN` - Mercado Pago access token

pub mod auth;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

// Re-exports
pub use config::AppConfig;
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
