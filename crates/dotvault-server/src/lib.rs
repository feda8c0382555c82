// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! dotvault HTTP server.
//!
//! Stores `.env` files encrypted under a caller passphrase, one immutable
//! version per upload, behind API key authentication and two-phase rate
//! limiting.

pub mod api;
pub mod api_docs;
pub mod auth_middleware;
pub mod client_info;
pub mod error;
pub mod guard;
pub mod metrics;
pub mod routes;
pub mod validation;

pub use api::{create_app_state, create_app_state_with_backends, create_router, AppState};
pub use api_docs::ApiDoc;
pub use error::ServerError;
pub use dotvault_server_config::ServerConfig;
