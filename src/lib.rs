//! Function Server Library
//!
//! Lets authors register business functions under a stable name and have them
//! served over HTTP, either as immediate calls or as polled background jobs,
//! without writing any transport or concurrency code.
//!
//! ## Modules
//! - **`executor`**: The registration-and-execution engine: registry, contracts,
//!   job store, worker pool and the `invoke`/`poll` dispatch facade.
//! - **`udfs`**: The financial functions served by the binary (NPV, duration,
//!   Monte Carlo scenario).
//! - **`server`** / **`auth`**: Axum router and API key middleware.
//! - **`config`**, **`error`**, **`logging`**: Environment configuration, the
//!   error taxonomy and tracing setup.

pub mod auth;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod server;
pub mod udfs;
