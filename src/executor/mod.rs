//! Function Execution Engine
//!
//! Decouples what a registered function computes from how it is invoked and
//! tracked.
//!
//! ## Architecture Overview
//! 1. **Registration**: At startup, functions are declared on a `RegistryBuilder`
//!    with a name, an execution mode and typed request/response contracts. The
//!    builder is then frozen into a read-only `UdfRegistry`.
//! 2. **Validation**: Every call validates its raw JSON input against the
//!    request contract before anything runs.
//! 3. **Execution**: Sync functions run inline and return their response.
//!    Async functions become jobs on a bounded worker pool; the caller gets a
//!    job id back immediately.
//! 4. **Tracking**: Jobs move `queued -> running -> done | error` in the
//!    in-memory `JobStore`, where callers poll them.
//!
//! ## Submodules
//! - **`contract`**: Request validation and response serialization.
//! - **`registry`**: Name -> handler mapping, frozen after startup.
//! - **`store`**: Job state machine and retention sweeper.
//! - **`executor`**: Inline execution and the async worker pool.
//! - **`dispatch`**: The `invoke` / `poll` facade.
//! - **`protocol`** / **`handlers`**: HTTP DTOs and Axum handlers.

pub mod contract;
pub mod dispatch;
pub mod executor;
pub mod handlers;
pub mod protocol;
pub mod registry;
pub mod store;
pub mod types;
