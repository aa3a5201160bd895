//! # askdesk
//!
//! Client orchestration layer for a retrieval-backed knowledge assistant.
//!
//! askdesk coordinates user-initiated operations against a remote
//! retrieval/answer service: submitting questions, recording feedback,
//! uploading documents in batches, and managing destructive analytics
//! actions, while keeping consistent, recoverable state for whatever
//! interface drives it.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐   ┌─────────────────┐   ┌──────────────┐
//! │   ask (CLI)   │──▶│   Controllers    │──▶│ RemoteService │
//! │               │   │ session/upload/  │   │ (reqwest)     │
//! │               │   │ analytics        │   └──────────────┘
//! └───────────────┘   └───────┬─────────┘
//!                             ▼
//!                     ┌──────────────┐
//!                     │ HistoryStore │  (single durable slot)
//!                     └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Typed remote-call error classification |
//! | [`client`] | Remote-service trait and HTTP implementation |
//! | [`history`] | Durable, capped query/answer history |
//! | [`session`] | Query session lifecycle controller |
//! | [`feedback`] | Single-shot feedback recorder |
//! | [`upload`] | Sequential batch upload orchestrator |
//! | [`confirm`] | Two-phase arm/commit delete protocol |
//! | [`analytics`] | All-or-nothing analytics snapshot loader |

pub mod analytics;
pub mod client;
pub mod config;
pub mod confirm;
pub mod error;
pub mod feedback;
pub mod history;
pub mod models;
pub mod session;
pub mod upload;
