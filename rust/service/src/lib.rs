//! # reversi-service: Persisted Othello Match Lifecycle
//!
//! The match lifecycle layer over [`reversi_engine`]: per-match turn and
//! status state machine, pass/stalemate detection, resignation and draw
//! negotiation, mediated through a keyed record store with conditional
//! updates. Routing, credential handling and session issuance live outside
//! this crate; operations receive verified player handles.
//!
//! ## Core Modules
//!
//! - [`lifecycle`] - [`MatchService`] and the operation set over match records
//! - [`store`] - Record shape and the keyed store boundary, plus [`MemoryStore`]
//! - [`identity`] - The identity-directory boundary consumed at creation
//! - [`errors`] - Error envelope and HTTP status mapping
//! - [`logging`] - Tracing bootstrap

pub mod errors;
pub mod identity;
pub mod lifecycle;
pub mod logging;
pub mod store;

pub use errors::{ErrorResponse, ErrorSeverity, IntoErrorResponse};
pub use identity::{IdentityDirectory, IdentityError, StaticDirectory};
pub use lifecycle::{MatchError, MatchOutcome, MatchService, MatchView};
pub use logging::init_logging;
pub use store::{MatchId, MatchRecord, MatchStatus, MatchStore, MemoryStore, StoreError};
