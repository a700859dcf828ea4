#![deny(missing_docs)]

//! # regcheck-core: Batch Validation Core
//!
//! This crate holds the orchestration logic shared by every validation
//! surface in the workspace: phone-number registration checks and Brazilian
//! postal code (CEP) checks. It performs no HTTP itself. The external
//! services sit behind the [`LookupCollaborator`] trait and are supplied by
//! `regcheck-client` (or by test stubs).
//!
//! ## Control Flow
//!
//! ```text
//! caller → ReadinessGate → check_batch → (Normalizer → check_one)* → BatchResult
//! ```
//!
//! ## Design Principles
//!
//! 1. **Normalization is total.** [`Normalizer::normalize`] never fails; a
//!    malformed identifier becomes [`NormalizedIdentifier::Invalid`] and is
//!    short-circuited before any outbound call.
//!
//! 2. **Per-item isolation.** A collaborator error, timeout, or panic for one
//!    identifier is folded into that item's [`LookupOutcome`]. Only the
//!    structural [`BatchError`]s (empty, oversized) reject a whole batch.
//!
//! 3. **Explicit session ownership.** The registration session is an owned
//!    [`SessionHandle`] driven by [`SessionSupervisor`] from collaborator
//!    events. Request handlers only ever read it through [`ReadinessGate`].

pub mod batch;
pub mod checker;
pub mod error;
pub mod identifier;
pub mod lifecycle;
pub mod lookup;
pub mod outcome;
pub mod readiness;

pub use batch::{check_batch, BatchConfig};
pub use checker::check_one;
pub use error::{BatchError, IdentifierError, LookupError};
pub use identifier::{
    format_postal_code, NormalizationPolicy, NormalizedIdentifier, Normalizer, PhoneNormalizer,
    PostalNormalizer, RawIdentifier,
};
pub use lifecycle::{RestartPolicy, SessionController, SessionEvent, SessionSupervisor};
pub use lookup::LookupCollaborator;
pub use outcome::{BatchResult, ItemResult, LookupOutcome};
pub use readiness::{ReadinessGate, SessionHandle, SessionSnapshot, SessionState};
