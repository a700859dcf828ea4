//! # API Route Modules
//!
//! - `registration`: phone number checks (single, batch, format) and the
//!   pairing session endpoints.
//! - `postal`: Brazilian postal code validation via ViaCEP. Mounted only
//!   when postal validation is enabled.
//! - `status`: unauthenticated liveness and status probes.

pub mod postal;
pub mod registration;
pub mod status;
