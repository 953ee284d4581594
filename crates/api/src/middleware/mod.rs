//! Request extractors.
//!
//! - [`actor::Actor`] -- the acting user, read from `X-User-Id` / `X-User-Role`.

pub mod actor;
