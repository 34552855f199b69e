//! Authentication and access control core for the Usher platform.
//!
//! Session token issuance and verification, passwordless (magic-link) and
//! password-reset flows, and the request-time authorization gate that maps
//! multi-role identities to protected routes. Commerce and ticketing
//! handlers live elsewhere and are only ever reached after this core grants
//! access.

pub mod api;
pub mod cli;
