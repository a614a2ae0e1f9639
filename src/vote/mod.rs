//! Anonymous like/vote endpoint.
//!
//! Devices identify themselves with a client-generated fingerprint; each
//! `(item, fingerprint)` pair is either loved or not, and a POST flips it.

pub mod config;
pub mod cors;
pub mod error;
pub mod handler;
pub mod service;
pub mod store;

pub use config::VoteConfig;
pub use cors::CorsPolicy;
pub use error::VoteError;
pub use handler::{vote_route, VoteEndpoint};
pub use service::{ToggleOutcome, VoteRequest, VoteService};
pub use store::{ItemVotes, LikeStore, NewLike, RateWindow, SqliteLikeStore};

#[cfg(test)]
mod tests;
