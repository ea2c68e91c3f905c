//! # Domain Value Objects
//!
//! Immutable value types that represent domain concepts without identity.
//!
//! ## Value Objects
//!
//! - **DirectPair**: Normalised, unordered pair of users of a direct conversation

mod direct_pair;

pub use direct_pair::DirectPair;
