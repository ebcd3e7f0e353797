//! Exchange integration module
//!
//! Exchange variants, the HTTP transport seam, the retrying requester and
//! the row normalizer.

pub mod client;
pub mod normalize;
pub mod requester;
pub mod transport;

pub use client::*;
pub use normalize::*;
pub use requester::*;
pub use transport::*;
