//! Type definitions for rosapi

pub mod reply;
pub mod sentence;

pub use reply::Reply;
pub use sentence::{Pair, Sentence};
