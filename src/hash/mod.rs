//! Hash-based LZ77 backward-reference matchers.
//!
//! Five interchangeable algorithm families index window positions by a
//! rolling hash of the next 4–8 bytes and answer "where did I last see this
//! prefix"; [`types::Hasher`] binds the variant chosen for a stream.

pub mod binary_tree;
pub mod forgetful_chain;
pub mod longest_match;
pub mod quickly;
pub mod types;

pub use types::{Hasher, HasherCommon, HasherSearchResult};
