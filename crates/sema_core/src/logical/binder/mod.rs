//! Semantic analysis of query blocks.

pub mod analyzer;
pub mod bind_query;
pub mod expr_binder;
pub mod from_clause;
pub mod resolve;
pub mod table_ref;
