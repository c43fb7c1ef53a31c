//! Physical descriptions of the rows flowing through a query.

pub mod export;
pub mod ids;
pub mod slot;
pub mod table;
pub mod tuple;
