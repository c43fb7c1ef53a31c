pub mod arrays;
pub mod ast;
pub mod catalog;
pub mod config;
pub mod descriptor;
pub mod eval;
pub mod expr;
pub mod logical;
