// Allow dead code for items that are part of the public API but only used in tests
#![allow(dead_code)]

pub mod config;
pub mod export;
pub mod filter;
pub mod json_schema;
pub mod parser;
pub mod render;
pub mod schema;

pub use filter::{filter, FilterOptions};
pub use render::{render, Layout, Mode, OutputFormat};
pub use schema::{parse, ParseResult, ParseStats, SchemaModel};
