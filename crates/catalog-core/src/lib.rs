#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod category_tree;
pub mod codec;
pub mod config;
pub mod error;
pub mod facets;
pub mod query;
pub mod text;
pub mod traits;
pub mod types;
