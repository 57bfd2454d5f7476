//! Byte encoding of products stored next to the flattened index fields.

use crate::error::{Error, Result};
use crate::types::Product;

pub fn encode(product: &Product) -> Result<Vec<u8>> {
    serde_json::to_vec(product).map_err(Error::backend)
}

pub fn decode(bytes: &[u8]) -> Result<Product> {
    serde_json::from_slice(bytes).map_err(Error::backend)
}
