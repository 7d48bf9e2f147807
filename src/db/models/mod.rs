//! SeaORM entity models

pub mod chunk;
pub mod doc;
