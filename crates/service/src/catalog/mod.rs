//! Product catalog: products with nested attributes and options, images and
//! a category tree. Reads are public; writes are gated by role in the server.

pub mod products;
pub mod attributes;
pub mod images;
pub mod categories;

pub use products::{BulkReport, ProductInput, ProductUpdate};
