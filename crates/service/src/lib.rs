//! Service layer providing the storefront business operations on top of models.
//! - Separates business logic from data access and from HTTP.
//! - Reuses validation and entity definitions in the `models` crate.
//! - Every operation returns `ServiceError` so the server maps failures in one place.

pub mod errors;
pub mod pagination;
pub mod pricing;
pub mod mail;
pub mod auth;
pub mod roles;
pub mod addresses;
pub mod catalog;
pub mod coupons;
pub mod cart;
pub mod payment;
pub mod orders;
pub mod reviews;
pub mod admin;
#[cfg(test)]
pub mod test_support;
