//! Shared building blocks for the storefront crates: logging setup,
//! health types, runtime directory checks and the user-facing message catalog.

pub mod types;
pub mod utils;
pub mod env;
pub mod messages;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_type_ok() {
        let h = types::Health { status: "ok" };
        assert_eq!(h.status, "ok");
    }
}
