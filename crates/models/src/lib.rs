pub mod errors;
pub mod db;

pub mod user;
pub mod user_credentials;
pub mod user_role;
pub mod user_role_assignment;
pub mod user_confirmation;
pub mod user_session;
pub mod user_session_token;
pub mod address;

pub mod product_category;
pub mod product;
pub mod product_attribute;
pub mod product_attribute_option;
pub mod product_image;

pub mod coupon;
pub mod coupon_product;
pub mod cart;
pub mod cart_item;

pub mod order_receiver;
pub mod order;
pub mod order_address;
pub mod order_item;
pub mod review;

#[cfg(test)]
mod tests;
