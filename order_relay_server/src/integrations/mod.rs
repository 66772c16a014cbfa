pub mod courier;
pub mod shopify;
