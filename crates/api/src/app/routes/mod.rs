pub mod admin;
pub mod products;
pub mod system;
