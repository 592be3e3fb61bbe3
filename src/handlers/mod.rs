//! Handler modules, one per Lambda function

pub mod cart;
pub mod orders;
pub mod plants;
pub mod settings;
pub mod users;
