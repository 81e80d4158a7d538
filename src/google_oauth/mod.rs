pub mod credentials;
pub mod endpoints;
pub mod service;
pub mod utils;
