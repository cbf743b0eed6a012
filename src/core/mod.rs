pub mod message;
pub mod provider;
