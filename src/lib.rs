pub mod bridge;
pub mod broker;
pub mod cache;
pub mod cli;
pub(crate) mod constants;
pub mod error;
pub mod gate;
pub mod jwks;
pub mod jwt;
pub(crate) mod logging;
pub mod report;
pub mod router;
pub mod server;
pub mod session;
pub mod sigv4;
pub mod store;
pub mod upstream;
pub mod xml;

#[cfg(test)]
pub(crate) mod tests;
