//! Unit tests, organised per module.

pub(crate) mod gate_tests;
pub(crate) mod jwt_tests;
pub(crate) mod session_tests;
pub(crate) mod sigv4_tests;
pub(crate) mod upstream_tests;
pub(crate) mod xml_tests;
