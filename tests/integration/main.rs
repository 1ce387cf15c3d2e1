//! Integration tests for the edulink client
//! These run the reqwest transport against local mock servers

pub mod test_harness;

pub mod gateway_test;
pub mod session_flow_test;
