// Test modules

mod analysis_service_test;
pub mod common;
mod feedback_query_test;
