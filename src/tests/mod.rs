mod cli_tests;
mod service_tests;
pub mod utils;
