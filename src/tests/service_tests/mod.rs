mod catalog_tests;
mod cleanup_tests;
mod inventory_tests;
mod loan_tests;
mod report_tests;
mod transport_tests;
