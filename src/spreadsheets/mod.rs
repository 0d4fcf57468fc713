pub mod report_xlsx;

pub use report_xlsx::{export_report, ReportCounts};
