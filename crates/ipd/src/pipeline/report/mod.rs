mod summary;
pub mod views;

pub use summary::{DatasetTables, FilteredTables, ReportOptions};
pub use views::DashboardReport;
