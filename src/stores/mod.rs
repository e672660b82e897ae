pub mod admin;
pub mod expense;
pub mod menu;
pub mod report;

pub use admin::AdminStore;
pub use expense::GastoStore;
pub use menu::MenuStore;
pub use report::ReportStore;
