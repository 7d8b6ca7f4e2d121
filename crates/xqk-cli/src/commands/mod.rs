pub mod completion;
pub mod dispatch;
pub mod monitor;
pub mod project;
pub mod quota;
pub mod report;
