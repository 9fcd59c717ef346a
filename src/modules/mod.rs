pub mod alert;
pub mod monitoring;
