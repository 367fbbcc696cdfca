pub mod dashboard;
pub mod facilities;
pub mod settings;
