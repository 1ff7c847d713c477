pub mod audit_logs;
pub mod billing;
pub mod context;
pub mod organizations;
pub mod pages;
pub mod projects;
