pub mod ai;
pub mod availability;
pub mod billing;
pub mod calendar;
pub mod calls;
pub mod config_store;
pub mod email;
pub mod provisioning;
pub mod scheduling;
pub mod tools;
pub mod upstream;
pub mod voice;
