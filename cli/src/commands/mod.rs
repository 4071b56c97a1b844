pub mod devices;
pub mod instances;
pub mod watch;
