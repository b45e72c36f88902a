pub mod deployment;
pub mod proc_loader;
pub mod settings;
