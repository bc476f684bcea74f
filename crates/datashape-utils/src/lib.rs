pub mod file_discovery;

pub use file_discovery::FileDiscovery;
