pub mod args;
pub mod commands;
pub mod root;

pub use args::{validate_scan_args, Args, Commands, RulesAction, ScanArgs};
pub use root::RootCommand;
