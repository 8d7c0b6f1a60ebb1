// Integration tests: the driver against scripted collaborators, plus plan
// loading from disk.

#[path = "../common/mod.rs"]
mod common;

mod config_errors;
mod failures;
mod publishing;
