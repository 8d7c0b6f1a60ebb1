// Property tests for barrier counting and whole-run ordering.

#[path = "../common/mod.rs"]
mod common;

mod driver;
