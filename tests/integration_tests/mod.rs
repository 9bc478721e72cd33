// Aggregates per-module test suites
mod memory;
mod softdelete;
mod utils;
