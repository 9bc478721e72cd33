#[path = "mod_read.rs"]
mod read_tests;
#[path = "mod_aggregate.rs"]
mod aggregate_tests;
#[path = "mod_lifecycle.rs"]
mod lifecycle_tests;
#[path = "mod_strategy.rs"]
mod strategy_tests;
#[path = "mod_audit.rs"]
mod audit_tests;
