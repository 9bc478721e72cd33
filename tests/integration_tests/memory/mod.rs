#[path = "mod_store.rs"]
mod store_tests;
