#[path = "mod_config.rs"]
mod config_tests;
#[path = "mod_logger.rs"]
mod logger_tests;
