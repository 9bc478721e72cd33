#[path = "prop_filter.rs"]
mod filter_props;
#[path = "prop_rewrite.rs"]
mod rewrite_props;
#[path = "prop_lifecycle.rs"]
mod lifecycle_props;
