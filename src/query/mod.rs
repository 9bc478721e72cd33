// Submodules for separation of concerns
mod eval;
mod parse;
mod types;
mod update;

pub use eval::{compare_bson, compare_docs, eval_filter, project_fields};
pub(crate) use eval::{as_f64, get_path};
pub use parse::{compile_criteria, parse_sort};
pub(crate) use parse::truthy;
pub(crate) use types::{MAX_LIMIT, MAX_PROJECTION_FIELDS};
pub use types::{CmpOp, Filter, FindOptions, Order, Query, SortSpec, UpdateDoc, UpdateReport};
pub use update::apply_update;
