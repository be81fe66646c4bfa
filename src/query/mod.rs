// Submodules for separation of concerns
mod eval;
mod exec;
mod paginate;
mod types;

pub use eval::{compare_values, cond_matches, matches, values_equal};
pub use exec::Query;
pub use paginate::Page;
pub use types::{Cond, Matcher, Order};
