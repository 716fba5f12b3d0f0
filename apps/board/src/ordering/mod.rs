// Candidate ordering: automatic sort, persisted manual order, and the resolver
// that composes them into the rendered list.

pub mod manual;
pub mod resolver;
pub mod sort;
pub mod sort_mode;

pub use manual::{BoardPreferences, ManualOrderStore};
pub use resolver::resolve_order;
pub use sort::sort_candidates;
pub use sort_mode::SortMode;
