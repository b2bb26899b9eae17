//! Renderer-facing views over the completed block list

mod pagination;
mod table;

pub use pagination::{PageMarker, Paginator, DEFAULT_MAX_VISIBLE_PAGES, DEFAULT_PAGE_SIZE};
pub use table::{tabulate, ReviewRow, ReviewStatistics};
