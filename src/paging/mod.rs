//! Stitching of paginated list endpoints into one ordered sequence.
//!
//! A `PagedList` owns the windows fetched so far for one list, fetches new
//! ones strictly one after another (each request is built from the previous
//! window's trailing cursor) and serves already fetched pages without a call.

mod list;
mod window;

pub use list::{DisplayRange, ListState, PagedList};
pub use window::{Page, PageCursor, PageRequest, PageSource, PageWindow};
