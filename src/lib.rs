//! A skiplist is a way of storing elements in such a way that elements can be efficiently
//! accessed, inserted and removed, all in `O(log(n))` on average.
//!
//! Conceptually, a skiplist resembles something like:
//!
//! ```text
//! <head> ----------> [2] --------------------------------------------------> [9] ---------->
//! <head> ----------> [2] ------------------------------------[7] ----------> [9] ---------->
//! <head> ----------> [2] ----------> [4] ------------------> [7] ----------> [9] --> [10] ->
//! <head> --> [1] --> [2] --> [3] --> [4] --> [5] --> [6] --> [7] --> [8] --> [9] --> [10] ->
//! ```
//!
//! where we each node `[x]` has references to nodes further down the list, allowing the algorithm
//! to effectively skip ahead.
//!
//! The [`RankedSkipList`] in this crate additionally records, for every link, how many
//! elements it skips over. Adding up those widths along a search path yields the position of
//! an element, so the `k`-th smallest element can be retrieved in `O(log(n))` as well:
//!
//! ```
//! use ranked_skiplist::RankedSkipList;
//!
//! let mut skiplist: RankedSkipList<_> = [3, 6, 7, 9, 12].into_iter().collect();
//! assert_eq!(skiplist.get(2), Some(&7));
//! assert_eq!(skiplist.remove(&7), Some(7));
//! assert_eq!(skiplist.get(2), Some(&9));
//! assert_eq!(skiplist.index_of(&12), Some(3));
//! ```
//!
//! The list behaves as a set: inserting an element equal to one already present leaves the
//! list unchanged.

mod level_generator;
mod ranked_skiplist;
mod skipnode;

pub use level_generator::{
    Geometric, GeometricError, LevelGenerator, draw_height,
    geometric::{DEFAULT_MAX_HEIGHT, DEFAULT_P},
    recommended_height,
};
pub use ranked_skiplist::{IntoIter, Iter, Levels, RankedSkipList};
