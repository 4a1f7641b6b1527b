//! Segmented zero-copy byte buffers.
//!
//! - [`Raw`]: an owned memory region with an allocation policy
//! - [`View`]: a reference-counted window into a [`Raw`]
//! - [`BufferList`]: an ordered sequence of views forming a logical byte string
//!
//! # Overview
//!
//! A [`BufferList`] is the unit of I/O and serialization: bytes arrive from
//! the network as lists of views, move between lists without copying
//! ([`BufferList::append_list`], [`BufferList::claim_append`],
//! [`BufferList::substr_of`], [`BufferList::splice`]), and are flattened only
//! when a caller demands contiguity ([`BufferList::contiguous`]).
//!
//! Cloning a [`View`] is cheap and does not copy: views share ownership of
//! their backing [`Raw`], which is freed when the last view drops.
//!
//! # Thread Safety
//!
//! Reference counts and the process-wide allocation counter are the only
//! state shared between handles, and both are atomic. The bytes inside a raw
//! are not synchronized: a writer must hold exclusivity by construction
//! (typically it is the unique writer into an append arena, or the sole owner
//! of a freshly created view).
//!
//! # Example
//!
//! ```
//! use reef_buffer::BufferList;
//!
//! let mut bl = BufferList::new();
//! bl.append(b"hello ");
//! bl.append(b"world");
//! assert_eq!(bl.length(), 11);
//!
//! let mut tail = BufferList::new();
//! tail.substr_of(&bl, 6, 5);
//! assert_eq!(tail.contiguous(), b"world");
//! ```

mod list;
mod raw;
mod view;

pub use list::BufferList;
pub use raw::{Raw, PAGE_SIZE};
pub use view::View;

use std::sync::atomic::{AtomicUsize, Ordering};

/// Cumulative bytes currently held by all heap and page-aligned raws.
static TOTAL_ALLOC: AtomicUsize = AtomicUsize::new(0);

/// Returns the number of bytes currently held by all allocated raws.
///
/// Static raws wrap externally owned memory and are not counted.
pub fn allocated() -> usize {
    TOTAL_ALLOC.load(Ordering::Relaxed)
}

pub(crate) fn inc_total_alloc(len: usize) {
    TOTAL_ALLOC.fetch_add(len, Ordering::Relaxed);
}

pub(crate) fn dec_total_alloc(len: usize) {
    TOTAL_ALLOC.fetch_sub(len, Ordering::Relaxed);
}
