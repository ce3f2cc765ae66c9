//!  Storage is organized through [store::Store] on top of a [document_storage::DocumentStorage].
//!  The basic idea is:
//!   - There is one json document holding every collection.
//!   - Collections (`clients`, `timeEntries`) are ordered arrays of flat objects.
//!   - Every change rewrites the whole document.

pub mod document_storage;
pub mod entities;
pub mod ids;
pub mod store;
