//! Parsing, canonicalization and merging of `authorized_keys` data.

mod error;
pub use error::{Error, ErrorKind};

mod entry;
pub use entry::{Entry, Identity};

mod table;
pub use table::KeyTable;
