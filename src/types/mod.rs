//! Type/value trees: declared record shapes and the mapping state bound to them.
pub mod dm_type;
pub mod resolve;
pub mod value;

pub use dm_type::*;
pub use resolve::*;
pub use value::*;
