//! Navigation and in-place editing of method instruction lists.
//!
//! # Key Types
//! - [`Cursor`] - Owns an instruction list during an edit session and supports pattern,
//!   relative and stack-relative seeks plus insertion, replacement and removal

mod cursor;

pub use cursor::Cursor;
