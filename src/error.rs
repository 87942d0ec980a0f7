use thiserror::Error;

use crate::assembly::Opcode;

macro_rules! unsupported_error {
    // Single string version
    ($opcode:expr, $msg:expr) => {
        crate::Error::Unsupported {
            opcode: $opcode,
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($opcode:expr, $fmt:expr, $($arg:tt)*) => {
        crate::Error::Unsupported {
            opcode: $opcode,
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Only genuine caller/model mismatches are errors. Not finding a pattern and failing to infer a
/// type are regular outcomes and are reported through `Option` values and sentinel cursor
/// positions instead.
///
/// # Error Categories
///
/// - [`Error::Unsupported`] - An opcode reached the stack effect model without a usable table
///   entry for its shape (e.g. a `call` without a method descriptor)
/// - [`Error::InvalidCursorState`] - An operation was invoked on a cursor after its instruction
///   list was released
/// - [`Error::Error`] - Miscellaneous failures, mostly from user supplied patch transforms
///
/// # Examples
///
/// ```rust
/// use cilsplice::{injector::Cursor, Error};
///
/// let mut cursor = Cursor::new(Vec::new());
/// let _instructions = cursor.release()?;
///
/// match cursor.release() {
///     Err(Error::InvalidCursorState) => println!("cursor already released"),
///     other => panic!("unexpected {other:?}"),
/// }
/// # Ok::<(), cilsplice::Error>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// An opcode has no stack effect that can be derived for this instruction.
    ///
    /// Raised when an opcode whose table entry is variable is not call-shaped, or when a
    /// call-shaped opcode carries an operand that is not a method descriptor. This indicates a
    /// mismatch between the caller's instruction model and the engine, the current patch attempt
    /// should be abandoned.
    ///
    /// # Fields
    ///
    /// * `opcode` - The offending opcode
    /// * `message` - Detailed description of the mismatch
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Unsupported {opcode} - {file}:{line}: {message}")]
    Unsupported {
        /// The opcode that could not be processed
        opcode: Opcode,
        /// The message to be printed for the Unsupported error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The cursor has already released its instruction list.
    ///
    /// Once [`crate::injector::Cursor::release`] handed the list back to the caller, every
    /// further operation on that cursor fails with this error. It always indicates a programming
    /// error at the call site.
    #[error("The cursor has already released its instruction list")]
    InvalidCursorState,

    /// Generic error for miscellaneous failures.
    ///
    /// Used for errors that don't fit into other categories, such as failures reported by
    /// user supplied patch transforms.
    #[error("{0}")]
    Error(String),
}
