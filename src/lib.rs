//! Buffered text writers that report failures at write time.
//!
//! [`PrintWriter`] buffers text into any [`std::io::Write`] sink and, like a
//! classic print stream, never returns I/O errors: it only raises a sticky flag.
//! [`CheckedWriter`] wraps such a writer and turns that flag into an
//! [`Error::Write`] every `flush_interval` calls.

mod checked;
mod error;
mod print;

pub use checked::{CheckedWriter, Config, DEFAULT_FLUSH_INTERVAL, DEFAULT_MESSAGE_TEMPLATE};
pub use error::{Error, FormatError, Result};
pub use print::{Locale, Print, PrintWriter, Printable, Template, LINE_SEPARATOR};
