pub mod io;

pub use io::{atomic_write, format_of, read_document};
