pub mod io;

pub use io::{open_reader, read_log_text};
