//! I/O utilities.
//!
//! Reading inputs from files or stdin (memory-mapping large files),
//! writing outputs, and Unicode-safe slicing.

pub mod reader;
pub mod unicode;

pub use reader::{FileContent, FileReader, STDIN_PATH, read_file, read_input, read_stream, write_file};
pub use unicode::{find_char_boundary, preview, truncate_graphemes};
