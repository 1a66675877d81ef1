//! Byte-level input/output: the binary cursor, output writers, and the
//! named file-buffer collection the pipeline reads from.

mod file_list;
mod reader;
mod writer;

pub use file_list::{file_extension, File, FileList, FileSource};
pub use reader::{BinaryReader, Endianness};
pub use writer::{BinaryWriter, TextWriter};
