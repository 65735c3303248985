pub mod duplicates;
pub mod file_scanner;

pub use duplicates::{check_duplicates, find_duplicates};
pub use file_scanner::{lexical_path, normalize_path, DirectoryScanner, FileEntry, FileKind};
