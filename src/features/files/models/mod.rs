mod file;

pub use file::{File, FileState, NewFile, StorageUsage};
