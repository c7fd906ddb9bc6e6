use std::path::PathBuf;

/// What happened to one source file in a conversion batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Converted,
    Unchanged,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub status: FileStatus,
    /// Transformed text, present when the file changed and output was not
    /// written back in place.
    pub output: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ConvertResult {
    pub outcomes: Vec<FileOutcome>,
    pub files_converted: usize,
    pub files_unchanged: usize,
    pub files_failed: usize,
}
