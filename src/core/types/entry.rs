use std::path::PathBuf;

/// A single corpus file picked up from a target's entry directories.
///
/// `observed_at` is the file's mtime in seconds since the epoch; the fuzzer
/// wrote the file when it discovered the input, so the mtime is the closest
/// thing we have to a discovery timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: PathBuf,
    pub observed_at: i64,
}

impl Entry {
    pub fn new(path: impl Into<PathBuf>, observed_at: i64) -> Self {
        Self {
            path: path.into(),
            observed_at,
        }
    }
}
