use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Where AFL-style fuzzers leave their stats file, relative to an entry
/// directory. The queue dir usually sits next to `fuzzer_stats`, so the
/// parent is checked first.
const STATS_LOCATIONS: [&str; 2] = ["../fuzzer_stats", "fuzzer_stats"];

/// Finds the first stats file reachable from any of the entry directories,
/// in directory order.
pub fn discover(entry_dirs: &[PathBuf]) -> Option<PathBuf> {
    for dir in entry_dirs {
        for location in STATS_LOCATIONS {
            let candidate = dir.join(location);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

/// Extracts the `start_time` field from a stats file. The file holds
/// `key : value` lines; the value is the campaign start as a unix
/// timestamp.
pub fn parse_start_time(path: &Path) -> io::Result<i64> {
    let contents = fs::read_to_string(path)?;
    for line in contents.lines() {
        if line.contains("start_time") {
            let value = line
                .split_whitespace()
                .nth(2)
                .ok_or_else(|| malformed(path, line))?;
            return value.parse().map_err(|_| malformed(path, line));
        }
    }
    Err(io::Error::new(
        io::ErrorKind::InvalidData,
        format!("no start_time line in {}", path.display()),
    ))
}

fn malformed(path: &Path, line: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("malformed start_time line in {}: {line}", path.display()),
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const STATS: &str = "\
start_time        : 1693584000
last_update       : 1693590000
execs_done        : 1000
";

    #[test]
    fn parses_start_time_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fuzzer_stats");
        fs::write(&path, STATS).unwrap();
        assert_eq!(parse_start_time(&path).unwrap(), 1693584000);
    }

    #[test]
    fn missing_start_time_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fuzzer_stats");
        fs::write(&path, "execs_done : 12\n").unwrap();
        assert!(parse_start_time(&path).is_err());
    }

    #[test]
    fn unparseable_value_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fuzzer_stats");
        fs::write(&path, "start_time : soon\n").unwrap();
        assert!(parse_start_time(&path).is_err());
    }

    #[test]
    fn discovery_prefers_the_parent_location() {
        let dir = tempfile::tempdir().unwrap();
        let queue = dir.path().join("queue");
        fs::create_dir(&queue).unwrap();
        fs::write(dir.path().join("fuzzer_stats"), STATS).unwrap();
        fs::write(queue.join("fuzzer_stats"), STATS).unwrap();

        let found = discover(&[queue.clone()]).unwrap();
        assert_eq!(found, queue.join("../fuzzer_stats"));
    }

    #[test]
    fn discovery_walks_directories_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a/queue");
        let second = dir.path().join("b/queue");
        fs::create_dir_all(&first).unwrap();
        fs::create_dir_all(&second).unwrap();
        fs::write(second.join("fuzzer_stats"), STATS).unwrap();

        let found = discover(&[first, second.clone()]).unwrap();
        assert_eq!(found, second.join("fuzzer_stats"));
    }

    #[test]
    fn discovery_can_come_up_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover(&[dir.path().to_path_buf()]).is_none());
    }
}
