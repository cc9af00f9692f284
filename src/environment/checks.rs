use std::io::BufRead;
use std::path::Path;

use super::{Error, Result};
use crate::fsutil;

/// One line of `/proc/<pid>/cgroup`: `<hierarchy-id>:<controller-list>:<cgroup-path>`.
#[derive(Debug, PartialEq, Eq)]
pub struct CgroupEntry<'a> {
    /// Arbitrary number on v1, always `0` on v2.
    pub hierarchy_id: &'a str,
    /// Comma-separated controllers on v1, empty on v2.
    pub controllers: &'a str,
    /// Path relative to the cgroup root.
    pub path: &'a str,
}

/// Splits a cgroup line into its three fields.
///
/// Returns `None` for lines that do not have all three fields. The path is
/// the remainder after the second `:`, so paths containing `:` stay intact.
pub fn parse_cgroup_line(line: &str) -> Option<CgroupEntry<'_>> {
    let mut fields = line.trim_end_matches('\n').splitn(3, ':');
    let hierarchy_id = fields.next()?;
    let controllers = fields.next()?;
    let path = fields.next()?;

    Some(CgroupEntry {
        hierarchy_id,
        controllers,
        path,
    })
}

/// Returns true if a cgroup path belongs to a container runtime.
pub fn is_container_cgroup_path(path: &str) -> bool {
    if path.starts_with("/lxc/")
        || path.contains("/lxc.payload")
        || path.contains("docker")
        || path.contains("kubepods")
        || path.contains("containerd")
        || path.contains("libpod")
    {
        return true;
    }

    path.split('/')
        .any(|part| part.len() >= 32 && is_non_empty_hex_string(part))
}

/// Returns true if `/proc/<pid>/cgroup` under `proc_root` places the process in a container.
///
/// # Arguments
///
/// * `proc_root` - Root of the procfs tree, usually `/proc`.
/// * `pid` - Process to inspect.
///
/// # Returns
///
/// * `Ok(true)` if any cgroup line carries a container path.
/// * `Ok(false)` otherwise, including when every line is malformed.
///
/// # Errors
///
/// * [`Error::FileOpen`] if the cgroup file cannot be opened (e.g. the process exited).
/// * [`Error::ReadLine`] if a line from the file cannot be read.
pub fn is_process_in_container(proc_root: impl AsRef<Path>, pid: u32) -> Result<bool> {
    let path = proc_root.as_ref().join(pid.to_string()).join("cgroup");
    let reader = fsutil::open_file_reader(&path)?;
    matches_container_cgroup(reader, &path)
}

fn matches_container_cgroup<R: BufRead>(mut reader: R, origin: &Path) -> Result<bool> {
    let mut line = String::with_capacity(256);

    while reader.read_line(&mut line).map_err(|source| Error::ReadLine {
        path: origin.to_path_buf(),
        source,
    })? != 0
    {
        match parse_cgroup_line(&line) {
            Some(entry) if is_container_cgroup_path(entry.path) => return Ok(true),
            Some(_) => {}
            None => log::trace!(
                "Ignoring malformed cgroup line in `{}`: {:?}",
                origin.display(),
                line
            ),
        }

        line.clear();
    }

    Ok(false)
}

/// Returns true if the input string is not empty and contains only ASCII hex digits.
///
/// # Arguments
///
/// * `s` - A string slice to validate.
///
/// # Returns
///
/// * `true` if `s` is non-empty and every character is a hex digit.
/// * `false` otherwise.
pub fn is_non_empty_hex_string(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    s.chars().all(|c| c.is_ascii_hexdigit())
}
