use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Error that occurs when a filesystem operation on `path` fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to {op} `{path}`: {source}")]
pub struct FileError {
    pub op: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl FileError {
    fn new(op: &'static str, path: &Path, source: io::Error) -> Self {
        Self {
            op,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Opens a file at the given path and wraps it in a [`BufReader`].
///
/// # Errors
///
/// Returns a [`FileError`] if the file cannot be opened.
///
/// # Example
/// ```no_run
/// # use rack_netinfo::fsutil;
/// let reader = fsutil::open_file_reader("/proc/self/cgroup")?;
/// # Ok::<(), fsutil::FileError>(())
/// ```
pub fn open_file_reader(path: impl AsRef<Path>) -> Result<BufReader<File>, FileError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| FileError::new("open", path, source))?;
    Ok(BufReader::new(file))
}

/// Reads the whole file into a string, mapping a missing file to `Ok(None)`.
///
/// # Errors
///
/// Returns a [`FileError`] for any failure other than [`io::ErrorKind::NotFound`].
pub fn read_to_string_if_exists(path: impl AsRef<Path>) -> Result<Option<String>, FileError> {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(FileError::new("read", path, source)),
    }
}

/// Replaces the contents of `path` by writing a temporary file in the same
/// directory and renaming it over the target, so readers see either the old or
/// the new file. The temporary file is removed if any step fails.
///
/// # Errors
///
/// Returns a [`FileError`] naming the step that failed.
pub fn write_atomic(path: impl AsRef<Path>, contents: &[u8]) -> Result<(), FileError> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut file = tempfile::Builder::new()
        .prefix(".tmp")
        .permissions(fs::Permissions::from_mode(0o644))
        .tempfile_in(dir)
        .map_err(|source| FileError::new("create", dir, source))?;
    let tmp = file.path().to_path_buf();
    file.write_all(contents)
        .and_then(|()| file.as_file().sync_all())
        .map_err(|source| FileError::new("write", &tmp, source))?;
    file.persist(path)
        .map_err(|err| FileError::new("rename", path, err.error))?;
    Ok(())
}

/// Removes `path`, treating an already missing file as success.
///
/// # Errors
///
/// Returns a [`FileError`] for any failure other than [`io::ErrorKind::NotFound`].
pub fn remove_if_exists(path: impl AsRef<Path>) -> Result<(), FileError> {
    let path = path.as_ref();
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(FileError::new("remove", path, source)),
    }
}
