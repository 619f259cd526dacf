//! Filesystem gateway used by the archiver.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// The three primitives the archiver needs.
pub trait Filesystem: Send + Sync {
    /// Whether anything exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Create `path` and all missing parents.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Move `src` to `dst`, replacing whatever is already at the target.
    ///
    /// When `dst` is an existing directory the target is `dst/<name of src>`,
    /// like `mv -f`.
    fn move_forced(&self, src: &Path, dst: &Path) -> io::Result<()>;
}

/// [`Filesystem`] on the local disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    fn target_for(src: &Path, dst: &Path) -> io::Result<PathBuf> {
        if dst.is_dir() {
            let name = src.file_name().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("cannot move {} into a directory: no file name", src.display()),
                )
            })?;
            Ok(dst.join(name))
        } else {
            Ok(dst.to_path_buf())
        }
    }

    /// Sibling path the previous entry is parked at while it is replaced.
    fn aside_for(target: &Path) -> PathBuf {
        let mut name = std::ffi::OsString::from(".");
        name.push(target.file_name().unwrap_or_default());
        name.push(".replaced");
        target.with_file_name(name)
    }

    fn place(src: &Path, target: &Path) -> io::Result<()> {
        match fs::rename(src, target) {
            Ok(()) => Ok(()),
            Err(e) if is_cross_device(&e) => {
                debug!(src = %src.display(), "Rename crosses devices, copying instead");
                if let Err(e) = copy_recursive(src, target) {
                    if fs::symlink_metadata(target).is_ok() {
                        let _ = Self::remove_any(target);
                    }
                    return Err(e);
                }
                Self::remove_any(src)
            }
            Err(e) => Err(e),
        }
    }

    fn remove_any(path: &Path) -> io::Result<()> {
        let meta = fs::symlink_metadata(path)?;
        if meta.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        }
    }
}

impl Filesystem for LocalFilesystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn move_forced(&self, src: &Path, dst: &Path) -> io::Result<()> {
        let target = Self::target_for(src, dst)?;
        fs::symlink_metadata(src)?;

        if fs::symlink_metadata(&target).is_err() {
            return Self::place(src, &target);
        }

        // The previous entry stays recoverable until the new one is in place.
        debug!(path = %target.display(), "Replacing existing archive entry");
        let aside = Self::aside_for(&target);
        if fs::symlink_metadata(&aside).is_ok() {
            Self::remove_any(&aside)?;
        }
        fs::rename(&target, &aside)?;

        match Self::place(src, &target) {
            Ok(()) => Self::remove_any(&aside),
            Err(e) => {
                if let Err(restore) = fs::rename(&aside, &target) {
                    warn!(
                        path = %aside.display(),
                        error = %restore,
                        "Could not restore previous archive entry"
                    );
                }
                Err(e)
            }
        }
    }
}

#[cfg(unix)]
fn is_cross_device(err: &io::Error) -> bool {
    // EXDEV
    err.raw_os_error() == Some(18)
}

#[cfg(not(unix))]
fn is_cross_device(err: &io::Error) -> bool {
    // ERROR_NOT_SAME_DEVICE
    err.raw_os_error() == Some(17)
}

fn copy_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(src)?;
    if !meta.is_dir() {
        fs::copy(src, dst)?;
        return Ok(());
    }

    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        copy_recursive(&entry.path(), &dst.join(entry.file_name()))?;
    }
    Ok(())
}
