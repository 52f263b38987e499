use crate::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::trace;

/// Blocking, synchronous access to sysfs-style attribute files.
///
/// Backends implement the four primitives; the typed readers and writers are
/// provided on top of them. Missing or unreadable attributes are
/// [`Error::Io`], content that does not parse as the requested type is
/// [`Error::Format`].
pub trait AttrStore {
    /// Read the raw attribute content (trailing newline included).
    fn read_string(&self, path: &Path) -> Result<String>;

    /// Replace the attribute content.
    fn write_string(&self, path: &Path, value: &str) -> Result<()>;

    fn exists(&self, path: &Path) -> bool;

    /// Entry names directly under `dir`, in a deterministic order.
    fn list_dir(&self, dir: &Path) -> Result<Vec<String>>;

    /// Read the attribute with surrounding whitespace removed.
    fn read_trimmed(&self, path: &Path) -> Result<String> {
        Ok(self.read_string(path)?.trim().to_string())
    }

    fn read_int(&self, path: &Path) -> Result<i64> {
        let s = self.read_trimmed(path)?;
        s.parse::<i64>()
            .map_err(|_| Error::format(path, format!("not an integer: {s:?}")))
    }

    /// Read a non-negative integer that fits in 32 bits.
    fn read_u32(&self, path: &Path) -> Result<u32> {
        let v = self.read_int(path)?;
        u32::try_from(v).map_err(|_| Error::format(path, format!("out of range for u32: {v}")))
    }

    fn read_float(&self, path: &Path) -> Result<f64> {
        let s = self.read_trimmed(path)?;
        match s.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(Error::format(path, format!("not a float: {s:?}"))),
        }
    }

    /// Sysfs booleans are integers; anything non-zero is true.
    fn read_bool(&self, path: &Path) -> Result<bool> {
        Ok(self.read_int(path)? != 0)
    }

    fn write_int(&self, path: &Path, value: i64) -> Result<()> {
        self.write_string(path, &value.to_string())
    }

    /// Two-value attributes take `"<a> <b>"` in one write.
    fn write_int_pair(&self, path: &Path, a: i64, b: i64) -> Result<()> {
        self.write_string(path, &format!("{a} {b}"))
    }

    fn write_float(&self, path: &Path, value: f64) -> Result<()> {
        self.write_string(path, &value.to_string())
    }

    /// Write `value`, read it back and fail with [`Error::VerifyMismatch`] if
    /// the device did not keep it.
    fn write_verified(&self, path: &Path, value: &str) -> Result<()> {
        self.write_string(path, value)?;
        let found = self.read_trimmed(path)?;
        if found != value.trim() {
            return Err(Error::VerifyMismatch {
                path: path.to_path_buf(),
                expected: value.trim().to_string(),
                found,
            });
        }
        Ok(())
    }
}

/// [`AttrStore`] backed by the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct SysfsStore;

impl AttrStore for SysfsStore {
    fn read_string(&self, path: &Path) -> Result<String> {
        trace!(path = %path.display(), "read attribute");
        fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::InvalidData => Error::format(path, "attribute is not valid UTF-8"),
            _ => Error::io(path, e),
        })
    }

    fn write_string(&self, path: &Path, value: &str) -> Result<()> {
        trace!(path = %path.display(), value, "write attribute");
        fs::write(path, value).map_err(|e| Error::io(path, e))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
            let entry = entry.map_err(|e| Error::io(dir, e))?;
            // sysfs names are ASCII; skip anything that is not UTF-8
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        // read_dir order is filesystem-defined
        names.sort();
        Ok(names)
    }
}
