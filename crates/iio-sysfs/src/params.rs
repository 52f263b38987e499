use crate::{AttrStore, ChannelName, Result};
use std::path::Path;
use tracing::trace;

/// Optional per-channel conversion parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Scale,
    Offset,
}

impl ParamKind {
    pub fn suffix(self) -> &'static str {
        match self {
            ParamKind::Scale => "scale",
            ParamKind::Offset => "offset",
        }
    }

    /// Value used when the device exposes no attribute for it.
    pub fn default_value(self) -> f64 {
        match self {
            ParamKind::Scale => 1.0,
            ParamKind::Offset => 0.0,
        }
    }
}

/// Read `<name>_scale` / `<name>_offset`, falling back to the shared
/// attribute and then to the neutral default. Malformed content is
/// [`Error::Format`](crate::Error::Format); an attribute that exists but cannot
/// be read propagates its [`Error::Io`](crate::Error::Io).
pub fn read_param<S: AttrStore + ?Sized>(
    store: &S,
    dir: &Path,
    name: &ChannelName,
    kind: ParamKind,
) -> Result<f64> {
    read_param_in(store, &[dir], name, kind)
}

/// Like [`read_param`] but searching several directories. Name specificity
/// ranks above directory order: `<name>_scale` anywhere beats a shared
/// `<generic>_scale` in the first directory.
pub fn read_param_in<S: AttrStore + ?Sized>(
    store: &S,
    dirs: &[&Path],
    name: &ChannelName,
    kind: ParamKind,
) -> Result<f64> {
    for prefix in name.candidates() {
        for dir in dirs {
            let path = dir.join(format!("{prefix}_{}", kind.suffix()));
            if store.exists(&path) {
                trace!(path = %path.display(), "param found");
                return store.read_float(&path);
            }
        }
    }
    Ok(kind.default_value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockStore;

    #[test]
    fn test_defaults_when_absent() {
        let dir = Path::new("/d");
        let store = MockStore::new();
        let n = ChannelName::new("in_voltage0");
        assert_eq!(read_param(&store, dir, &n, ParamKind::Scale).unwrap(), 1.0);
        assert_eq!(read_param(&store, dir, &n, ParamKind::Offset).unwrap(), 0.0);
    }

    #[test]
    fn test_specific_overrides_shared() {
        let dir = Path::new("/d");
        let store = MockStore::new()
            .with(dir.join("in_voltage_scale"), "0.5\n")
            .with(dir.join("in_voltage1_scale"), "0.25\n")
            .with(dir.join("in_voltage_offset"), "-12\n");
        let v0 = ChannelName::new("in_voltage0");
        let v1 = ChannelName::new("in_voltage1");
        assert_eq!(read_param(&store, dir, &v0, ParamKind::Scale).unwrap(), 0.5);
        assert_eq!(read_param(&store, dir, &v1, ParamKind::Scale).unwrap(), 0.25);
        assert_eq!(read_param(&store, dir, &v1, ParamKind::Offset).unwrap(), -12.0);
    }

    #[test]
    fn test_malformed_scale_is_format_error() {
        let dir = Path::new("/d");
        let store = MockStore::new().with(dir.join("in_temp_scale"), "fast\n");
        let err = read_param(&store, dir, &ChannelName::new("in_temp"), ParamKind::Scale)
            .unwrap_err();
        assert!(err.is_format());
    }

    #[test]
    fn test_unreadable_scale_is_io_error() {
        use crate::SysfsStore;

        let dir = tempfile::tempdir().unwrap();
        // exists, but reading a directory fails
        std::fs::create_dir(dir.path().join("in_temp_scale")).unwrap();
        let err = read_param(
            &SysfsStore,
            dir.path(),
            &ChannelName::new("in_temp"),
            ParamKind::Scale,
        )
        .unwrap_err();
        assert!(err.is_io(), "{err}");
    }

    #[test]
    fn test_specific_name_beats_directory_order() {
        let scan = Path::new("/dev0/scan_elements");
        let dev = Path::new("/dev0");
        let store = MockStore::new()
            .with(scan.join("in_accel_scale"), "2.0\n")
            .with(dev.join("in_accel_y_scale"), "3.0\n");
        let y = ChannelName::new("in_accel_y");
        let x = ChannelName::new("in_accel_x");
        assert_eq!(read_param_in(&store, &[scan, dev], &y, ParamKind::Scale).unwrap(), 3.0);
        assert_eq!(read_param_in(&store, &[scan, dev], &x, ParamKind::Scale).unwrap(), 2.0);
    }
}
