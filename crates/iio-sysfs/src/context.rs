use crate::channel::SCAN_ELEMENTS;
use crate::{
    build_channel_array, find_type_by_name, list_scan_elements, AttrStore, ChannelDescriptor,
    Error, IioKind, Result,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where the IIO sysfs and debugfs trees are mounted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IioPaths {
    pub sysfs_root: PathBuf,
    pub debugfs_root: PathBuf,
}

impl Default for IioPaths {
    fn default() -> Self {
        Self {
            sysfs_root: PathBuf::from("/sys/bus/iio/devices"),
            debugfs_root: PathBuf::from("/sys/kernel/debug/iio"),
        }
    }
}

impl IioPaths {
    /// Load from a JSON file; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&raw).map_err(|e| Error::format(path, e))
    }
}

/// One resolved device. Passed explicitly to every device-level operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceContext {
    pub name: String,
    pub device_dir: PathBuf,
    /// Absent when debugfs is not mounted or the driver exposes nothing.
    pub debug_dir: Option<PathBuf>,
}

impl DeviceContext {
    /// Resolve a device by its `name` attribute.
    pub fn open<S: AttrStore + ?Sized>(store: &S, paths: &IioPaths, name: &str) -> Result<Self> {
        let num = find_type_by_name(store, &paths.sysfs_root, name, IioKind::Device)?;
        let dir_name = format!("{}{num}", IioKind::Device.dir_prefix());
        let debug_dir = paths.debugfs_root.join(&dir_name);
        let debug_dir = store.exists(&debug_dir).then_some(debug_dir);
        let ctx = Self {
            name: name.to_string(),
            device_dir: paths.sysfs_root.join(dir_name),
            debug_dir,
        };
        debug!(device = name, dir = %ctx.device_dir.display(), "device resolved");
        Ok(ctx)
    }

    /// Context for an already known directory, bypassing name lookup.
    pub fn from_dir(device_dir: impl Into<PathBuf>) -> Self {
        let device_dir = device_dir.into();
        let name = device_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            device_dir,
            debug_dir: None,
        }
    }

    pub fn scan_elements_dir(&self) -> PathBuf {
        self.device_dir.join(SCAN_ELEMENTS)
    }

    /// Enabled channels of this device, ordered by scan index.
    pub fn channels<S: AttrStore + ?Sized>(&self, store: &S) -> Result<Vec<ChannelDescriptor>> {
        build_channel_array(store, &self.scan_elements_dir())
    }

    /// Every scan element name of this device, enabled or not, sorted.
    pub fn scan_elements<S: AttrStore + ?Sized>(&self, store: &S) -> Result<Vec<String>> {
        list_scan_elements(store, &self.scan_elements_dir())
    }

    pub fn attr_path(&self, attr: &str) -> PathBuf {
        self.device_dir.join(attr)
    }

    pub fn attr_exists<S: AttrStore + ?Sized>(&self, store: &S, attr: &str) -> bool {
        store.exists(&self.attr_path(attr))
    }

    pub fn read_attr<S: AttrStore + ?Sized>(&self, store: &S, attr: &str) -> Result<String> {
        store.read_trimmed(&self.attr_path(attr))
    }

    pub fn read_attr_bool<S: AttrStore + ?Sized>(&self, store: &S, attr: &str) -> Result<bool> {
        store.read_bool(&self.attr_path(attr))
    }

    pub fn read_attr_i64<S: AttrStore + ?Sized>(&self, store: &S, attr: &str) -> Result<i64> {
        store.read_int(&self.attr_path(attr))
    }

    pub fn read_attr_f64<S: AttrStore + ?Sized>(&self, store: &S, attr: &str) -> Result<f64> {
        store.read_float(&self.attr_path(attr))
    }

    /// Write a device attribute, optionally reading it back to confirm.
    pub fn write_attr<S: AttrStore + ?Sized>(
        &self,
        store: &S,
        attr: &str,
        value: &str,
        verify: bool,
    ) -> Result<()> {
        let path = self.attr_path(attr);
        if verify {
            store.write_verified(&path, value)
        } else {
            store.write_string(&path, value)
        }
    }

    pub fn write_attr_i64<S: AttrStore + ?Sized>(
        &self,
        store: &S,
        attr: &str,
        value: i64,
    ) -> Result<()> {
        store.write_int(&self.attr_path(attr), value)
    }

    pub fn write_attr_pair<S: AttrStore + ?Sized>(
        &self,
        store: &S,
        attr: &str,
        a: i64,
        b: i64,
    ) -> Result<()> {
        store.write_int_pair(&self.attr_path(attr), a, b)
    }

    pub fn write_attr_f64<S: AttrStore + ?Sized>(
        &self,
        store: &S,
        attr: &str,
        value: f64,
    ) -> Result<()> {
        store.write_float(&self.attr_path(attr), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockStore;

    fn store() -> MockStore {
        MockStore::new()
            .with("/sys/bus/iio/devices/iio:device1/name", "adxl345\n")
            .with("/sys/bus/iio/devices/iio:device1/sampling_frequency", "100\n")
            .with("/sys/bus/iio/devices/iio:device1/in_accel_scale", "0.038307\n")
            .with("/sys/bus/iio/devices/iio:device1/buffer/enable", "0\n")
            .with(
                "/sys/bus/iio/devices/iio:device1/scan_elements/in_accel_x_en",
                "1\n",
            )
            .with(
                "/sys/bus/iio/devices/iio:device1/scan_elements/in_accel_x_index",
                "0\n",
            )
            .with(
                "/sys/bus/iio/devices/iio:device1/scan_elements/in_accel_x_type",
                "le:s13/16\n",
            )
            .with("/sys/kernel/debug/iio/iio:device1/direct_reg_access", "0x0\n")
    }

    #[test]
    fn test_open_resolves_dirs() {
        let store = store();
        let ctx = DeviceContext::open(&store, &IioPaths::default(), "adxl345").unwrap();
        assert_eq!(ctx.device_dir, PathBuf::from("/sys/bus/iio/devices/iio:device1"));
        assert_eq!(
            ctx.debug_dir,
            Some(PathBuf::from("/sys/kernel/debug/iio/iio:device1"))
        );
        assert_eq!(
            ctx.scan_elements_dir(),
            PathBuf::from("/sys/bus/iio/devices/iio:device1/scan_elements")
        );
        assert!(DeviceContext::open(&store, &IioPaths::default(), "bmp280").is_err());
    }

    #[test]
    fn test_channels_read_scale_from_device_dir() {
        let store = store();
        let ctx = DeviceContext::open(&store, &IioPaths::default(), "adxl345").unwrap();
        let chans = ctx.channels(&store).unwrap();
        assert_eq!(chans.len(), 1);
        assert!((chans[0].scale - 0.038307).abs() < 1e-12);
        assert_eq!(chans[0].mask, 0x1FFF);
    }

    #[test]
    fn test_attr_helpers() {
        let store = store();
        let ctx = DeviceContext::from_dir("/sys/bus/iio/devices/iio:device1");
        assert_eq!(ctx.name, "iio:device1");
        assert!(ctx.attr_exists(&store, "sampling_frequency"));
        assert!(!ctx.attr_exists(&store, "oversampling_ratio"));
        assert!(!ctx.read_attr_bool(&store, "buffer/enable").unwrap());

        ctx.write_attr(&store, "sampling_frequency", "200", true).unwrap();
        assert_eq!(ctx.read_attr_i64(&store, "sampling_frequency").unwrap(), 200);
        ctx.write_attr_f64(&store, "sampling_frequency", 12.5).unwrap();
        assert_eq!(ctx.read_attr_f64(&store, "sampling_frequency").unwrap(), 12.5);
        ctx.write_attr_i64(&store, "buffer/enable", 1).unwrap();
        assert!(ctx.read_attr_bool(&store, "buffer/enable").unwrap());
        assert_eq!(ctx.read_attr(&store, "name").unwrap(), "adxl345");
    }

    #[test]
    fn test_scan_elements_and_pair_write() {
        let store = store()
            .with(
                "/sys/bus/iio/devices/iio:device1/scan_elements/in_accel_y_en",
                "0\n",
            )
            .with("/sys/bus/iio/devices/iio:device1/in_accel_calibbias", "0 0\n");
        let ctx = DeviceContext::open(&store, &IioPaths::default(), "adxl345").unwrap();
        assert_eq!(ctx.scan_elements(&store).unwrap(), vec!["in_accel_x", "in_accel_y"]);
        assert_eq!(ctx.channels(&store).unwrap().len(), 1);

        ctx.write_attr_pair(&store, "in_accel_calibbias", 4, -2).unwrap();
        assert_eq!(ctx.read_attr(&store, "in_accel_calibbias").unwrap(), "4 -2");
    }

    #[test]
    fn test_paths_load() {
        let dir = tempfile::tempdir().unwrap();
        let missing = IioPaths::load(dir.path().join("none.json")).unwrap();
        assert_eq!(missing, IioPaths::default());

        let cfg = dir.path().join("iio.json");
        fs::write(&cfg, r#"{ "sysfs_root": "/tmp/fake-iio" }"#).unwrap();
        let paths = IioPaths::load(&cfg).unwrap();
        assert_eq!(paths.sysfs_root, PathBuf::from("/tmp/fake-iio"));
        assert_eq!(paths.debugfs_root, IioPaths::default().debugfs_root);

        fs::write(&cfg, "not json").unwrap();
        assert!(IioPaths::load(&cfg).unwrap_err().is_format());
    }
}
