//! iio-sysfs: channel discovery for Linux Industrial I/O devices
//!
//! Walks a device's `scan_elements` directory and turns every enabled channel
//! into a [`ChannelDescriptor`] describing how its field is laid out in the
//! scan buffer (endianness, sign, bit width, storage width, shift, mask) and
//! how to convert it to physical units (scale, offset).
//!
//! All filesystem access goes through the [`AttrStore`] trait. The default
//! build enables an in-memory `mock` store so consumers can test against a
//! fake device tree.
//!
//! Nothing here holds global state: every call takes an explicit directory or
//! [`DeviceContext`]. Scans are plain blocking reads and are not synchronised
//! against concurrent reconfiguration of the device.

mod error;
pub use error::{Error, LayoutError, Result};

mod attr;
pub use attr::{AttrStore, SysfsStore};

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::MockStore;

mod name;
pub use name::{break_up_name, ChannelName};

mod layout;
pub use layout::{read_layout, ChannelLayout, Endianness};

mod params;
pub use params::{read_param, read_param_in, ParamKind};

mod channel;
pub use channel::{build_channel_array, list_scan_elements, sort_by_index, ChannelDescriptor};

mod discovery;
pub use discovery::{find_names, find_type_by_name, IioEntry, IioKind};

mod context;
pub use context::{DeviceContext, IioPaths};

mod debugfs;
pub use debugfs::{read_reg, write_reg};
