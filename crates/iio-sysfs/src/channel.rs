use crate::params::read_param_in;
use crate::{read_layout, AttrStore, ChannelLayout, ChannelName, Endianness, Error, ParamKind, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

pub(crate) const SCAN_ELEMENTS: &str = "scan_elements";

/// Everything needed to pull one channel out of a scan record and convert it
/// to physical units.
///
/// `extra` is a typed slot for consumer data; scans produce `()` and
/// [`ChannelDescriptor::with_extra`] swaps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDescriptor<X = ()> {
    pub name: String,
    pub generic_name: String,
    pub scale: f64,
    pub offset: f64,
    /// Position in the scan record; the sort key.
    pub index: u32,
    pub bytes: u32,
    pub bits_used: u32,
    pub shift: u32,
    pub mask: u64,
    pub is_signed: bool,
    pub endianness: Endianness,
    pub enabled: bool,
    pub extra: X,
}

impl<X> ChannelDescriptor<X> {
    pub fn layout(&self) -> ChannelLayout {
        ChannelLayout {
            endianness: self.endianness,
            is_signed: self.is_signed,
            bits_used: self.bits_used,
            bytes: self.bytes,
            shift: self.shift,
            mask: self.mask,
        }
    }

    pub fn with_extra<Y>(self, extra: Y) -> ChannelDescriptor<Y> {
        ChannelDescriptor {
            name: self.name,
            generic_name: self.generic_name,
            scale: self.scale,
            offset: self.offset,
            index: self.index,
            bytes: self.bytes,
            bits_used: self.bits_used,
            shift: self.shift,
            mask: self.mask,
            is_signed: self.is_signed,
            endianness: self.endianness,
            enabled: self.enabled,
            extra,
        }
    }
}

/// Stable sort by scan index. Channels reporting the same index keep their
/// discovery order.
pub fn sort_by_index<X>(channels: &mut [ChannelDescriptor<X>]) {
    channels.sort_by_key(|c| c.index);
}

/// Names of every scan element under `dir`, enabled or not, sorted.
///
/// Only `<name>_en` entries count; nothing but the directory listing is read.
pub fn list_scan_elements<S: AttrStore + ?Sized>(store: &S, dir: &Path) -> Result<Vec<String>> {
    let mut names: Vec<String> = store
        .list_dir(dir)?
        .iter()
        .filter_map(|e| e.strip_suffix("_en"))
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect();
    names.sort();
    names.dedup();
    Ok(names)
}

/// Discover every enabled channel under `dir` (normally a device's
/// `scan_elements` directory) and return them ordered by index.
///
/// Scale and offset are looked up in `dir` and, when `dir` is a
/// `scan_elements` directory, in the device directory above it.
///
/// Any unreadable or malformed required attribute (`_en`, `_type`, `_index`)
/// aborts the whole scan; no partial result is returned.
pub fn build_channel_array<S: AttrStore + ?Sized>(
    store: &S,
    dir: &Path,
) -> Result<Vec<ChannelDescriptor>> {
    let entries = store.list_dir(dir)?;
    let mut param_dirs = vec![dir];
    if dir.ends_with(SCAN_ELEMENTS) {
        if let Some(parent) = dir.parent() {
            param_dirs.push(parent);
        }
    }

    let mut channels: Vec<ChannelDescriptor> = Vec::new();
    for entry in &entries {
        let raw = match entry.strip_suffix("_en") {
            Some(raw) if !raw.is_empty() => raw,
            _ => continue,
        };
        if !store.read_bool(&dir.join(entry))? {
            debug!(channel = raw, "channel disabled");
            continue;
        }

        let name = ChannelName::new(raw);
        let layout = read_layout(store, dir, &name)?;
        let scale = read_param_in(store, &param_dirs, &name, ParamKind::Scale)?;
        let offset = read_param_in(store, &param_dirs, &name, ParamKind::Offset)?;

        let index_path = dir.join(format!("{raw}_index"));
        if !store.exists(&index_path) {
            return Err(Error::format(&index_path, "enabled channel has no index"));
        }
        let index = store.read_u32(&index_path)?;

        debug!(
            channel = raw,
            generic = %name.generic,
            index,
            layout = %layout,
            scale,
            offset,
            "channel discovered"
        );

        channels
            .try_reserve(1)
            .map_err(|e| Error::Alloc(e.to_string()))?;
        channels.push(ChannelDescriptor {
            name: name.name,
            generic_name: name.generic,
            scale,
            offset,
            index,
            bytes: layout.bytes,
            bits_used: layout.bits_used,
            shift: layout.shift,
            mask: layout.mask,
            is_signed: layout.is_signed,
            endianness: layout.endianness,
            enabled: true,
            extra: (),
        });
    }

    sort_by_index(&mut channels);
    for pair in channels.windows(2) {
        if pair[0].index == pair[1].index {
            warn!(
                first = %pair[0].name,
                second = %pair[1].name,
                index = pair[0].index,
                "channels share a scan index"
            );
        }
    }
    info!(dir = %dir.display(), enabled = channels.len(), "channel scan complete");
    Ok(channels)
}
