use crate::{AttrStore, ChannelName, Error, LayoutError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endianness {
    Big,
    Little,
}

impl Endianness {
    fn tag(self) -> &'static str {
        match self {
            Endianness::Big => "be",
            Endianness::Little => "le",
        }
    }
}

/// Bit-level layout of one channel inside a scan record, parsed from a
/// `_type` attribute such as `le:s12/16>>4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelLayout {
    pub endianness: Endianness,
    pub is_signed: bool,
    pub bits_used: u32,
    /// Storage width in bytes (storage bits / 8).
    pub bytes: u32,
    pub shift: u32,
    pub mask: u64,
}

impl ChannelLayout {
    pub fn storage_bits(&self) -> u32 {
        self.bytes * 8
    }
}

/// Low `bits` bits set; 64 maps to all ones.
fn mask_for(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

fn number(s: &str) -> core::result::Result<u32, LayoutError> {
    // no sign, no leading zeros: the string must be what Display prints
    if s.is_empty()
        || !s.bytes().all(|b| b.is_ascii_digit())
        || (s.len() > 1 && s.starts_with('0'))
    {
        return Err(LayoutError::Number(s.to_string()));
    }
    s.parse::<u32>()
        .map_err(|_| LayoutError::Number(s.to_string()))
}

impl FromStr for ChannelLayout {
    type Err = LayoutError;

    // endian ":" sign bits_used "/" storage_bits [">>" shift]
    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        let (endian, rest) = s.split_once(':').ok_or(LayoutError::MissingColon)?;
        let endianness = match endian {
            "be" => Endianness::Big,
            "le" => Endianness::Little,
            other => return Err(LayoutError::Endianness(other.to_string())),
        };

        let mut chars = rest.chars();
        let is_signed = match chars.next() {
            Some('s') => true,
            Some('u') => false,
            other => {
                return Err(LayoutError::Sign(
                    other.map(String::from).unwrap_or_default(),
                ))
            }
        };
        let rest = chars.as_str();

        let (used, rest) = rest.split_once('/').ok_or(LayoutError::MissingSlash)?;
        let (storage, shift) = match rest.split_once(">>") {
            Some((storage, shift)) => (storage, Some(shift)),
            None => (rest, None),
        };

        let bits_used = number(used)?;
        let storage_bits = match storage.find(|c: char| !c.is_ascii_digit()) {
            // e.g. the repeat suffix in "16X2"
            Some(pos) if pos > 0 => return Err(LayoutError::Trailing(storage[pos..].to_string())),
            _ => number(storage)?,
        };
        let shift = shift.map(number).transpose()?.unwrap_or(0);

        if bits_used == 0 || bits_used > 64 {
            return Err(LayoutError::BitsUsed(bits_used));
        }
        if storage_bits == 0 || storage_bits % 8 != 0 {
            return Err(LayoutError::StorageBits(storage_bits));
        }
        if bits_used > storage_bits {
            return Err(LayoutError::Overflow {
                used: bits_used,
                storage: storage_bits,
            });
        }

        Ok(Self {
            endianness,
            is_signed,
            bits_used,
            bytes: storage_bits / 8,
            shift,
            mask: mask_for(bits_used),
        })
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}{}/{}",
            self.endianness.tag(),
            if self.is_signed { 's' } else { 'u' },
            self.bits_used,
            self.storage_bits()
        )?;
        if self.shift != 0 {
            write!(f, ">>{}", self.shift)?;
        }
        Ok(())
    }
}

/// Locate and parse the `_type` attribute for a channel.
///
/// The channel-specific attribute wins; otherwise the first shared one that
/// exists is used. No candidate at all is an I/O error.
pub fn read_layout<S: AttrStore + ?Sized>(
    store: &S,
    dir: &Path,
    name: &ChannelName,
) -> Result<ChannelLayout> {
    let paths = name.attr_paths(dir, "type");
    for path in &paths {
        trace!(path = %path.display(), "layout candidate");
        if !store.exists(path) {
            continue;
        }
        let raw = store.read_trimmed(path)?;
        return raw.parse().map_err(|e| Error::format(path, e));
    }
    Err(Error::io(
        &dir.join(format!("{}_type", name.name)),
        "no layout attribute for channel or its generic name",
    ))
}
