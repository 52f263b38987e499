use crate::{AttrStore, DeviceContext, Error, Result};
use std::path::PathBuf;
use tracing::debug;

const DIRECT_REG_ACCESS: &str = "direct_reg_access";

fn reg_path(ctx: &DeviceContext) -> Result<PathBuf> {
    ctx.debug_dir
        .as_ref()
        .map(|d| d.join(DIRECT_REG_ACCESS))
        .ok_or_else(|| Error::NotFound(format!("debugfs directory for {}", ctx.name)))
}

fn parse_reg(s: &str) -> Option<u32> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

/// Read a device register through debugfs: select the address, then read the
/// value back from the same file.
pub fn read_reg<S: AttrStore + ?Sized>(store: &S, ctx: &DeviceContext, address: u32) -> Result<u32> {
    let path = reg_path(ctx)?;
    store.write_string(&path, &format!("0x{address:x}"))?;
    let raw = store.read_trimmed(&path)?;
    let value =
        parse_reg(&raw).ok_or_else(|| Error::format(&path, format!("bad register value {raw:?}")))?;
    debug!(device = %ctx.name, address, value, "register read");
    Ok(value)
}

pub fn write_reg<S: AttrStore + ?Sized>(
    store: &S,
    ctx: &DeviceContext,
    address: u32,
    value: u32,
) -> Result<()> {
    let path = reg_path(ctx)?;
    store.write_string(&path, &format!("0x{address:x} 0x{value:x}"))?;
    debug!(device = %ctx.name, address, value, "register write");
    Ok(())
}
