use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use time::OffsetDateTime;
use tracing::info;

use iio_sysfs as iio;
use iio_sysfs::{DeviceContext, IioPaths, SysfsStore};

#[derive(Parser, Debug)]
#[command(
    name = "iio",
    version,
    about = "Inspect Linux IIO devices and their scan channels",
    disable_help_subcommand = true
)]
struct Cli {
    /// JSON file with sysfs/debugfs roots
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the IIO sysfs root
    #[arg(long, global = true)]
    sysfs_root: Option<PathBuf>,

    /// Override the IIO debugfs root
    #[arg(long, global = true)]
    debugfs_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List IIO devices and triggers
    DeviceList {
        /// Only show entries whose name contains this string
        #[arg(long)]
        filter: Option<String>,
    },
    /// Discover enabled scan channels of a device
    ChannelScan {
        /// Device name (as in its `name` attribute)
        #[arg(long, conflicts_with = "dir")]
        device: Option<String>,
        /// Scan-elements directory to read directly
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Print a JSON report instead of a table
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// List every scan element of a device, enabled or not
    ChannelList {
        #[arg(long, conflicts_with = "dir")]
        device: Option<String>,
        /// Scan-elements directory to read directly
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Read a device attribute
    AttrRead {
        #[arg(long)]
        device: String,
        #[arg(long)]
        attr: String,
    },
    /// Write a device attribute
    AttrWrite {
        #[arg(long)]
        device: String,
        #[arg(long)]
        attr: String,
        #[arg(long)]
        value: String,
        /// Read the value back and fail if the device changed it
        #[arg(long, action = ArgAction::SetTrue)]
        verify: bool,
    },
    /// Write a two-value integer attribute ("<a> <b>")
    AttrWritePair {
        #[arg(long)]
        device: String,
        #[arg(long)]
        attr: String,
        #[arg(long, allow_hyphen_values = true)]
        first: i64,
        #[arg(long, allow_hyphen_values = true)]
        second: i64,
    },
    /// Read a register through debugfs
    RegRead {
        #[arg(long)]
        device: String,
        /// Register address (hex like 0x37 or decimal)
        #[arg(long)]
        addr: String,
    },
    /// Write a register through debugfs
    RegWrite {
        #[arg(long)]
        device: String,
        #[arg(long)]
        addr: String,
        #[arg(long)]
        value: String,
    },
}

fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();
    let paths = resolve_paths(&cli)?;

    match cli.command {
        Commands::DeviceList { filter } => device_list(&paths, filter.as_deref()),
        Commands::ChannelScan { device, dir, json } => {
            channel_scan(&paths, device.as_deref(), dir, json)
        }
        Commands::ChannelList { device, dir } => channel_list(&paths, device.as_deref(), dir),
        Commands::AttrWritePair {
            device,
            attr,
            first,
            second,
        } => attr_write_pair(&paths, &device, &attr, first, second),
        Commands::AttrRead { device, attr } => attr_read(&paths, &device, &attr),
        Commands::AttrWrite {
            device,
            attr,
            value,
            verify,
        } => attr_write(&paths, &device, &attr, &value, verify),
        Commands::RegRead { device, addr } => reg_read(&paths, &device, &addr),
        Commands::RegWrite {
            device,
            addr,
            value,
        } => reg_write(&paths, &device, &addr, &value),
    }
}

fn setup_tracing() {
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn resolve_paths(cli: &Cli) -> Result<IioPaths> {
    let mut paths = match &cli.config {
        Some(p) => IioPaths::load(p).with_context(|| format!("loading config: {}", p.display()))?,
        None => IioPaths::default(),
    };
    if let Some(root) = &cli.sysfs_root {
        paths.sysfs_root = root.clone();
    }
    if let Some(root) = &cli.debugfs_root {
        paths.debugfs_root = root.clone();
    }
    Ok(paths)
}

fn open_device(paths: &IioPaths, name: &str) -> Result<DeviceContext> {
    DeviceContext::open(&SysfsStore, paths, name)
        .with_context(|| format!("resolving device {name:?} under {}", paths.sysfs_root.display()))
}

fn device_list(paths: &IioPaths, filter: Option<&str>) -> Result<()> {
    let entries = iio::find_names(&SysfsStore, &paths.sysfs_root, filter)
        .with_context(|| format!("listing {}", paths.sysfs_root.display()))?;
    for e in entries {
        println!("{}\t{}", e.name, e.dir.display());
    }
    Ok(())
}

#[derive(Serialize)]
struct ScanReport<'a> {
    device: &'a str,
    dir: String,
    scanned_at: Option<String>,
    channels: Vec<ChannelRow>,
}

#[derive(Serialize)]
struct ChannelRow {
    name: String,
    generic_name: String,
    index: u32,
    layout: String,
    mask: String,
    scale: f64,
    offset: f64,
}

impl From<&iio::ChannelDescriptor> for ChannelRow {
    fn from(c: &iio::ChannelDescriptor) -> Self {
        Self {
            name: c.name.clone(),
            generic_name: c.generic_name.clone(),
            index: c.index,
            layout: c.layout().to_string(),
            mask: format!("0x{:X}", c.mask),
            scale: c.scale,
            offset: c.offset,
        }
    }
}

fn scan_dir_for(paths: &IioPaths, device: Option<&str>, dir: Option<PathBuf>) -> Result<(String, PathBuf)> {
    match (device, dir) {
        (Some(name), None) => Ok((name.to_string(), open_device(paths, name)?.scan_elements_dir())),
        (None, Some(d)) => Ok((d.display().to_string(), d)),
        _ => Err(anyhow::anyhow!("provide --device <name> or --dir <path>")),
    }
}

fn channel_list(paths: &IioPaths, device: Option<&str>, dir: Option<PathBuf>) -> Result<()> {
    let (_, scan_dir) = scan_dir_for(paths, device, dir)?;
    let names = iio::list_scan_elements(&SysfsStore, &scan_dir)
        .with_context(|| format!("listing {}", scan_dir.display()))?;
    for n in names {
        println!("{n}");
    }
    Ok(())
}

fn channel_scan(
    paths: &IioPaths,
    device: Option<&str>,
    dir: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let (label, scan_dir) = scan_dir_for(paths, device, dir)?;
    let channels = iio::build_channel_array(&SysfsStore, &scan_dir)
        .with_context(|| format!("scanning {}", scan_dir.display()))?;
    info!(device = %label, count = channels.len(), "scan done");

    let rows: Vec<ChannelRow> = channels.iter().map(ChannelRow::from).collect();
    if json {
        let report = ScanReport {
            device: &label,
            dir: scan_dir.display().to_string(),
            scanned_at: OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .ok(),
            channels: rows,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{:<5} {:<28} {:<20} {:<14} {:>12} {:>10}", "idx", "name", "generic", "layout", "scale", "offset");
    for r in rows {
        println!(
            "{:<5} {:<28} {:<20} {:<14} {:>12} {:>10}",
            r.index, r.name, r.generic_name, r.layout, r.scale, r.offset
        );
    }
    Ok(())
}

fn attr_read(paths: &IioPaths, device: &str, attr: &str) -> Result<()> {
    let ctx = open_device(paths, device)?;
    let value = ctx.read_attr(&SysfsStore, attr)?;
    println!("{value}");
    Ok(())
}

fn attr_write(paths: &IioPaths, device: &str, attr: &str, value: &str, verify: bool) -> Result<()> {
    let ctx = open_device(paths, device)?;
    ctx.write_attr(&SysfsStore, attr, value, verify)?;
    println!("ok: {attr} = {value}");
    Ok(())
}

fn attr_write_pair(paths: &IioPaths, device: &str, attr: &str, first: i64, second: i64) -> Result<()> {
    let ctx = open_device(paths, device)?;
    ctx.write_attr_pair(&SysfsStore, attr, first, second)?;
    println!("ok: {attr} = {first} {second}");
    Ok(())
}

fn parse_u32(s: &str) -> Result<u32> {
    let t = s.trim();
    let val = match t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => t.parse::<u32>(),
    };
    val.with_context(|| format!("invalid number: {s}"))
}

fn reg_read(paths: &IioPaths, device: &str, addr: &str) -> Result<()> {
    let ctx = open_device(paths, device)?;
    let address = parse_u32(addr)?;
    let value = iio::read_reg(&SysfsStore, &ctx, address)?;
    println!("0x{address:X}: 0x{value:X}");
    Ok(())
}

fn reg_write(paths: &IioPaths, device: &str, addr: &str, value: &str) -> Result<()> {
    let ctx = open_device(paths, device)?;
    let address = parse_u32(addr)?;
    let value = parse_u32(value)?;
    iio::write_reg(&SysfsStore, &ctx, address, value)?;
    println!("ok: 0x{address:X} <- 0x{value:X}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_u32() {
        assert_eq!(parse_u32("0x37").unwrap(), 0x37);
        assert_eq!(parse_u32("55").unwrap(), 55);
        assert!(parse_u32("0xZZ").is_err());
    }

    #[test]
    fn test_cli_parses_scan() {
        let cli = Cli::try_parse_from(["iio", "channel-scan", "--device", "adxl345", "--json"]).unwrap();
        match cli.command {
            Commands::ChannelScan { device, dir, json } => {
                assert_eq!(device.as_deref(), Some("adxl345"));
                assert!(dir.is_none());
                assert!(json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_channel_list_and_pair_args() {
        let cli = Cli::try_parse_from(["iio", "channel-list", "--dir", "/tmp/scan_elements"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::ChannelList { device: None, dir: Some(_) }
        ));

        let cli = Cli::try_parse_from([
            "iio", "attr-write-pair", "--device", "adxl345", "--attr", "in_accel_calibbias",
            "--first", "4", "--second", "-2",
        ])
        .unwrap();
        match cli.command {
            Commands::AttrWritePair { first, second, .. } => assert_eq!((first, second), (4, -2)),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_channel_list_on_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("in_voltage0_en"), "0\n").unwrap();
        let paths = IioPaths::default();
        channel_list(&paths, None, Some(dir.path().to_path_buf())).unwrap();
        assert!(channel_list(&paths, None, None).is_err());
    }

    #[test]
    fn test_flag_overrides_config() {
        let cli = Cli::try_parse_from(["iio", "--sysfs-root", "/tmp/iio", "device-list"]).unwrap();
        let paths = resolve_paths(&cli).unwrap();
        assert_eq!(paths.sysfs_root, PathBuf::from("/tmp/iio"));
        assert_eq!(paths.debugfs_root, IioPaths::default().debugfs_root);
    }
}
