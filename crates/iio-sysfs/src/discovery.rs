use crate::{AttrStore, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::trace;

/// Top-level IIO object kinds found under the sysfs root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IioKind {
    Device,
    Trigger,
}

impl IioKind {
    pub fn dir_prefix(self) -> &'static str {
        match self {
            IioKind::Device => "iio:device",
            IioKind::Trigger => "trigger",
        }
    }

    fn classify(entry: &str) -> Option<(Self, u32)> {
        for kind in [IioKind::Device, IioKind::Trigger] {
            if let Some(num) = entry.strip_prefix(kind.dir_prefix()) {
                if !num.is_empty() && num.bytes().all(|b| b.is_ascii_digit()) {
                    return num.parse().ok().map(|n| (kind, n));
                }
            }
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IioEntry {
    pub kind: IioKind,
    pub number: u32,
    pub name: String,
    pub dir: PathBuf,
}

fn entries<S: AttrStore + ?Sized>(store: &S, root: &Path) -> Result<Vec<IioEntry>> {
    let mut out = Vec::new();
    for entry in store.list_dir(root)? {
        let Some((kind, number)) = IioKind::classify(&entry) else {
            continue;
        };
        let dir = root.join(&entry);
        let name_path = dir.join("name");
        if !store.exists(&name_path) {
            trace!(dir = %dir.display(), "no name attribute");
            continue;
        }
        let name = store.read_trimmed(&name_path)?;
        out.push(IioEntry {
            kind,
            number,
            name,
            dir,
        });
    }
    // list order is lexical, so iio:device10 would sort before iio:device2
    out.sort_by_key(|e| (e.kind, e.number));
    Ok(out)
}

/// Every device and trigger under `root`, optionally restricted to names
/// containing `filter`.
pub fn find_names<S: AttrStore + ?Sized>(
    store: &S,
    root: &Path,
    filter: Option<&str>,
) -> Result<Vec<IioEntry>> {
    let mut all = entries(store, root)?;
    if let Some(f) = filter {
        all.retain(|e| e.name.contains(f));
    }
    Ok(all)
}

/// Number `N` of the first `iio:deviceN` / `triggerN` whose `name` matches.
pub fn find_type_by_name<S: AttrStore + ?Sized>(
    store: &S,
    root: &Path,
    name: &str,
    kind: IioKind,
) -> Result<u32> {
    entries(store, root)?
        .into_iter()
        .find(|e| e.kind == kind && e.name == name)
        .map(|e| e.number)
        .ok_or_else(|| Error::NotFound(format!("{}* named {name:?}", kind.dir_prefix())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockStore;

    fn tree() -> MockStore {
        MockStore::new()
            .with("/iio/iio:device0/name", "ad9361-phy\n")
            .with("/iio/iio:device2/name", "cf-ad9361-lpc\n")
            .with("/iio/iio:device10/name", "xadc\n")
            .with("/iio/trigger0/name", "sysfstrig0\n")
            .with("/iio/iio_sysfs_trigger/add_trigger", "")
            .with("/iio/iio:device3/uevent", "")
    }

    #[test]
    fn test_find_type_by_name() {
        let store = tree();
        let root = Path::new("/iio");
        assert_eq!(
            find_type_by_name(&store, root, "cf-ad9361-lpc", IioKind::Device).unwrap(),
            2
        );
        assert_eq!(
            find_type_by_name(&store, root, "sysfstrig0", IioKind::Trigger).unwrap(),
            0
        );
        assert!(matches!(
            find_type_by_name(&store, root, "sysfstrig0", IioKind::Device),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_find_names_numeric_order_and_filter() {
        let store = tree();
        let root = Path::new("/iio");
        let all = find_names(&store, root, None).unwrap();
        let nums: Vec<_> = all.iter().map(|e| (e.kind, e.number)).collect();
        assert_eq!(
            nums,
            vec![
                (IioKind::Device, 0),
                (IioKind::Device, 2),
                (IioKind::Device, 10),
                (IioKind::Trigger, 0)
            ]
        );

        let ad = find_names(&store, root, Some("ad9361")).unwrap();
        assert_eq!(ad.len(), 2);
        assert_eq!(ad[1].dir, PathBuf::from("/iio/iio:device2"));
    }
}
