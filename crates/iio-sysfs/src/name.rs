use std::path::{Path, PathBuf};

const DIRECTIONS: [&str; 2] = ["in", "out"];

/// A channel's raw name together with the names its attributes may be shared
/// under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelName {
    pub name: String,
    pub generic: String,
    // kernel spelling for shared differential attributes, e.g. in_voltage-voltage
    shared: Option<String>,
}

impl ChannelName {
    pub fn new(name: &str) -> Self {
        let (generic, shared) = normalize(name);
        Self {
            name: name.to_string(),
            generic,
            shared,
        }
    }

    /// Attribute prefixes to try, most specific first, without duplicates.
    pub fn candidates(&self) -> Vec<&str> {
        let mut out = vec![self.name.as_str()];
        for c in [Some(self.generic.as_str()), self.shared.as_deref()]
            .into_iter()
            .flatten()
        {
            if !out.contains(&c) {
                out.push(c);
            }
        }
        out
    }

    /// Candidate paths `<dir>/<prefix>_<suffix>` in lookup order.
    pub fn attr_paths(&self, dir: &Path, suffix: &str) -> Vec<PathBuf> {
        self.candidates()
            .into_iter()
            .map(|c| dir.join(format!("{c}_{suffix}")))
            .collect()
    }
}

/// Strip the instance qualifier from a channel name.
///
/// `in_accel_x` becomes `in_accel`, `in_voltage3` becomes `in_voltage` and a
/// differential pair such as `in_voltage0-voltage1` becomes
/// `in_voltagedifferential`. Names that do not follow the convention are
/// returned unchanged.
pub fn break_up_name(full_name: &str) -> String {
    normalize(full_name).0
}

fn normalize(full_name: &str) -> (String, Option<String>) {
    let passthrough = (full_name.to_string(), None);
    let (direction, rest) = split_direction(full_name);
    let token = rest.split('_').next().unwrap_or_default();

    let (generic, shared) = match token.split_once('-') {
        Some((a, b)) => {
            let (ta, tb) = (strip_index(a), strip_index(b));
            if ta.is_empty() || ta != tb {
                return passthrough;
            }
            (format!("{ta}differential"), Some(format!("{ta}-{tb}")))
        }
        None => {
            let t = strip_index(token);
            if t.is_empty() {
                return passthrough;
            }
            (t.to_string(), None)
        }
    };

    match direction {
        Some(d) => (
            format!("{d}_{generic}"),
            shared.map(|s| format!("{d}_{s}")),
        ),
        None => (generic, shared),
    }
}

fn split_direction(name: &str) -> (Option<&'static str>, &str) {
    for d in DIRECTIONS {
        if let Some(rest) = name.strip_prefix(d).and_then(|r| r.strip_prefix('_')) {
            return (Some(d), rest);
        }
    }
    (None, name)
}

fn strip_index(token: &str) -> &str {
    token.trim_end_matches(|c: char| c.is_ascii_digit())
}
