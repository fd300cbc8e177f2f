use std::collections::{HashMap, HashSet};

/// Longest base name kept, in characters, before any dedup suffix.
pub const MAX_NAME_CHARS: usize = 120;

const RESERVED_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

const DEVICE_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Name used for rows without a usable name.
pub fn placeholder_name(row_index: usize) -> String {
    format!("Query_{}", row_index)
}

/// Turns free text into a single filesystem-safe path component.
/// Returns `None` when nothing usable is left.
pub fn sanitize_name(raw: &str) -> Option<String> {
    let replaced: String = raw
        .trim()
        .chars()
        .map(|c| {
            if RESERVED_CHARS.contains(&c) || c.is_control() || c.is_whitespace() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = replaced.trim_matches('.');
    let capped: String = trimmed.chars().take(MAX_NAME_CHARS).collect();
    let capped = capped.trim_end_matches('.');

    if capped.is_empty() {
        return None;
    }

    Some(escape_device_name(capped))
}

fn escape_device_name(name: &str) -> String {
    let (base, rest) = match name.find('.') {
        Some(pos) => name.split_at(pos),
        None => (name, ""),
    };

    if DEVICE_NAMES.contains(&base.to_uppercase().as_str()) {
        format!("{}_{}", base, rest)
    } else {
        name.to_string()
    }
}

/// Tracks the names handed out inside one output directory.
///
/// The first claim of a name keeps it bare; later claims get `_2`, `_3`, ...
/// Comparison ignores case so the result also holds on case-insensitive
/// filesystems.
#[derive(Debug, Default)]
pub struct NameRegistry {
    taken: HashSet<String>,
    next_suffix: HashMap<String, usize>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, base: &str) -> String {
        let key = base.to_lowercase();

        if self.taken.insert(key.clone()) {
            return base.to_string();
        }

        let mut suffix = self.next_suffix.get(&key).copied().unwrap_or(2);
        loop {
            let candidate = format!("{}_{}", base, suffix);
            suffix += 1;

            if self.taken.insert(candidate.to_lowercase()) {
                self.next_suffix.insert(key, suffix);
                return candidate;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.taken.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taken.is_empty()
    }
}
