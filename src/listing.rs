use crate::types::{DirectoryEntry, MaxRights};

/// What a single listing line claims the entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    Symlink,
}

/// One parsed line of `LIST` output (or a bare `NLST` name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedItem {
    pub name: String,
    pub kind: EntryKind,
    pub mode: Option<u16>,
    pub size: Option<u64>,
}

/// Parses one Unix-style `LIST` line. Returns None for anything that does
/// not look like one (the `total NN` header, DOS-style listings, truncated
/// lines); absence of a mode is a normal outcome, never an error.
pub fn parse_unix_line(line: &str) -> Option<ListedItem> {
    let line = line.trim_end();
    let kind = match line.chars().next()? {
        'd' => EntryKind::Directory,
        '-' => EntryKind::File,
        'l' => EntryKind::Symlink,
        _ => return None,
    };

    let perms: String = line.chars().skip(1).take(9).collect();
    if perms.chars().count() < 9 {
        return None;
    }
    // Link permissions say nothing about the target, leave them out.
    let mode = match kind {
        EntryKind::Symlink => None,
        _ => Some(parse_mode(&perms)),
    };

    let (fields, raw_name) = split_fields(line)?;
    let size = fields[4].parse::<u64>().ok();
    let name = match kind {
        EntryKind::Symlink => raw_name.split(" -> ").next().unwrap_or(raw_name),
        _ => raw_name,
    };
    if name.is_empty() {
        return None;
    }

    Some(ListedItem {
        name: name.to_string(),
        kind,
        mode,
        size,
    })
}

/// Builds an item from a bare `NLST` name. Type is guessed with the dot
/// heuristic: a dot after the first character suggests a file.
pub fn item_from_name(raw: &str) -> ListedItem {
    let name = raw.rsplit('/').next().unwrap_or(raw).trim_end();
    let kind = if looks_like_file(name) {
        EntryKind::File
    } else {
        EntryKind::Directory
    };
    ListedItem {
        name: name.to_string(),
        kind,
        mode: None,
        size: None,
    }
}

pub fn looks_like_file(name: &str) -> bool {
    matches!(name.find('.'), Some(pos) if pos > 0)
}

/// Digit-wise OR of two three-digit mode values.
pub fn merge_modes(a: u16, b: u16) -> u16 {
    let owner = (a / 100) | (b / 100);
    let group = (a / 10 % 10) | (b / 10 % 10);
    let other = (a % 10) | (b % 10);
    owner * 100 + group * 10 + other
}

/// Widest mode seen across the root listing, directories and files apart.
/// Entries without a parseable mode (symlinks included) contribute nothing.
pub fn max_rights(entries: &[DirectoryEntry]) -> MaxRights {
    let mut rights = MaxRights::default();
    for entry in entries.iter().filter(|e| e.depth == 0) {
        let Some(mode) = entry.unix_mode else { continue };
        let slot = if entry.is_directory {
            &mut rights.directories
        } else {
            &mut rights.files
        };
        *slot = Some(match *slot {
            Some(prev) => merge_modes(prev, mode),
            None => mode,
        });
    }
    rights
}

/// The nine characters after the type flag, r/w per position, with `x`,
/// `X` and `s` all counting as execute.
fn parse_mode(perms: &str) -> u16 {
    let chars: Vec<char> = perms.chars().collect();
    let mut mode = 0u16;
    for triplet in 0..3 {
        let mut digit = 0u16;
        if chars[triplet * 3] == 'r' {
            digit += 4;
        }
        if chars[triplet * 3 + 1] == 'w' {
            digit += 2;
        }
        if matches!(chars[triplet * 3 + 2], 'x' | 'X' | 's') {
            digit += 1;
        }
        mode = mode * 10 + digit;
    }
    mode
}

/// Splits the eight leading fields (perms, links, owner, group, size,
/// month, day, time) and returns them with the remainder of the line, so
/// names keep their internal spacing.
fn split_fields(line: &str) -> Option<(Vec<&str>, &str)> {
    let mut rest = line;
    let mut fields = Vec::with_capacity(8);
    for _ in 0..8 {
        rest = rest.trim_start();
        let cut = rest.find(char::is_whitespace)?;
        fields.push(&rest[..cut]);
        rest = &rest[cut..];
    }
    let name = rest.trim_start();
    Some((fields, name))
}
