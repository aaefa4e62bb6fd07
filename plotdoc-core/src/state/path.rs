//! Helpers for the `/`-separated paths used to address widgets and settings.
//!
//! The root widget is `/`. Everything below it is `/a/b/c`. Commands only ever
//! store these strings, never references into the tree.

/// The non-empty components of `path`.
pub fn segments(path: &str) -> impl Iterator<Item = &str> + '_ {
    path.split('/').filter(|s| !s.is_empty())
}

/// Join a child name onto a parent path.
#[must_use]
pub fn join(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{parent}{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Split into `(parent, leaf)`. `None` for the root, which has no parent.
#[must_use]
pub fn split(path: &str) -> Option<(String, &str)> {
    let trimmed = path.trim_end_matches('/');
    let idx = trimmed.rfind('/')?;
    let leaf = &trimmed[idx + 1..];
    if leaf.is_empty() {
        return None;
    }
    let parent = if idx == 0 { "/" } else { &trimmed[..idx] };
    Some((parent.to_owned(), leaf))
}

/// Resolve `target` against `base`. Absolute targets ignore `base`.
/// `..` climbs one level (never above the root) and `.` is ignored.
#[must_use]
pub fn resolve_relative(base: &str, target: &str) -> String {
    let mut parts: Vec<&str> = if target.starts_with('/') {
        Vec::new()
    } else {
        segments(base).collect()
    };
    for seg in segments(target) {
        match seg {
            ".." => {
                parts.pop();
            }
            "." => (),
            seg => parts.push(seg),
        }
    }
    format!("/{}", parts.join("/"))
}

/// Whether `path` is `ancestor` itself or lies anywhere below it.
#[must_use]
pub fn is_within(ancestor: &str, path: &str) -> bool {
    if ancestor == "/" {
        return true;
    }
    path == ancestor || path.starts_with(&format!("{ancestor}/"))
}
