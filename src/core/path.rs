//! Remote paths are `/`-separated and always absolute.

pub const ROOT: &str = "/";

/// Collapse duplicate slashes and `.`/`..` segments into an absolute path.
pub fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }

    format!("/{}", parts.join("/"))
}

/// Append a relative path to a directory.
pub fn join(base: &str, relative: &str) -> String {
    normalize(&format!("{}/{}", base, relative))
}

/// Parent directory, `None` at the root.
pub fn parent(path: &str) -> Option<String> {
    let path = normalize(path);
    if path == ROOT {
        return None;
    }

    match path.rfind('/') {
        Some(0) | None => Some(ROOT.to_string()),
        Some(index) => Some(path[..index].to_string()),
    }
}

pub fn is_root(path: &str) -> bool {
    normalize(path) == ROOT
}

/// Directory part of a relative path such as `photos/2024/a.jpg`, or `None`
/// when it is a single segment.
pub fn relative_dir(relative_path: &str) -> Option<&str> {
    let trimmed = relative_path.trim_matches('/');
    let (dir, _file) = trimmed.rsplit_once('/')?;
    if dir.is_empty() { None } else { Some(dir) }
}

/// True when a relative path stays below the directory it is joined to,
/// i.e. has no `..` segment.
pub fn stays_inside(relative_path: &str) -> bool {
    relative_path.split('/').all(|segment| segment != "..")
}

/// 格式化文件大小，与服务端 sizeFormatted 一致
pub fn format_size(size: u64) -> String {
    const UNIT: u64 = 1024;
    const PREFIXES: &[u8] = b"KMGTPE";

    if size < UNIT {
        return format!("{} B", size);
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = size / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    format!("{:.1} {}B", size as f64 / div as f64, PREFIXES[exp] as char)
}
