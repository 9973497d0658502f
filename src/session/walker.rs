use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use crate::core::{FileContent, FileError, Result, SelectedFile};

/// Every regular file under `root`, depth-first, siblings in name order.
///
/// Relative paths start with the name of `root` itself (`photos/2024/a.jpg`),
/// the same shape a browser folder pick produces. The walk is lazy and can
/// be restarted at any subdirectory by walking that directory instead.
pub fn walk_directory(root: &Path) -> Result<impl Iterator<Item = Result<SelectedFile>> + use<>> {
    let root = root.canonicalize()?;
    let root_name = root
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| FileError::validation(format!("Cannot upload {} as a folder", root.display())))?
        .to_string();

    let walker = WalkDir::new(&root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter();

    Ok(walker.filter_map(move |entry| {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => return Some(Err(FileError::Io(err.into()))),
        };

        if !entry.file_type().is_file() {
            return None;
        }

        Some(selected_from_entry(&root, &root_name, entry.path()))
    }))
}

fn selected_from_entry(root: &Path, root_name: &str, path: &Path) -> Result<SelectedFile> {
    let relative = path
        .strip_prefix(root)
        .map_err(|err| FileError::internal(err.to_string()))?;

    let mut segments = vec![root_name.to_string()];
    for component in relative.components() {
        let segment = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| FileError::validation(format!("Invalid file name: {}", path.display())))?;
        segments.push(segment.to_string());
    }

    let name = segments.last().cloned().unwrap_or_default();
    Ok(SelectedFile {
        name,
        relative_path: Some(segments.join("/")),
        content: FileContent::Disk(path.to_path_buf()),
    })
}

/// Expand command line arguments into a selection. Returns the files and
/// whether any argument was a folder.
pub fn collect_selection(paths: &[PathBuf]) -> Result<(Vec<SelectedFile>, bool)> {
    let mut files = Vec::new();
    let mut is_folder = false;

    for path in paths {
        let metadata = std::fs::metadata(path)?;
        if metadata.is_dir() {
            is_folder = true;
            for file in walk_directory(path)? {
                files.push(file?);
            }
        } else {
            files.push(SelectedFile::from_path(path)?);
        }
    }

    Ok((files, is_folder))
}
