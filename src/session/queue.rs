use tracing::warn;
use crate::core::path::{join, normalize, relative_dir, stays_inside};
use crate::core::{SelectedFile, TaskId, UploadTask};

/// Turn a selection into upload tasks, in the order given.
///
/// A file carrying a multi-segment relative path lands in the matching
/// subdirectory of `current_dir`, which the store is asked to create.
/// Everything else lands directly in `current_dir`. Files whose relative
/// path climbs out with `..` are dropped.
pub fn build_queue(files: Vec<SelectedFile>, current_dir: &str) -> Vec<UploadTask> {
    files
        .into_iter()
        .filter(|file| match file.relative_path.as_deref() {
            Some(relative) if !stays_inside(relative) => {
                warn!(name = %file.name, %relative, "relative path leaves the target directory, skipped");
                false
            }
            _ => true,
        })
        .map(|file| {
            let dir = file.relative_path.as_deref().and_then(relative_dir);

            let (destination_path, create_intermediate_path) = match dir {
                Some(dir) => (join(current_dir, dir), true),
                None => (normalize(current_dir), false),
            };

            UploadTask {
                id: TaskId::new(),
                name: file.name,
                content: file.content,
                destination_path,
                create_intermediate_path,
            }
        })
        .collect()
}
