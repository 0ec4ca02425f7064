//! Recursive removal of a credential directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::CredentialError;

/// Removes every file and subdirectory under `root`, then `root` itself.
///
/// Deletion is post-order (children before their parent) so no
/// `remove_dir` ever sees a non-empty directory. Symbolic links are removed
/// as entries and never followed. A missing `root` is not an error.
///
/// Not atomic: a crash part way through leaves a partial directory. The
/// next [`load_or_init`](crate::CredentialStore::load_or_init) either finds
/// no `creds.json` and starts fresh, or overwrites what is left on the
/// next save.
///
/// The walk uses an explicit stack rather than async recursion, so depth
/// is bounded by memory and not by the call stack.
pub async fn wipe(root: &Path) -> Result<(), CredentialError> {
    let meta = match fs::symlink_metadata(root).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %root.display(), "nothing to wipe");
            return Ok(());
        }
        Err(e) => return Err(CredentialError::io(root, e)),
    };

    if !meta.is_dir() {
        return fs::remove_file(root)
            .await
            .map_err(|e| CredentialError::io(root, e));
    }

    // (directory, children_already_queued)
    let mut stack: Vec<(PathBuf, bool)> = vec![(root.to_path_buf(), false)];
    let mut removed_files = 0usize;

    while let Some((dir, expanded)) = stack.pop() {
        if expanded {
            fs::remove_dir(&dir)
                .await
                .map_err(|e| CredentialError::io(&dir, e))?;
            continue;
        }

        // Revisit this directory after everything pushed below is gone.
        stack.push((dir.clone(), true));

        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| CredentialError::io(&dir, e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CredentialError::io(&dir, e))?
        {
            let path = entry.path();
            // `DirEntry::file_type` does not traverse symlinks.
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| CredentialError::io(&path, e))?;
            if file_type.is_dir() {
                stack.push((path, false));
            } else {
                fs::remove_file(&path)
                    .await
                    .map_err(|e| CredentialError::io(&path, e))?;
                removed_files += 1;
            }
        }
    }

    tracing::info!(path = %root.display(), removed_files, "credential directory wiped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wipe_missing_path_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("never-created");

        wipe(&missing).await.expect("missing path should be fine");

        assert!(!missing.exists());
    }

    #[tokio::test]
    async fn test_wipe_removes_nested_tree_and_root() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("auth");
        std::fs::create_dir_all(root.join("a/b/c")).unwrap();
        std::fs::write(root.join("creds.json"), "{}").unwrap();
        std::fs::write(root.join("a/pre-key-1.json"), "{}").unwrap();
        std::fs::write(root.join("a/b/c/session-x.json"), "{}").unwrap();
        std::fs::create_dir_all(root.join("empty")).unwrap();

        wipe(&root).await.expect("wipe should succeed");

        assert!(!root.exists(), "root directory should be gone");
        assert!(tmp.path().exists(), "parent must be untouched");
    }

    #[tokio::test]
    async fn test_wipe_plain_file_removes_it() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("creds.json");
        std::fs::write(&file, "{}").unwrap();

        wipe(&file).await.unwrap();

        assert!(!file.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_wipe_does_not_follow_symlinked_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let outside = tmp.path().join("outside");
        std::fs::create_dir_all(&outside).unwrap();
        std::fs::write(outside.join("keep.txt"), "keep").unwrap();

        let root = tmp.path().join("auth");
        std::fs::create_dir_all(&root).unwrap();
        std::os::unix::fs::symlink(&outside, root.join("link")).unwrap();

        wipe(&root).await.unwrap();

        assert!(!root.exists());
        assert!(
            outside.join("keep.txt").exists(),
            "target of a symlink must survive"
        );
    }
}
