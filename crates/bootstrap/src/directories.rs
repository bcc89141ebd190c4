use std::fs::{self, DirBuilder, Permissions};
use std::io::ErrorKind;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info};

use hostwarden_core::{keys, ConfigStore};

/// Owner-only access for everything under the data root.
pub const DIRECTORY_MODE: u32 = 0o700;

/// Ensures the root, data, archive and backup directories exist.
///
/// A data directory that is a symlink is resolved to its real location and the
/// store is rewritten to point there, so later containment checks against the
/// data directory compare like with like. A data directory that already exists
/// has its mode tightened, since creation only applies the mode to new entries.
pub fn provision_directories(store: &mut ConfigStore) -> Result<()> {
    let root = store.get_path(keys::ROOT_DIRECTORY);
    debug!(path = %root.display(), "ensuring root data directory exists");
    create_private_dir(&root)?;

    let configured = store.get_path(keys::DATA);
    let (data, existed) = match fs::canonicalize(&configured) {
        Ok(resolved) if resolved != configured => {
            let persisted = resolved.to_str().ok_or_else(|| {
                anyhow!(
                    "data directory {} resolves to non UTF-8 path {}",
                    configured.display(),
                    resolved.display()
                )
            })?;
            info!(
                configured = %configured.display(),
                resolved = %resolved.display(),
                "data directory resolves elsewhere, using real path"
            );
            store.set_string(keys::DATA, persisted);
            (resolved, true)
        }
        Ok(_) => (configured, true),
        Err(err) if err.kind() == ErrorKind::NotFound => (configured, false),
        Err(err) => {
            return Err(err).with_context(|| {
                format!("resolve data directory {}", configured.display())
            })
        }
    };

    debug!(path = %data.display(), "ensuring server data directory exists");
    create_private_dir(&data)?;
    if existed {
        fs::set_permissions(&data, Permissions::from_mode(DIRECTORY_MODE))
            .with_context(|| format!("restrict permissions on {}", data.display()))?;
    }

    let archive = store.get_path(keys::ARCHIVE_DIRECTORY);
    debug!(path = %archive.display(), "ensuring archive data directory exists");
    create_private_dir(&archive)?;

    let backup = store.get_path(keys::BACKUP_DIRECTORY);
    debug!(path = %backup.display(), "ensuring backup data directory exists");
    create_private_dir(&backup)?;

    Ok(())
}

fn create_private_dir(path: &Path) -> Result<()> {
    DirBuilder::new()
        .recursive(true)
        .mode(DIRECTORY_MODE)
        .create(path)
        .with_context(|| format!("create directory {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    use std::os::unix::fs::symlink;

    use super::*;
    use tempfile::TempDir;

    fn store_rooted_at(base: &Path) -> ConfigStore {
        let mut store = ConfigStore::default();
        store.set_string(keys::ROOT_DIRECTORY, base.join("root").to_string_lossy());
        store.set_string(keys::DATA, base.join("root/volumes").to_string_lossy());
        store.set_string(keys::ARCHIVE_DIRECTORY, base.join("root/archives").to_string_lossy());
        store.set_string(keys::BACKUP_DIRECTORY, base.join("root/backups").to_string_lossy());
        store
    }

    fn mode_of(path: &Path) -> u32 {
        fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[test]
    fn creates_missing_directories_owner_only() {
        let temp = TempDir::new().unwrap();
        let mut store = store_rooted_at(temp.path());
        let configured = store.get_path(keys::DATA);

        provision_directories(&mut store).unwrap();

        for name in ["root", "root/volumes", "root/archives", "root/backups"] {
            let path = temp.path().join(name);
            assert!(path.is_dir(), "{name} missing");
            assert_eq!(mode_of(&path), 0o700, "{name} mode");
        }
        assert_eq!(store.get_path(keys::DATA), configured);
    }

    #[test]
    fn symlinked_data_directory_is_rewritten_to_target() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("disk/volumes");
        fs::create_dir_all(&target).unwrap();
        fs::set_permissions(&target, Permissions::from_mode(0o755)).unwrap();
        let link = temp.path().join("volumes-link");
        symlink(&target, &link).unwrap();

        let mut store = store_rooted_at(temp.path());
        store.set_string(keys::DATA, link.to_string_lossy());

        provision_directories(&mut store).unwrap();

        let resolved = fs::canonicalize(&target).unwrap();
        assert_eq!(store.get_path(keys::DATA), resolved);
        assert!(resolved.is_dir());
        assert_eq!(mode_of(&resolved), 0o700);
    }

    #[test]
    fn existing_data_directory_is_tightened() {
        let temp = TempDir::new().unwrap();
        let base = fs::canonicalize(temp.path()).unwrap();
        let mut store = store_rooted_at(&base);
        let data = base.join("root/volumes");
        fs::create_dir_all(&data).unwrap();
        fs::set_permissions(&data, Permissions::from_mode(0o777)).unwrap();

        provision_directories(&mut store).unwrap();

        assert_eq!(store.get_path(keys::DATA), data);
        assert_eq!(mode_of(&data), 0o700);
    }

    #[test]
    fn non_utf8_symlink_target_is_rejected() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join(OsStr::from_bytes(b"disk-\xff"));
        fs::create_dir_all(&target).unwrap();
        let link = temp.path().join("volumes-link");
        symlink(&target, &link).unwrap();

        let mut store = store_rooted_at(temp.path());
        store.set_string(keys::DATA, link.to_string_lossy());

        let err = provision_directories(&mut store).unwrap_err();
        assert!(err.to_string().contains("non UTF-8"));
        assert_eq!(store.get_path(keys::DATA), link);
    }

    #[test]
    fn nested_symlink_in_parent_is_resolved() {
        let temp = TempDir::new().unwrap();
        let real = temp.path().join("real");
        fs::create_dir_all(real.join("volumes")).unwrap();
        symlink(&real, temp.path().join("alias")).unwrap();

        let mut store = store_rooted_at(temp.path());
        store.set_string(keys::DATA, temp.path().join("alias/volumes").to_string_lossy());

        provision_directories(&mut store).unwrap();

        assert_eq!(
            store.get_path(keys::DATA),
            fs::canonicalize(real.join("volumes")).unwrap()
        );
    }

    #[test]
    fn rerun_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let mut store = store_rooted_at(temp.path());

        provision_directories(&mut store).unwrap();
        let first = store.clone();
        provision_directories(&mut store).unwrap();

        assert_eq!(store, first);
    }

    #[test]
    fn file_in_place_of_directory_is_fatal() {
        let temp = TempDir::new().unwrap();
        let mut store = store_rooted_at(temp.path());
        fs::create_dir_all(temp.path().join("root")).unwrap();
        fs::write(temp.path().join("root/archives"), b"not a directory").unwrap();

        let err = provision_directories(&mut store).unwrap_err();
        assert!(err.to_string().contains("archives"));
    }

    #[test]
    fn unresolvable_data_path_other_than_missing_is_fatal() {
        let temp = TempDir::new().unwrap();
        let mut store = store_rooted_at(temp.path());
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, b"file").unwrap();
        store.set_string(keys::DATA, blocker.join("volumes").to_string_lossy());

        let err = provision_directories(&mut store).unwrap_err();
        assert!(err.to_string().contains("resolve data directory"));
        assert_eq!(store.get_path(keys::DATA), blocker.join("volumes"));
    }
}
