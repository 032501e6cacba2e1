// Local crates
use crate::helpers::load_config::ConfigError;

// External crates
use std::fs::File;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use tracing::instrument;

/// Mode a credentials file must carry: owner read/write, nothing else.
pub const MODE_ONLY_USER_READABLE: u32 = 0o600;

/// Expand a leading `~/` to the current user's home directory.
///
/// The shortcut is only recognized as a path prefix: `foo/~/bar.txt` and a
/// bare `~` are returned untouched.
#[instrument(
    name = "datadog_paths::expand",
    target = "helpers::paths",
    level = "trace",
    skip_all
)]
pub fn expand_path(path: &str) -> Result<PathBuf, ConfigError> {
    let shortcut = format!("~{MAIN_SEPARATOR}");
    let Some(rest) = path.strip_prefix(shortcut.as_str()) else {
        return Ok(PathBuf::from(path));
    };

    let home = dirs::home_dir().ok_or(ConfigError::HomeDirUnavailable)?;
    tracing::trace!(
        home_dir = %home.display(),
        path = %path,
        "Expanding home directory shortcut"
    );
    Ok(home.join(rest))
}

/// Refuse to read credentials from a file other users could read or write.
///
/// The check runs against the already opened handle, so the file that is
/// checked is the file that gets read.
#[cfg(unix)]
pub fn ensure_exclusive_permissions(file: &File, path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = file.metadata().map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mode = metadata.permissions().mode() & 0o7777;

    if !metadata.is_file() || mode != MODE_ONLY_USER_READABLE {
        tracing::error!(
            path = %path.display(),
            mode = %format!("{mode:o}"),
            "Credentials file has unsafe permissions"
        );
        return Err(ConfigError::UnsafePermissions {
            path: path.to_path_buf(),
            mode,
        });
    }

    Ok(())
}

#[cfg(not(unix))]
pub fn ensure_exclusive_permissions(_file: &File, path: &Path) -> Result<(), ConfigError> {
    tracing::warn!(
        path = %path.display(),
        "Permission bits are not available on this platform, skipping credentials file check"
    );
    Ok(())
}
