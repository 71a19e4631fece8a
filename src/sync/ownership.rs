//! Ownership and mode enforcement for `config.php`

use anyhow::{Context, Result, bail};
use std::ffi::CString;
use std::fs;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;

/// Parse an octal mode such as `0640` or `0o640`
pub fn parse_mode(mode: &str) -> Result<u32> {
    let digits = mode.trim().trim_start_matches("0o");
    let value = u32::from_str_radix(digits, 8)
        .with_context(|| format!("Invalid file mode '{mode}'"))?;
    if value > 0o7777 {
        bail!("Invalid file mode '{mode}'");
    }
    Ok(value)
}

/// Resolve a user name (or numeric id) to a uid
pub fn resolve_user(name: &str) -> Result<u32> {
    if let Ok(uid) = name.parse() {
        return Ok(uid);
    }
    let c_name = CString::new(name).context("Invalid user name")?;
    // SAFETY: getpwnam returns null or a pointer to static storage that
    // stays valid until the next passwd lookup; it is read immediately.
    let uid = unsafe {
        let entry = libc::getpwnam(c_name.as_ptr());
        if entry.is_null() {
            None
        } else {
            Some((*entry).pw_uid)
        }
    };
    uid.with_context(|| format!("Unknown user '{name}'"))
}

/// Resolve a group name (or numeric id) to a gid
pub fn resolve_group(name: &str) -> Result<u32> {
    if let Ok(gid) = name.parse() {
        return Ok(gid);
    }
    let c_name = CString::new(name).context("Invalid group name")?;
    // SAFETY: as for getpwnam above
    let gid = unsafe {
        let entry = libc::getgrnam(c_name.as_ptr());
        if entry.is_null() {
            None
        } else {
            Some((*entry).gr_gid)
        }
    };
    gid.with_context(|| format!("Unknown group '{name}'"))
}

/// Make `path` owned by `owner:group` with permission bits `mode`.
///
/// Returns whether anything changed. A missing file is left alone.
pub fn enforce(path: &Path, owner: &str, group: &str, mode: u32) -> Result<bool> {
    let Ok(before) = fs::metadata(path) else {
        log::debug!("{} does not exist, skipping ownership", path.display());
        return Ok(false);
    };
    let uid = resolve_user(owner)?;
    let gid = resolve_group(group)?;

    if before.mode() & 0o7777 != mode {
        log::info!("chmod {mode:04o} {}", path.display());
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .with_context(|| format!("Could not change mode of {}", path.display()))?;
    }
    if before.uid() != uid || before.gid() != gid {
        log::info!("chown {owner}:{group} {}", path.display());
        std::os::unix::fs::chown(path, Some(uid), Some(gid))
            .with_context(|| format!("Could not change owner of {}", path.display()))?;
    }

    let after = fs::metadata(path)?;
    Ok(before.mode() != after.mode() || before.uid() != after.uid() || before.gid() != after.gid())
}
