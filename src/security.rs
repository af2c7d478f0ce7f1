#![forbid(unsafe_code)]

//! Shared security helpers used by the tubegate binary.

use anyhow::{Result, bail};
use nix::unistd::Uid;

/// Fails fast when a binary is started as root. The gateway only talks to
/// public HTTP APIs and has no business holding elevated privileges.
pub fn ensure_not_root(process: &str) -> Result<()> {
    if Uid::current().is_root() {
        bail!("{process} must not be run as root; please use an unprivileged service account");
    }
    Ok(())
}
