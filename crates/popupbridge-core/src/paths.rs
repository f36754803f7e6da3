// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Where the durable slot and config file live on desktop hosts. Mobile hosts
// hand the client their own files directory instead.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Subdirectory created under the user data root.
pub const DATA_SUBDIR: &str = "popupbridge";

/// `$XDG_DATA_HOME/popupbridge`, else `~/.local/share/popupbridge`, else a
/// directory under the system temp dir. Created if missing.
pub fn data_dir() -> io::Result<PathBuf> {
    let root = std::env::var_os("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local/share")))
        .unwrap_or_else(std::env::temp_dir);
    data_dir_in(&root)
}

/// `root/popupbridge`, created if missing.
pub fn data_dir_in(root: &Path) -> io::Result<PathBuf> {
    let dir = root.join(DATA_SUBDIR);
    match std::fs::create_dir_all(&dir) {
        Ok(()) => {
            debug!(path = %dir.display(), "data directory ready");
            Ok(dir)
        }
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "cannot create data directory");
            Err(e)
        }
    }
}
