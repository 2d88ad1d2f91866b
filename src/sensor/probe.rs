//! File-artifact probe for emulator hosts.
//!
//! Emulators leave well-known device nodes, init scripts and driver names
//! behind. The probe only checks for their presence; it never reads more
//! than the first kilobyte of a driver listing.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Genymotion sockets.
pub const GENY_FILES: &[&str] = &["/dev/socket/genyd", "/dev/socket/baseband_genyd"];

/// QEMU pipes.
pub const PIPES: &[&str] = &["/dev/socket/qemud", "/dev/qemu_pipe"];

/// Android-x86 and VirtualBox images.
pub const X86_FILES: &[&str] = &[
    "ueventd.android_x86.rc",
    "x86.prop",
    "ueventd.ttVM_x86.rc",
    "init.ttVM_x86.rc",
    "fstab.ttVM_x86",
    "fstab.vbox86",
    "init.vbox86.rc",
    "ueventd.vbox86.rc",
];

/// Andy emulator.
pub const ANDY_FILES: &[&str] = &["fstab.andy", "ueventd.andy.rc"];

/// Nox emulator.
pub const NOX_FILES: &[&str] = &["fstab.nox", "init.nox.rc", "ueventd.nox.rc"];

/// BlueStacks shared folder.
pub const BLUE_STACKS_FILES: &[&str] = &["/mnt/windows/BstSharedFolder"];

/// Driver names that only show up under QEMU.
pub const QEMU_DRIVERS: &[&str] = &["goldfish"];

const DRIVER_LISTINGS: &[&str] = &["/proc/tty/drivers", "/proc/cpuinfo"];

const DRIVER_READ_LIMIT: u64 = 1024;

/// Probe rooted at a filesystem root.
///
/// Paths are resolved relative to `root`, so tests can point the probe at a
/// scratch directory.
#[derive(Debug, Clone)]
pub struct EmulatorProbe {
    root: PathBuf,
}

impl EmulatorProbe {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Probe the real filesystem.
    pub fn system() -> Self {
        Self::new("/")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    /// True if any of `paths` exists under the root.
    pub fn any_exists(&self, paths: &[&str]) -> bool {
        paths.iter().any(|p| self.resolve(p).exists())
    }

    /// Look for known QEMU driver names in the kernel's driver listings.
    pub fn has_qemu_drivers(&self) -> bool {
        DRIVER_LISTINGS.iter().any(|listing| {
            let path = self.resolve(listing);
            match read_head(&path) {
                Some(data) => QEMU_DRIVERS.iter().any(|driver| data.contains(driver)),
                None => false,
            }
        })
    }

    /// Any known emulator artifact present.
    pub fn is_emulator(&self) -> bool {
        let hit = self.any_exists(GENY_FILES)
            || self.any_exists(ANDY_FILES)
            || self.any_exists(NOX_FILES)
            || self.has_qemu_drivers()
            || self.any_exists(PIPES)
            || self.any_exists(X86_FILES);
        if hit {
            tracing::debug!(root = %self.root.display(), "emulator artifacts found");
        }
        hit
    }

    pub fn is_bluestacks(&self) -> bool {
        self.any_exists(BLUE_STACKS_FILES)
    }
}

impl Default for EmulatorProbe {
    fn default() -> Self {
        Self::system()
    }
}

fn read_head(path: &Path) -> Option<String> {
    let file = File::open(path).ok()?;
    let mut buf = Vec::with_capacity(DRIVER_READ_LIMIT as usize);
    file.take(DRIVER_READ_LIMIT).read_to_end(&mut buf).ok()?;
    Some(String::from_utf8_lossy(&buf).into_owned())
}
