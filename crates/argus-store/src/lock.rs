//! Lock files under the store root.
//!
//! A lock is a file created with `create_new` holding `{pid} {owner}`.
//! Creation is atomic, so every process sharing the store directory sees
//! the same holder. A lock whose pid is no longer running is stale and is
//! taken over.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::StoreError;

const WRITE_LOCK_TIMEOUT: Duration = Duration::from_secs(30);
const WRITE_LOCK_RETRY: Duration = Duration::from_millis(50);

/// Who holds a lock, as recorded in the lock file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Holder {
    pid: Option<u32>,
    pub owner: String,
}

impl Holder {
    fn parse(text: &str) -> Self {
        let text = text.trim();
        let (pid, owner) = text.split_once(' ').unwrap_or((text, ""));
        let owner = owner.trim();
        Self {
            pid: pid.parse().ok(),
            owner: if owner.is_empty() {
                "unknown".to_string()
            } else {
                owner.to_string()
            },
        }
    }

    /// A holder with no readable pid may still be writing its file.
    fn is_stale(&self) -> bool {
        self.pid.is_some_and(|pid| !is_process_running(pid))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LockState {
    Acquired,
    HeldBy(Holder),
}

/// Try once to take the lock at `path` for `owner`.
pub(crate) fn try_acquire(path: &Path, owner: &str) -> Result<LockState, StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    // Second pass only after clearing a stale lock.
    for _ in 0..2 {
        match OpenOptions::new().create_new(true).write(true).open(path) {
            Ok(mut file) => {
                writeln!(file, "{} {owner}", std::process::id())
                    .map_err(|e| StoreError::io(path, e))?;
                return Ok(LockState::Acquired);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let Some(holder) = read_holder(path)? else {
                    continue;
                };
                if !holder.is_stale() {
                    return Ok(LockState::HeldBy(holder));
                }
                tracing::warn!(
                    path = %path.display(),
                    owner = %holder.owner,
                    "removing stale lock"
                );
                remove_if_present(path)?;
            }
            Err(e) => return Err(StoreError::io(path, e)),
        }
    }
    let holder = read_holder(path)?.unwrap_or_else(|| Holder::parse(""));
    Ok(LockState::HeldBy(holder))
}

/// The current holder, or `None` if the lock is free.
pub(crate) fn read_holder(path: &Path) -> Result<Option<Holder>, StoreError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(Holder::parse(&text))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Remove the lock at `path` if `owner` holds it.
pub(crate) fn release(path: &Path, owner: &str) -> Result<(), StoreError> {
    match read_holder(path)? {
        Some(holder) if holder.owner == owner => remove_if_present(path),
        Some(holder) => {
            tracing::debug!(
                path = %path.display(),
                holder = %holder.owner,
                owner,
                "lock held by someone else; not released"
            );
            Ok(())
        }
        None => Ok(()),
    }
}

fn remove_if_present(path: &Path) -> Result<(), StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Blocking lock around read-modify-write cycles on the store's TOML files.
/// Released on drop.
pub(crate) struct WriteLockGuard {
    path: PathBuf,
}

impl WriteLockGuard {
    pub(crate) fn acquire(path: PathBuf) -> Result<Self, StoreError> {
        let owner = format!("writer-{}", std::process::id());
        let started = Instant::now();
        loop {
            match try_acquire(&path, &owner)? {
                LockState::Acquired => return Ok(Self { path }),
                LockState::HeldBy(holder) => {
                    if started.elapsed() >= WRITE_LOCK_TIMEOUT {
                        return Err(StoreError::Locked {
                            path,
                            holder: holder.owner,
                        });
                    }
                    std::thread::sleep(WRITE_LOCK_RETRY);
                }
            }
        }
    }
}

impl Drop for WriteLockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn is_process_running(pid: u32) -> bool {
    if pid == std::process::id() {
        return true;
    }
    probe_pid(pid)
}

#[cfg(unix)]
fn probe_pid(pid: u32) -> bool {
    std::process::Command::new("kill")
        .arg("-0")
        .arg(pid.to_string())
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

// Without a cheap liveness check, never treat a lock as stale.
#[cfg(not(unix))]
fn probe_pid(_pid: u32) -> bool {
    true
}
