//! Cross-process advisory lock for one cache file
//!
//! The lock is a sibling file `<cache>.lock` whose content identifies the
//! owner (`<pid> <token>`). It is created atomically by writing a uniquely
//! named file and hard-linking it into place, so a reader never sees a
//! half-written owner. A lock whose owner process is gone, or whose content
//! cannot be parsed, is stale and gets cleared by the next acquirer.
//!
//! Removal never trusts an earlier read: the lock is first renamed to a unique
//! name, and only deleted if the moved file still holds the expected owner.
//! Otherwise it is linked back into place.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(0);

/// Outcome of a single acquisition attempt
#[derive(Debug)]
pub enum LockState {
    /// We hold the lock until the guard is dropped
    Owned(LockGuard),
    /// Another live owner holds it
    Shared(LockOwner),
    /// The lock file could not be created
    Error(io::Error),
}

/// Outcome of waiting for another owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The owner released the lock (or it changed hands)
    Unlocked,
    /// The owner process no longer exists
    OwnerDied,
    /// Still held when the wait timed out
    Timeout,
}

/// Identity of a lock holder as read from the lock file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockOwner {
    pid: Option<u32>,
    content: String,
}

impl LockOwner {
    fn parse(content: &str) -> Self {
        let pid = content
            .split_whitespace()
            .next()
            .and_then(|field| field.parse().ok());
        Self {
            pid,
            content: content.to_string(),
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Whether the owning process still runs. Unparseable owners count as dead.
    pub fn is_alive(&self) -> bool {
        self.pid.is_some_and(process_alive)
    }
}

/// Held lock; released on drop
#[derive(Debug)]
pub struct LockGuard {
    lock_path: PathBuf,
    content: String,
}

impl LockGuard {
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        match remove_if_owned_by(&self.lock_path, &self.content) {
            Ok(true) => {}
            Ok(false) => debug!("Lock {:?} no longer ours, leaving it", self.lock_path),
            Err(err) => debug!("Failed to release lock {:?}: {}", self.lock_path, err),
        }
    }
}

/// Lock scoped to one cache file path
#[derive(Debug, Clone)]
pub struct LockFile {
    lock_path: PathBuf,
    max_backoff: Duration,
}

impl LockFile {
    /// Lock for the cache stored at `cache_path`
    pub fn new(cache_path: &Path) -> Self {
        let mut name = cache_path.as_os_str().to_os_string();
        name.push(".lock");
        Self {
            lock_path: PathBuf::from(name),
            max_backoff: Duration::from_millis(500),
        }
    }

    /// Cap the polling interval used by [`LockFile::wait_for_unlock`]
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff.max(Duration::from_millis(1));
        self
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Try once to take the lock, clearing stale lock files on the way.
    pub fn try_acquire(&self) -> LockState {
        loop {
            match self.read_owner() {
                Ok(Some(owner)) if owner.is_alive() => return LockState::Shared(owner),
                Ok(Some(owner)) => {
                    debug!("Clearing stale lock {:?} (owner {:?})", self.lock_path, owner.pid);
                    match self.clear_stale(&owner) {
                        Ok(true) => {}
                        // changed hands since it was read
                        Ok(false) => continue,
                        Err(err) => return LockState::Error(err),
                    }
                }
                Ok(None) => {}
                Err(err) => return LockState::Error(err),
            }

            match self.create() {
                Ok(content) => {
                    return LockState::Owned(LockGuard {
                        lock_path: self.lock_path.clone(),
                        content,
                    })
                }
                // somebody got in between; look at them on the next round
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(err) => return LockState::Error(err),
            }
        }
    }

    /// Block until `owner` lets go of the lock, dies, or `timeout` passes.
    ///
    /// Polls with exponential backoff capped at the configured maximum.
    pub fn wait_for_unlock(&self, owner: &LockOwner, timeout: Duration) -> WaitOutcome {
        let start = Instant::now();
        let mut interval = Duration::from_millis(1);
        loop {
            match self.read_owner() {
                Ok(Some(current)) if current == *owner => {}
                // gone, or taken over by someone else
                Ok(_) => return WaitOutcome::Unlocked,
                Err(err) => debug!("Failed to read lock {:?}: {}", self.lock_path, err),
            }
            if !owner.is_alive() {
                return WaitOutcome::OwnerDied;
            }
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return WaitOutcome::Timeout;
            }
            thread::sleep(interval.min(timeout - elapsed));
            interval = (interval * 2).min(self.max_backoff);
        }
    }

    /// Remove the lock file whoever owns it
    pub fn unsafe_remove(&self) -> io::Result<()> {
        remove_if_present(&self.lock_path)
    }

    fn read_owner(&self) -> io::Result<Option<LockOwner>> {
        match fs::read_to_string(&self.lock_path) {
            Ok(content) => Ok(Some(LockOwner::parse(&content))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Remove the lock only if it still holds `stale`. Returns whether it did.
    fn clear_stale(&self, stale: &LockOwner) -> io::Result<bool> {
        remove_if_owned_by(&self.lock_path, &stale.content)
    }

    /// Link a fresh owner file into place, returning its content
    fn create(&self) -> io::Result<String> {
        let (unique, pid, token) = unique_path(&self.lock_path, "-");
        let content = format!("{} {}\n", pid, token);

        let result = write_owner(&unique, &content)
            .and_then(|()| fs::hard_link(&unique, &self.lock_path));
        let _ = fs::remove_file(&unique);
        result.map(|()| content)
    }
}

/// Sibling of `lock_path` no other process or thread will pick
fn unique_path(lock_path: &Path, separator: &str) -> (PathBuf, u32, u64) {
    let pid = std::process::id();
    let token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
    let mut unique = lock_path.as_os_str().to_os_string();
    unique.push(format!("{}{}-{}", separator, pid, token));
    (PathBuf::from(unique), pid, token)
}

fn write_owner(path: &Path, content: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()
}

/// Delete the lock at `lock_path` if its content is `expected`.
///
/// The file is renamed aside before it is read, so a lock created after the
/// check is never the one deleted. A mismatching file is linked back.
fn remove_if_owned_by(lock_path: &Path, expected: &str) -> io::Result<bool> {
    let (aside, _, _) = unique_path(lock_path, ".stale-");
    match fs::rename(lock_path, &aside) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    }

    let owned = fs::read_to_string(&aside).is_ok_and(|content| content == expected);
    if !owned {
        if let Err(err) = fs::hard_link(&aside, lock_path) {
            debug!("Failed to restore lock {:?}: {}", lock_path, err);
        }
    }
    remove_if_present(&aside)?;
    Ok(owned)
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }
    // SAFETY: signal 0 only performs the existence and permission checks
    let rc = unsafe { libc::kill(pid, 0) };
    rc == 0 || io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}
