//! `WorkingDirectory`: current path, the overlays that host it, and the
//! conflict policy used to pick a primary among them.

use crate::error::{Result, VfsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    Manual,
    Oldest,
    Newest,
}

pub struct WorkingDirectory {
    pub path: String,
    pub overlays: Vec<usize>,
    pub primary_overlay: usize,
    pub conflict_policy: ConflictPolicy,
}

impl WorkingDirectory {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), overlays: vec![0], primary_overlay: 0, conflict_policy: ConflictPolicy::Manual }
    }

    fn pick_primary(&self, candidates: &[usize]) -> Result<usize> {
        match self.conflict_policy {
            ConflictPolicy::Oldest => candidates.iter().min().copied().ok_or_else(|| VfsError::Ambiguous(self.path.clone())),
            ConflictPolicy::Newest => candidates.iter().max().copied().ok_or_else(|| VfsError::Ambiguous(self.path.clone())),
            ConflictPolicy::Manual => {
                if candidates.contains(&self.primary_overlay) {
                    Ok(self.primary_overlay)
                } else {
                    candidates.iter().min().copied().ok_or_else(|| VfsError::Ambiguous(self.path.clone()))
                }
            }
        }
    }

    /// Updates `overlays`/`primary_overlay` after resolving `path`
    /// against `hosting`, the ids that actually host it. Fails
    /// `NotADir` if none do.
    pub fn update_directory_context(&mut self, path: impl Into<String>, hosting: Vec<usize>) -> Result<()> {
        let path = path.into();
        if hosting.is_empty() {
            return Err(VfsError::NotADir(path));
        }
        let mut sorted = hosting;
        sorted.sort_unstable();
        sorted.dedup();
        self.primary_overlay = self.pick_primary(&sorted)?;
        self.overlays = sorted;
        self.path = path;
        Ok(())
    }

    /// Arbitrates among `candidates` without changing `self`. `Manual`
    /// fails `Ambiguous` (rather than silently falling back) when the
    /// previous primary isn't a candidate — unlike
    /// `update_directory_context`, which must always produce *some*
    /// primary for the new directory.
    pub fn select_overlay(&self, candidates: &[usize]) -> Result<usize> {
        match self.conflict_policy {
            ConflictPolicy::Oldest => candidates.iter().min().copied().ok_or_else(|| VfsError::Ambiguous(self.path.clone())),
            ConflictPolicy::Newest => candidates.iter().max().copied().ok_or_else(|| VfsError::Ambiguous(self.path.clone())),
            ConflictPolicy::Manual => {
                if candidates.contains(&self.primary_overlay) {
                    Ok(self.primary_overlay)
                } else {
                    Err(VfsError::Ambiguous(self.path.clone()))
                }
            }
        }
    }

    /// Renumbers after overlay `removed_id` is torn down: drops it from
    /// `overlays`, shifts every higher id down by one, and coerces
    /// `primary_overlay` to match — defaulting to `0` if the overlay
    /// list would otherwise be empty.
    pub fn adjust_context_after_unmount(&mut self, removed_id: usize) {
        self.overlays.retain(|&id| id != removed_id);
        for id in self.overlays.iter_mut() {
            if *id > removed_id {
                *id -= 1;
            }
        }
        if self.overlays.is_empty() {
            self.primary_overlay = 0;
            self.overlays.push(0);
            return;
        }
        if self.primary_overlay == removed_id {
            self.primary_overlay = self.overlays[0];
        } else if self.primary_overlay > removed_id {
            self.primary_overlay -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_keeps_previous_primary_when_present() {
        let mut wd = WorkingDirectory::new("/");
        wd.primary_overlay = 2;
        wd.update_directory_context("/a", vec![0, 2, 3]).unwrap();
        assert_eq!(wd.primary_overlay, 2);
    }

    #[test]
    fn manual_falls_back_to_smallest_for_new_directory() {
        let mut wd = WorkingDirectory::new("/");
        wd.primary_overlay = 5;
        wd.update_directory_context("/a", vec![0, 1]).unwrap();
        assert_eq!(wd.primary_overlay, 0);
    }

    #[test]
    fn select_overlay_manual_is_ambiguous_when_primary_absent() {
        let mut wd = WorkingDirectory::new("/");
        wd.primary_overlay = 9;
        assert!(wd.select_overlay(&[0, 1]).is_err());
    }

    #[test]
    fn newest_and_oldest_pick_extremes() {
        let mut wd = WorkingDirectory::new("/");
        wd.conflict_policy = ConflictPolicy::Newest;
        assert_eq!(wd.select_overlay(&[0, 3, 1]).unwrap(), 3);
        wd.conflict_policy = ConflictPolicy::Oldest;
        assert_eq!(wd.select_overlay(&[0, 3, 1]).unwrap(), 0);
    }

    #[test]
    fn adjust_after_unmount_renumbers_and_defaults_empty_to_zero() {
        let mut wd = WorkingDirectory::new("/");
        wd.overlays = vec![1, 2];
        wd.primary_overlay = 2;
        wd.adjust_context_after_unmount(1);
        assert_eq!(wd.overlays, vec![1]);
        assert_eq!(wd.primary_overlay, 1);

        wd.adjust_context_after_unmount(1);
        assert_eq!(wd.overlays, vec![0]);
        assert_eq!(wd.primary_overlay, 0);
    }
}
