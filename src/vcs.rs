// src/vcs.rs

use crate::error::{AnalysisError, Result};
use crate::model::CommitId;
use git2::{
    Commit, DiffFindOptions, DiffFormat, DiffOptions, ErrorCode, ObjectType, Oid, Repository, Sort,
};
use std::path::Path;

/// How far back a commit range reaches from its newest commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeBound {
    /// The newest N commits
    Count(usize),
    /// Down to and including this commit
    Through(CommitId),
    /// The whole first-parent history
    Full,
}

/// Read access to a repository's history.
pub trait History {
    /// Resolve a revision spec (hash, ref, `HEAD~3`, ...) to a full commit id
    fn resolve(&self, spec: &str) -> Result<CommitId>;

    /// First parent, or `None` for a root commit
    fn parent_of(&self, commit: &str) -> Result<Option<CommitId>>;

    /// Commit time in seconds since the epoch
    fn commit_time(&self, commit: &str) -> Result<i64>;

    /// Zero-context unified diff of `commit` against `parent` (the empty tree if `None`)
    fn diff(&self, commit: &str, parent: Option<&str>) -> Result<String>;

    /// Content of `path` at `commit`, `None` if it does not exist there
    fn file_content(&self, commit: &str, path: &str) -> Result<Option<Vec<u8>>>;

    /// Commits from `start` back along first parents, newest first
    fn commit_range(&self, start: &str, bound: &RangeBound) -> Result<Vec<CommitId>>;
}

pub struct GitHistory {
    repo: Repository,
}

impl GitHistory {
    /// Open the repository containing `path`
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path).map_err(|e| AnalysisError::RepositoryNotFound {
            path: path.display().to_string(),
            message: e.message().to_string(),
        })?;
        Ok(GitHistory { repo })
    }

    pub fn path(&self) -> &Path {
        self.repo.path()
    }

    fn find_commit(&self, id: &str) -> Result<Commit<'_>> {
        let oid = Oid::from_str(id)?;
        Ok(self.repo.find_commit(oid)?)
    }
}

impl History for GitHistory {
    fn resolve(&self, spec: &str) -> Result<CommitId> {
        self.repo
            .revparse_single(spec)
            .and_then(|object| object.peel_to_commit())
            .map(|commit| commit.id().to_string())
            .map_err(|e| AnalysisError::revision(spec, e.message()))
    }

    fn parent_of(&self, commit: &str) -> Result<Option<CommitId>> {
        let commit = self.find_commit(commit)?;
        if commit.parent_count() == 0 {
            return Ok(None);
        }
        Ok(Some(commit.parent_id(0)?.to_string()))
    }

    fn commit_time(&self, commit: &str) -> Result<i64> {
        Ok(self.find_commit(commit)?.time().seconds())
    }

    fn diff(&self, commit: &str, parent: Option<&str>) -> Result<String> {
        let new_tree = self.find_commit(commit)?.tree()?;
        let old_tree = match parent {
            Some(p) => Some(self.find_commit(p)?.tree()?),
            None => None,
        };

        let mut diff_opts = DiffOptions::new();
        diff_opts.context_lines(0);
        diff_opts.ignore_filemode(true);
        diff_opts.include_untracked(false);

        let mut diff = self
            .repo
            .diff_tree_to_tree(old_tree.as_ref(), Some(&new_tree), Some(&mut diff_opts))?;
        let mut find_opts = DiffFindOptions::new();
        find_opts.renames(true);
        diff.find_similar(Some(&mut find_opts))?;

        let mut text = String::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            match line.origin() {
                '+' | '-' | ' ' => text.push(line.origin()),
                // end-of-file newline markers
                '=' | '>' | '<' => return true,
                _ => {}
            }
            text.push_str(&String::from_utf8_lossy(line.content()));
            if !text.ends_with('\n') {
                text.push('\n');
            }
            true
        })?;
        Ok(text)
    }

    fn file_content(&self, commit: &str, path: &str) -> Result<Option<Vec<u8>>> {
        let tree = self.find_commit(commit)?.tree()?;
        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match entry.kind() {
            Some(ObjectType::Blob) => {}
            Some(ObjectType::Commit) => {
                return Err(AnalysisError::extraction(
                    path,
                    "submodule entries are not supported",
                ))
            }
            _ => return Ok(None),
        }
        let blob = self.repo.find_blob(entry.id())?;
        Ok(Some(blob.content().to_vec()))
    }

    fn commit_range(&self, start: &str, bound: &RangeBound) -> Result<Vec<CommitId>> {
        let start_oid = Oid::from_str(start)?;
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL)?;
        revwalk.simplify_first_parent()?;
        revwalk.push(start_oid)?;

        match bound {
            RangeBound::Count(n) => revwalk
                .take(*n)
                .map(|oid| -> Result<CommitId> { Ok(oid?.to_string()) })
                .collect(),
            RangeBound::Full => revwalk
                .map(|oid| -> Result<CommitId> { Ok(oid?.to_string()) })
                .collect(),
            RangeBound::Through(end) => {
                let end_oid = Oid::from_str(end)?;
                let mut commits = Vec::new();
                for oid in revwalk {
                    let oid = oid?;
                    commits.push(oid.to_string());
                    if oid == end_oid {
                        return Ok(commits);
                    }
                }
                Err(AnalysisError::revision(
                    end.as_str(),
                    format!("not on the first-parent history of {}", start),
                ))
            }
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::GitHistory;
    use git2::{Commit, Repository, Signature, Time};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// A throw-away repository with a deterministic clock
    pub struct TestRepo {
        pub dir: TempDir,
        pub repo: Repository,
        clock: i64,
    }

    impl TestRepo {
        pub fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let repo = Repository::init(dir.path()).unwrap();
            TestRepo {
                dir,
                repo,
                clock: 1_600_000_000,
            }
        }

        /// Write (`Some`) or delete (`None`) files and commit on HEAD
        pub fn commit(&mut self, files: &[(&str, Option<&str>)], message: &str) -> String {
            self.clock += 60;
            let mut index = self.repo.index().unwrap();
            for (path, content) in files {
                let full = self.dir.path().join(path);
                match content {
                    Some(text) => {
                        if let Some(parent) = full.parent() {
                            fs::create_dir_all(parent).unwrap();
                        }
                        fs::write(&full, text).unwrap();
                        index.add_path(Path::new(path)).unwrap();
                    }
                    None => {
                        fs::remove_file(&full).unwrap();
                        index.remove_path(Path::new(path)).unwrap();
                    }
                }
            }
            index.write().unwrap();
            let tree_id = index.write_tree().unwrap();
            let tree = self.repo.find_tree(tree_id).unwrap();
            let sig = Signature::new("Test", "test@example.com", &Time::new(self.clock, 0)).unwrap();
            let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
            let parents: Vec<&Commit> = parent.iter().collect();
            self.repo
                .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
                .unwrap()
                .to_string()
        }

        pub fn history(&self) -> GitHistory {
            GitHistory::open(self.dir.path()).unwrap()
        }
    }
}
