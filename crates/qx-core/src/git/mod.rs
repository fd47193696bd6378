//! Version control access.
//!
//! Mutations shell out to the `git` binary so hooks, credentials and remote
//! helpers behave exactly as on the command line. Read-only queries go through
//! `git2`.

use std::path::Path;
use std::process::Command;

use anyhow::Context;
use git2::{Repository, StatusOptions};

use crate::error::CommandFailed;

/// Variables that would redirect git away from the working directory we pass.
const GIT_ENV_OVERRIDES: [&str; 4] = [
    "GIT_DIR",
    "GIT_WORK_TREE",
    "GIT_INDEX_FILE",
    "GIT_COMMON_DIR",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    pub stdout: String,
    pub stderr: String,
    pub status: i32,
}

pub trait Vcs: Send + Sync {
    /// Run `git <args>` in `cwd`. A non-zero exit is an error.
    fn run(&self, cwd: &Path, args: &[&str]) -> anyhow::Result<ExecResult>;

    /// True when the tree has no staged, unstaged or untracked changes.
    /// Anything that is not a repository counts as not clean.
    fn is_clean(&self, cwd: &Path) -> anyhow::Result<bool>;

    /// Full id of the commit `HEAD` points at.
    fn head_commit(&self, cwd: &Path) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemGit;

pub fn git_command() -> Command {
    let mut cmd = Command::new("git");
    for key in GIT_ENV_OVERRIDES {
        cmd.env_remove(key);
    }
    cmd
}

impl Vcs for SystemGit {
    fn run(&self, cwd: &Path, args: &[&str]) -> anyhow::Result<ExecResult> {
        tracing::debug!(prefix = "git", "git {} (in {})", args.join(" "), cwd.display());
        let output = git_command()
            .args(args)
            .current_dir(cwd)
            .output()
            .with_context(|| format!("Failed to run git {:?}", args))?;

        let result = ExecResult {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            status: output.status.code().unwrap_or(-1),
        };
        if !output.status.success() {
            return Err(CommandFailed {
                command: format!("git {}", args.join(" ")),
                code: result.status,
                stderr: result.stderr,
            }
            .into());
        }
        Ok(result)
    }

    fn is_clean(&self, cwd: &Path) -> anyhow::Result<bool> {
        let repo = match Repository::discover(cwd) {
            Ok(repo) => repo,
            Err(err) => {
                tracing::debug!(prefix = "git", "{} is not a repository: {}", cwd.display(), err);
                return Ok(false);
            }
        };
        let mut options = StatusOptions::new();
        options
            .include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);
        let statuses = repo
            .statuses(Some(&mut options))
            .with_context(|| format!("Failed to read status of {}", cwd.display()))?;
        Ok(statuses.is_empty())
    }

    fn head_commit(&self, cwd: &Path) -> anyhow::Result<String> {
        let repo = Repository::discover(cwd)
            .with_context(|| format!("Not a git repository: {}", cwd.display()))?;
        let commit = repo
            .head()
            .and_then(|head| head.peel_to_commit())
            .with_context(|| format!("Failed to resolve HEAD in {}", cwd.display()))?;
        Ok(commit.id().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn init_repo(dir: &Path) -> Repository {
        let repo = Repository::init(dir).unwrap();
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "qx").unwrap();
        config.set_str("user.email", "qx@example.com").unwrap();
        repo
    }

    fn commit_all(repo: &Repository, message: &str) -> git2::Oid {
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = repo.signature().unwrap();
        let parents: Vec<git2::Commit> = repo
            .head()
            .ok()
            .and_then(|head| head.peel_to_commit().ok())
            .into_iter()
            .collect();
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .unwrap()
    }

    #[test]
    fn untracked_files_make_tree_dirty() {
        let temp = TempDir::new().unwrap();
        let repo = init_repo(temp.path());
        fs::write(temp.path().join("a.txt"), "a").unwrap();
        commit_all(&repo, "init");
        assert!(SystemGit.is_clean(temp.path()).unwrap());

        fs::write(temp.path().join("b.txt"), "b").unwrap();
        assert!(!SystemGit.is_clean(temp.path()).unwrap());
    }

    #[test]
    fn ignored_files_keep_tree_clean() {
        let temp = TempDir::new().unwrap();
        let repo = init_repo(temp.path());
        fs::write(temp.path().join(".gitignore"), "dist/\n").unwrap();
        commit_all(&repo, "init");
        fs::create_dir_all(temp.path().join("dist")).unwrap();
        fs::write(temp.path().join("dist/app.js"), "app").unwrap();

        assert!(SystemGit.is_clean(temp.path()).unwrap());
    }

    #[test]
    fn head_commit_matches_last_commit() {
        let temp = TempDir::new().unwrap();
        let repo = init_repo(temp.path());
        fs::write(temp.path().join("a.txt"), "a").unwrap();
        let oid = commit_all(&repo, "init");

        assert_eq!(SystemGit.head_commit(temp.path()).unwrap(), oid.to_string());
    }

    #[test]
    fn head_commit_fails_without_commits() {
        let temp = TempDir::new().unwrap();
        init_repo(temp.path());
        assert!(SystemGit.head_commit(temp.path()).is_err());
    }
}
