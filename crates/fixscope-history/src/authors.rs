//! Authorship of methods and of the fixes that touched them, via git2.

use std::collections::HashMap;
use std::path::Path;

use fixscope_core::{FixKeywords, FixscopeError};
use git2::{BlameOptions, DiffOptions, Repository, Sort};

/// Distinct authors of lines `start_line..=end_line` of `file_path` at HEAD,
/// in order of first appearance.
///
/// # Errors
///
/// Returns [`FixscopeError::Git`] if the repository cannot be opened or the
/// file cannot be blamed (for example, it is not committed).
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use fixscope_history::authors::blame_authors;
///
/// let authors = blame_authors(Path::new("repos/guava"), "src/Strings.java", 10, 40).unwrap();
/// println!("{authors:?}");
/// ```
pub fn blame_authors(
    repo_path: &Path,
    file_path: &str,
    start_line: u32,
    end_line: u32,
) -> Result<Vec<String>, FixscopeError> {
    let repo = open(repo_path)?;

    let mut opts = BlameOptions::new();
    opts.min_line(start_line.max(1) as usize)
        .max_line(end_line.max(start_line).max(1) as usize);

    let blame = repo
        .blame_file(Path::new(file_path), Some(&mut opts))
        .map_err(|e| FixscopeError::Git(format!("failed to blame {file_path}: {e}")))?;

    let mut authors: Vec<String> = Vec::new();
    for hunk in blame.iter() {
        let signature = hunk.final_signature();
        let name = signature.name().unwrap_or("unknown").to_string();
        if !authors.contains(&name) {
            authors.push(name);
        }
    }
    Ok(authors)
}

/// Author names of every commit reachable from HEAD that touches
/// `file_path` and whose message matches `keywords`.
///
/// One entry per commit, newest first, so an author appears once per fix.
///
/// # Errors
///
/// Returns [`FixscopeError::Git`] if the repository cannot be opened or walked.
pub fn fix_commit_authors(
    repo_path: &Path,
    file_path: &str,
    keywords: &FixKeywords,
) -> Result<Vec<String>, FixscopeError> {
    let repo = open(repo_path)?;

    let mut revwalk = repo
        .revwalk()
        .map_err(|e| FixscopeError::Git(format!("failed to create revwalk: {e}")))?;
    revwalk.set_sorting(Sort::TIME).ok();
    revwalk
        .push_head()
        .map_err(|e| FixscopeError::Git(format!("failed to push HEAD: {e}")))?;

    let mut authors = Vec::new();
    for oid_result in revwalk {
        let oid = oid_result.map_err(|e| FixscopeError::Git(format!("revwalk error: {e}")))?;
        let commit = repo
            .find_commit(oid)
            .map_err(|e| FixscopeError::Git(format!("failed to find commit: {e}")))?;

        if !keywords.matches(commit.message().unwrap_or("")) {
            continue;
        }
        if !touches_path(&repo, &commit, file_path)? {
            continue;
        }
        authors.push(commit.author().name().unwrap_or("unknown").to_string());
    }
    Ok(authors)
}

/// Share of the most frequent author in `authors`, or 0 for an empty list.
///
/// # Examples
///
/// ```
/// use fixscope_history::authors::author_concentration;
///
/// let authors = vec!["ann".to_string(), "bob".to_string(), "ann".to_string(), "ann".to_string()];
/// assert_eq!(author_concentration(&authors), 0.75);
/// assert_eq!(author_concentration(&[]), 0.0);
/// ```
pub fn author_concentration(authors: &[String]) -> f64 {
    if authors.is_empty() {
        return 0.0;
    }
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for author in authors {
        *counts.entry(author.as_str()).or_insert(0) += 1;
    }
    let max = counts.values().copied().max().unwrap_or(0);
    max as f64 / authors.len() as f64
}

fn open(repo_path: &Path) -> Result<Repository, FixscopeError> {
    Repository::open(repo_path)
        .map_err(|e| FixscopeError::Git(format!("failed to open repository: {e}")))
}

fn touches_path(
    repo: &Repository,
    commit: &git2::Commit,
    file_path: &str,
) -> Result<bool, FixscopeError> {
    let commit_tree = commit
        .tree()
        .map_err(|e| FixscopeError::Git(format!("failed to get commit tree: {e}")))?;

    let parent_tree = if commit.parent_count() > 0 {
        let parent = commit
            .parent(0)
            .map_err(|e| FixscopeError::Git(format!("failed to get parent: {e}")))?;
        Some(
            parent
                .tree()
                .map_err(|e| FixscopeError::Git(format!("failed to get parent tree: {e}")))?,
        )
    } else {
        None
    };

    let mut diff_opts = DiffOptions::new();
    diff_opts.pathspec(file_path).disable_pathspec_match(true);
    let diff = repo
        .diff_tree_to_tree(
            parent_tree.as_ref(),
            Some(&commit_tree),
            Some(&mut diff_opts),
        )
        .map_err(|e| FixscopeError::Git(format!("failed to compute diff: {e}")))?;

    Ok(diff.deltas().len() > 0)
}
