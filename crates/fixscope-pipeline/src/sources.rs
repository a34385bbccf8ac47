//! Sourcing repository checkouts: GitHub search, list files, and cloning.

use std::path::Path;

use fixscope_core::FixscopeError;

/// Largest page size the search API accepts.
const MAX_PER_PAGE: u8 = 100;

/// GitHub repository search client.
pub struct GitHubSearch {
    octocrab: octocrab::Octocrab,
}

impl GitHubSearch {
    /// Create a client from an explicit token or the `GITHUB_TOKEN`
    /// environment variable. Without either, requests are anonymous and
    /// subject to lower rate limits.
    ///
    /// # Errors
    ///
    /// Returns [`FixscopeError::GitHub`] if the client cannot be built.
    pub fn new(token: Option<&str>) -> Result<Self, FixscopeError> {
        let token = token
            .map(str::to_string)
            .or_else(|| std::env::var("GITHUB_TOKEN").ok());

        let mut builder = octocrab::Octocrab::builder();
        if let Some(token) = token {
            builder = builder.personal_token(token);
        }
        let octocrab = builder
            .build()
            .map_err(|e| FixscopeError::GitHub(format!("failed to create GitHub client: {e}")))?;
        Ok(Self { octocrab })
    }

    /// Clone URLs of the `top_n` most-starred repositories written in
    /// `language` with at least `min_stars` stars, most stars first.
    ///
    /// # Errors
    ///
    /// Returns [`FixscopeError::GitHub`] on network or API errors.
    pub async fn top_repositories(
        &self,
        language: &str,
        min_stars: u32,
        top_n: usize,
    ) -> Result<Vec<String>, FixscopeError> {
        let query = search_query(language, min_stars);
        let per_page = top_n.clamp(1, usize::from(MAX_PER_PAGE)) as u8;
        tracing::info!(query = %query, top_n, "searching GitHub repositories");

        let mut urls = Vec::new();
        let mut page_number = 1u32;
        while urls.len() < top_n {
            let page = self
                .octocrab
                .search()
                .repositories(&query)
                .sort("stars")
                .order("desc")
                .per_page(per_page)
                .page(page_number)
                .send()
                .await
                .map_err(|e| FixscopeError::GitHub(format!("repository search failed: {e}")))?;

            if page.items.is_empty() {
                break;
            }
            for repo in page.items {
                if urls.len() >= top_n {
                    break;
                }
                match repo.clone_url {
                    Some(url) => urls.push(url.to_string()),
                    None => tracing::warn!(repository = %repo.name, "search result has no clone URL"),
                }
            }
            page_number += 1;
        }
        Ok(urls)
    }
}

/// Search query for popular repositories of one language.
///
/// # Examples
///
/// ```
/// use fixscope_pipeline::sources::search_query;
///
/// assert_eq!(search_query("Java", 5000), "language:Java stars:>=5000");
/// ```
pub fn search_query(language: &str, min_stars: u32) -> String {
    format!("language:{language} stars:>={min_stars}")
}

/// Checkout directory name for a clone URL: its last path segment without
/// a `.git` suffix.
///
/// # Examples
///
/// ```
/// use fixscope_pipeline::sources::repo_name_from_url;
///
/// assert_eq!(repo_name_from_url("https://github.com/google/guava.git").as_deref(), Some("guava"));
/// assert_eq!(repo_name_from_url("https://github.com/apache/kafka/").as_deref(), Some("kafka"));
/// assert_eq!(repo_name_from_url("").as_deref(), None);
/// ```
pub fn repo_name_from_url(url: &str) -> Option<String> {
    let last = url.trim().trim_end_matches('/').rsplit(['/', '\\']).next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    (!name.is_empty()).then(|| name.to_string())
}

/// Write one URL per line.
pub fn write_list(path: &Path, urls: &[String]) -> Result<(), FixscopeError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut content = urls.join("\n");
    content.push('\n');
    std::fs::write(path, content)?;
    Ok(())
}

/// Read URLs from a list file, ignoring blank lines and `#` comments.
///
/// # Errors
///
/// Returns [`FixscopeError::FileNotFound`] if the file does not exist.
pub fn read_list(path: &Path) -> Result<Vec<String>, FixscopeError> {
    if !path.exists() {
        return Err(FixscopeError::FileNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Counts from [`clone_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneSummary {
    pub cloned: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

/// Clone each URL into `repos_dir/<name>`, skipping names that already exist.
///
/// Clone failures are logged and recorded; they do not stop the loop.
///
/// # Errors
///
/// Returns [`FixscopeError::Io`] if `repos_dir` cannot be created.
pub fn clone_all(urls: &[String], repos_dir: &Path) -> Result<CloneSummary, FixscopeError> {
    std::fs::create_dir_all(repos_dir)?;
    let mut summary = CloneSummary::default();

    for url in urls {
        let Some(name) = repo_name_from_url(url) else {
            tracing::warn!(url = %url, "cannot derive a repository name, skipping");
            summary.failed.push(url.clone());
            continue;
        };
        let dest = repos_dir.join(&name);
        if dest.exists() {
            tracing::info!(repository = %name, "already present, skipping clone");
            summary.skipped.push(name);
            continue;
        }

        tracing::info!(repository = %name, url = %url, "cloning");
        match git2::Repository::clone(url, &dest) {
            Ok(_) => summary.cloned.push(name),
            Err(e) => {
                tracing::warn!(repository = %name, url = %url, error = %e, "clone failed");
                summary.failed.push(name);
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{Repository, Signature};

    fn upstream(dir: &Path) -> String {
        let repo = Repository::init(dir).unwrap();
        std::fs::write(dir.join("A.java"), "class A {}\n").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("A.java")).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("alice", "alice@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "Initial import", &tree, &[])
            .unwrap();
        dir.to_string_lossy().into_owned()
    }

    #[test]
    fn list_round_trip_skips_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lists/top.txt");
        write_list(&path, &["https://a/x.git".into(), "https://b/y.git".into()]).unwrap();
        std::fs::write(
            &path,
            format!("# top\n\n{}", std::fs::read_to_string(&path).unwrap()),
        )
        .unwrap();
        assert_eq!(read_list(&path).unwrap(), vec!["https://a/x.git", "https://b/y.git"]);
    }

    #[test]
    fn missing_list_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_list(&dir.path().join("none.txt")).unwrap_err();
        assert!(matches!(err, FixscopeError::FileNotFound(_)));
    }

    #[test]
    fn clone_skips_existing_checkouts() {
        let source = tempfile::tempdir().unwrap();
        let origin = source.path().join("upstream");
        std::fs::create_dir_all(&origin).unwrap();
        let url = upstream(&origin);

        let repos = tempfile::tempdir().unwrap();
        let first = clone_all(&[url.clone()], repos.path()).unwrap();
        assert_eq!(first.cloned, vec!["upstream"]);
        assert!(repos.path().join("upstream/.git").is_dir());
        assert!(repos.path().join("upstream/A.java").is_file());

        let second = clone_all(&[url], repos.path()).unwrap();
        assert!(second.cloned.is_empty());
        assert_eq!(second.skipped, vec!["upstream"]);
    }

    #[test]
    fn failed_clone_is_recorded() {
        let repos = tempfile::tempdir().unwrap();
        let missing = repos.path().join("elsewhere/ghost").to_string_lossy().into_owned();
        let summary = clone_all(&[missing], repos.path()).unwrap();
        assert_eq!(summary.failed, vec!["ghost"]);
        assert!(summary.cloned.is_empty());
    }
}
