use std::collections::BTreeMap;
use std::fmt;

use fixscope_core::{AggregatedMethod, FixscopeError, ReportConfig};
use serde::Serialize;

/// Size thresholds splitting methods into small, medium and large.
///
/// # Examples
///
/// ```
/// use fixscope_report::{SizeTiers, Tier};
///
/// let tiers = SizeTiers::default();
/// assert_eq!(tiers.tier(10), Tier::Small);
/// assert_eq!(tiers.tier(11), Tier::Medium);
/// assert_eq!(tiers.tier(51), Tier::Large);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeTiers {
    /// Largest small size.
    pub small_max: u32,
    /// Largest medium size.
    pub medium_max: u32,
}

impl SizeTiers {
    /// # Errors
    ///
    /// Returns [`FixscopeError::Config`] unless `small_max < medium_max`.
    pub fn new(small_max: u32, medium_max: u32) -> Result<Self, FixscopeError> {
        if small_max >= medium_max {
            return Err(FixscopeError::Config(format!(
                "size tiers must increase: small_max {small_max} >= medium_max {medium_max}"
            )));
        }
        Ok(Self {
            small_max,
            medium_max,
        })
    }

    pub fn from_config(config: &ReportConfig) -> Result<Self, FixscopeError> {
        Self::new(config.small_max, config.medium_max)
    }

    pub fn tier(&self, size: u32) -> Tier {
        if size <= self.small_max {
            Tier::Small
        } else if size <= self.medium_max {
            Tier::Medium
        } else {
            Tier::Large
        }
    }

    /// Human-readable size range of `tier`, e.g. `11-50 lines`.
    pub fn range(&self, tier: Tier) -> String {
        match tier {
            Tier::Small => format!("<= {} lines", self.small_max),
            Tier::Medium => format!("{}-{} lines", self.small_max + 1, self.medium_max),
            Tier::Large => format!("> {} lines", self.medium_max),
        }
    }
}

impl Default for SizeTiers {
    fn default() -> Self {
        Self {
            small_max: 10,
            medium_max: 50,
        }
    }
}

/// Method size category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Small,
    Medium,
    Large,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Small, Tier::Medium, Tier::Large];
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Small => write!(f, "Small"),
            Tier::Medium => write!(f, "Medium"),
            Tier::Large => write!(f, "Large"),
        }
    }
}

/// Count and mean fix ratio of one tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierStats {
    pub tier: Tier,
    pub count: usize,
    /// `None` when the tier is empty.
    pub mean_fix_ratio: Option<f64>,
}

/// Mean fix ratio of one repository.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoMean {
    pub repository: String,
    pub methods: usize,
    pub mean_fix_ratio: f64,
}

/// Summary of a collection of aggregated methods.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub tiers: SizeTiers,
    pub total_methods: usize,
    pub total_repositories: usize,
    /// Methods with at least one fix change.
    pub methods_with_fixes: usize,
    pub mean_size: f64,
    pub median_size: f64,
    pub mean_fix_ratio: f64,
    pub median_fix_ratio: f64,
    /// Always one entry per tier, small to large.
    pub by_tier: Vec<TierStats>,
    /// Highest fix ratios first; ties keep input order.
    pub top_methods: Vec<AggregatedMethod>,
    /// Highest mean first; ties by repository name.
    pub per_repository: Vec<RepoMean>,
}

impl Statistics {
    pub fn is_empty(&self) -> bool {
        self.total_methods == 0
    }

    /// Stats for `tier`.
    pub fn tier(&self, tier: Tier) -> Option<&TierStats> {
        self.by_tier.iter().find(|t| t.tier == tier)
    }
}

/// Reduce `methods` into [`Statistics`], keeping the `top_k` highest fix
/// ratios.
///
/// An empty collection yields zero counts, zero averages, and empty tiers.
///
/// # Examples
///
/// ```
/// use fixscope_report::{compute, SizeTiers};
///
/// let stats = compute(&[], SizeTiers::default(), 10);
/// assert_eq!(stats.total_methods, 0);
/// assert_eq!(stats.by_tier.len(), 3);
/// assert!(stats.by_tier.iter().all(|t| t.mean_fix_ratio.is_none()));
/// ```
pub fn compute(methods: &[AggregatedMethod], tiers: SizeTiers, top_k: usize) -> Statistics {
    let sizes: Vec<f64> = methods.iter().map(|m| f64::from(m.size_lines)).collect();
    let ratios: Vec<f64> = methods.iter().map(|m| m.fix_ratio).collect();

    let by_tier = Tier::ALL
        .iter()
        .map(|&tier| {
            let in_tier: Vec<f64> = methods
                .iter()
                .filter(|m| tiers.tier(m.size_lines) == tier)
                .map(|m| m.fix_ratio)
                .collect();
            TierStats {
                tier,
                count: in_tier.len(),
                mean_fix_ratio: (!in_tier.is_empty()).then(|| mean(&in_tier)),
            }
        })
        .collect();

    let mut top_methods = methods.to_vec();
    top_methods.sort_by(|a, b| b.fix_ratio.total_cmp(&a.fix_ratio));
    top_methods.truncate(top_k);

    let mut grouped: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for m in methods {
        grouped.entry(&m.repository).or_default().push(m.fix_ratio);
    }
    let mut per_repository: Vec<RepoMean> = grouped
        .into_iter()
        .map(|(repository, ratios)| RepoMean {
            repository: repository.to_string(),
            methods: ratios.len(),
            mean_fix_ratio: mean(&ratios),
        })
        .collect();
    per_repository.sort_by(|a, b| b.mean_fix_ratio.total_cmp(&a.mean_fix_ratio));

    Statistics {
        tiers,
        total_methods: methods.len(),
        total_repositories: per_repository.len(),
        methods_with_fixes: methods.iter().filter(|m| m.fix_commit_count > 0).count(),
        mean_size: mean(&sizes),
        median_size: median(&sizes),
        mean_fix_ratio: mean(&ratios),
        median_fix_ratio: median(&ratios),
        by_tier,
        top_methods,
        per_repository,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(name: &str, repo: &str, size: u32, commits: u32, fixes: u32) -> AggregatedMethod {
        AggregatedMethod {
            name: name.into(),
            file_path: format!("{name}.java"),
            start_line: 1,
            end_line: size,
            size_lines: size,
            repository: repo.into(),
            commit_count: commits,
            fix_commit_count: fixes,
            fix_ratio: f64::from(fixes) / f64::from(commits),
            fix_commit_ids: vec![],
        }
    }

    #[test]
    fn tiers_split_on_inclusive_bounds() {
        let methods = vec![
            method("a", "r1", 10, 2, 1),
            method("b", "r1", 11, 4, 1),
            method("c", "r2", 50, 4, 3),
            method("d", "r2", 51, 1, 0),
        ];
        let stats = compute(&methods, SizeTiers::default(), 10);

        let small = stats.tier(Tier::Small).unwrap();
        assert_eq!((small.count, small.mean_fix_ratio), (1, Some(0.5)));
        let medium = stats.tier(Tier::Medium).unwrap();
        assert_eq!((medium.count, medium.mean_fix_ratio), (2, Some(0.5)));
        let large = stats.tier(Tier::Large).unwrap();
        assert_eq!((large.count, large.mean_fix_ratio), (1, Some(0.0)));
    }

    #[test]
    fn overall_figures() {
        let methods = vec![
            method("a", "r1", 4, 4, 1),
            method("b", "r1", 8, 2, 0),
            method("c", "r2", 30, 1, 1),
        ];
        let stats = compute(&methods, SizeTiers::default(), 10);
        assert_eq!(stats.total_methods, 3);
        assert_eq!(stats.total_repositories, 2);
        assert_eq!(stats.methods_with_fixes, 2);
        assert_eq!(stats.mean_size, 14.0);
        assert_eq!(stats.median_size, 8.0);
        assert_eq!(stats.median_fix_ratio, 0.25);
        assert_eq!(stats.tier(Tier::Large).unwrap().mean_fix_ratio, None);
    }

    #[test]
    fn even_median_averages_the_middle_pair() {
        let methods = vec![method("a", "r", 2, 1, 0), method("b", "r", 6, 1, 0)];
        assert_eq!(compute(&methods, SizeTiers::default(), 1).median_size, 4.0);
    }

    #[test]
    fn top_methods_are_stable_on_ties() {
        let methods = vec![
            method("first", "r", 5, 2, 1),
            method("best", "r", 5, 1, 1),
            method("second", "r", 5, 4, 2),
            method("low", "r", 5, 4, 0),
        ];
        let stats = compute(&methods, SizeTiers::default(), 3);
        let names: Vec<&str> = stats.top_methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["best", "first", "second"]);
    }

    #[test]
    fn per_repository_means_descend() {
        let methods = vec![
            method("a", "alpha", 5, 2, 0),
            method("b", "beta", 5, 2, 1),
            method("c", "beta", 5, 2, 2),
        ];
        let stats = compute(&methods, SizeTiers::default(), 10);
        let repos: Vec<(&str, f64)> = stats
            .per_repository
            .iter()
            .map(|r| (r.repository.as_str(), r.mean_fix_ratio))
            .collect();
        assert_eq!(repos, vec![("beta", 0.75), ("alpha", 0.0)]);
    }

    #[test]
    fn tiers_must_increase() {
        assert!(SizeTiers::new(50, 10).is_err());
        assert!(SizeTiers::new(10, 10).is_err());
        assert_eq!(SizeTiers::new(5, 20).unwrap().range(Tier::Medium), "6-20 lines");
    }
}
