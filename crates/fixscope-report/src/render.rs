//! Text, Markdown and JSON renderings of [`Statistics`].

use std::fmt;

use chrono::{DateTime, Utc};
use fixscope_core::{FixKeywords, FixscopeError};

use crate::stats::{Statistics, Tier};

fn percent(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}

fn tier_mean(stats: &Statistics, tier: Tier) -> String {
    stats
        .tier(tier)
        .and_then(|t| t.mean_fix_ratio)
        .map_or_else(|| "n/a".to_string(), percent)
}

fn tier_count(stats: &Statistics, tier: Tier) -> usize {
    stats.tier(tier).map_or(0, |t| t.count)
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fix Analysis")?;
        writeln!(f, "============")?;
        if self.is_empty() {
            return writeln!(f, "No methods were analyzed.");
        }

        writeln!(
            f,
            "Methods: {} in {} repositories ({} with fixes)",
            self.total_methods, self.total_repositories, self.methods_with_fixes
        )?;
        writeln!(
            f,
            "Size: mean {:.1}, median {:.1} lines",
            self.mean_size, self.median_size
        )?;
        writeln!(
            f,
            "Fix ratio: mean {}, median {}\n",
            percent(self.mean_fix_ratio),
            percent(self.median_fix_ratio)
        )?;

        writeln!(f, "{:<8} {:<16} {:>8} {:>10}", "Tier", "Size", "Methods", "Fix ratio")?;
        writeln!(f, "{}", "-".repeat(45))?;
        for tier in Tier::ALL {
            writeln!(
                f,
                "{:<8} {:<16} {:>8} {:>10}",
                tier.to_string(),
                self.tiers.range(tier),
                tier_count(self, tier),
                tier_mean(self, tier)
            )?;
        }

        if !self.top_methods.is_empty() {
            writeln!(f, "\nTop fix ratios:")?;
            for m in &self.top_methods {
                writeln!(
                    f,
                    "  {:>8}  {} ({}:{}:{}) {} fixes, {} lines",
                    percent(m.fix_ratio),
                    m.name,
                    m.repository,
                    m.file_path,
                    m.start_line,
                    m.fix_commit_count,
                    m.size_lines
                )?;
            }
        }

        if !self.per_repository.is_empty() {
            writeln!(f, "\nBy repository:")?;
            for repo in &self.per_repository {
                writeln!(
                    f,
                    "  {:>8}  {} ({} methods)",
                    percent(repo.mean_fix_ratio),
                    repo.repository,
                    repo.methods
                )?;
            }
        }
        Ok(())
    }
}

impl Statistics {
    /// Render the full Markdown report.
    ///
    /// # Examples
    ///
    /// ```
    /// use fixscope_core::FixKeywords;
    /// use fixscope_report::{compute, SizeTiers};
    ///
    /// let stats = compute(&[], SizeTiers::default(), 10);
    /// let md = stats.to_markdown(&FixKeywords::default());
    /// assert!(md.starts_with("# Method Size vs Fix Changes"));
    /// assert!(md.contains("No methods were analyzed"));
    /// ```
    pub fn to_markdown(&self, keywords: &FixKeywords) -> String {
        self.to_markdown_at(keywords, Utc::now())
    }

    /// [`Statistics::to_markdown`] with an explicit generation time.
    pub fn to_markdown_at(&self, keywords: &FixKeywords, generated: DateTime<Utc>) -> String {
        let mut out = String::new();
        out.push_str("# Method Size vs Fix Changes\n\n");

        out.push_str("## Summary\n\n");
        if self.is_empty() {
            out.push_str("No methods were analyzed.\n\n");
        } else {
            out.push_str(&format!("- **Methods analyzed**: {}\n", self.total_methods));
            out.push_str(&format!("- **Repositories**: {}\n", self.total_repositories));
            out.push_str(&format!("- **Methods with fix changes**: {}\n", self.methods_with_fixes));
            out.push_str(&format!(
                "- **Method size**: mean {:.1} lines, median {:.1} lines\n",
                self.mean_size, self.median_size
            ));
            out.push_str(&format!(
                "- **Fix ratio**: mean {}, median {}\n\n",
                percent(self.mean_fix_ratio),
                percent(self.median_fix_ratio)
            ));

            out.push_str("## By Size Tier\n\n");
            out.push_str("| Tier | Size | Methods | Mean fix ratio |\n");
            out.push_str("|------|------|---------|----------------|\n");
            for tier in Tier::ALL {
                out.push_str(&format!(
                    "| {} | {} | {} | {} |\n",
                    tier,
                    self.tiers.range(tier),
                    tier_count(self, tier),
                    tier_mean(self, tier)
                ));
            }
            out.push('\n');

            out.push_str(&format!("## Top {} Methods by Fix Ratio\n\n", self.top_methods.len()));
            for m in &self.top_methods {
                out.push_str(&format!(
                    "- **{}** ({}, `{}`:{}): {} ({} fixes, {} lines)\n",
                    m.name,
                    m.repository,
                    m.file_path,
                    m.start_line,
                    percent(m.fix_ratio),
                    m.fix_commit_count,
                    m.size_lines
                ));
            }
            out.push('\n');

            out.push_str("## Mean Fix Ratio by Repository\n\n");
            out.push_str("| Repository | Methods | Mean fix ratio |\n");
            out.push_str("|------------|---------|----------------|\n");
            for repo in &self.per_repository {
                out.push_str(&format!(
                    "| {} | {} | {} |\n",
                    repo.repository,
                    repo.methods,
                    percent(repo.mean_fix_ratio)
                ));
            }
            out.push('\n');
        }

        out.push_str("## Methodology\n\n");
        out.push_str("- Method histories were traced with CodeShovel.\n");
        out.push_str(&format!(
            "- A change counts as a fix when its message contains any of: {}.\n",
            keywords.words().join(", ")
        ));
        out.push_str(&format!(
            "- Size tiers: small ({}), medium ({}), large ({}).\n",
            self.tiers.range(Tier::Small),
            self.tiers.range(Tier::Medium),
            self.tiers.range(Tier::Large)
        ));
        out.push_str("- Only methods with at least one recorded change are included.\n\n");
        out.push_str(&format!(
            "---\n*Generated by fixscope on {}*\n",
            generated.format("%Y-%m-%d %H:%M UTC")
        ));
        out
    }

    /// Pretty JSON of the statistics.
    ///
    /// # Errors
    ///
    /// Returns [`FixscopeError::Serialization`] if encoding fails.
    pub fn to_json(&self) -> Result<String, FixscopeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
