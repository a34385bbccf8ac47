use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{ArgAction, CommandFactory, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use miette::{IntoDiagnostic, Result, WrapErr};

use fixscope_core::{AggregatedMethod, FixKeywords, FixscopeConfig, FixscopeError, KeywordSet, OutputFormat};
use fixscope_history::CodeShovelProvider;
use fixscope_pipeline::aggregate::{AggregateOptions, Aggregator, MethodFilter};
use fixscope_pipeline::store::{AggregationStore, JsonDirStore};
use fixscope_report::{chart, SizeTiers, Statistics, CHART_FILE, REPORT_FILE};
use fixscope_scan::walker::{discover_repositories, RepoEntry, SourceFilter};

const CONFIG_FILE: &str = ".fixscope.toml";

#[derive(Parser)]
#[command(
    name = "fixscope",
    version,
    about = "Correlate method size with defect-fixing changes",
    long_about = "fixscope traces the history of every method in a set of repositories with\n\
                   CodeShovel, counts the changes whose messages look like fixes, and reports\n\
                   how the fix ratio varies with method size.\n\n\
                   Examples:\n  \
                     fixscope fetch-repos                Clone the most-starred Java repositories\n  \
                     fixscope analyze                    Aggregate fix ratios for every repository\n  \
                     fixscope analyze --resume --jobs 4  Continue an interrupted run in parallel\n  \
                     fixscope report                     Write the report and chart\n  \
                     fixscope scan src/App.java          Show the methods found in one file\n  \
                     fixscope doctor                     Check setup and environment"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .fixscope.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable tables and summaries (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(long, short, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Command {
    /// Aggregate method histories for every repository
    #[command(long_about = "Aggregate method histories for every repository.\n\n\
        Scans each repository for methods, asks CodeShovel for each method's history,\n\
        and writes <results>/<repo>_fix_analysis.json. Repositories with an existing\n\
        document are skipped unless --force is given. With --resume, progress is\n\
        checkpointed in <results>/<repo>.catalog.json and an interrupted run picks up\n\
        where it stopped. The report and chart are written at the end.")]
    Analyze {
        /// Directory holding one checkout per repository
        #[arg(long)]
        repos_dir: Option<PathBuf>,
        /// Directory for aggregation documents and reports
        #[arg(long)]
        results_dir: Option<PathBuf>,
        /// Path to the CodeShovel jar
        #[arg(long)]
        codeshovel_jar: Option<PathBuf>,
        /// Java executable
        #[arg(long)]
        java: Option<String>,
        /// Concurrent CodeShovel processes per repository
        #[arg(long, short)]
        jobs: Option<usize>,
        /// Per-method timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Maximum repositories to analyze
        #[arg(long)]
        max_repos: Option<usize>,
        /// Maximum source files per repository
        #[arg(long)]
        max_files: Option<usize>,
        /// Maximum methods per repository
        #[arg(long)]
        max_methods: Option<usize>,
        /// Fix keyword preset
        #[arg(long)]
        keyword_set: Option<KeywordSet>,
        /// Comma-separated fix keywords, overriding the preset
        #[arg(long)]
        keywords: Option<String>,
        /// Recompute repositories that already have results
        #[arg(long)]
        force: bool,
        /// Checkpoint progress and continue interrupted runs
        #[arg(long)]
        resume: bool,
        /// Skip writing the report and chart
        #[arg(long)]
        no_report: bool,
    },
    /// Print the methods detected in source files
    Scan {
        /// Source files to scan
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Per-method quality metrics and authorship for one file
    #[command(long_about = "Per-method quality metrics and authorship for one file.\n\n\
        Reports code and comment lines, cyclomatic complexity, identifier lengths,\n\
        and the authors of each method, plus how concentrated the file's fix\n\
        commits are among their authors.")]
    Quality {
        /// Repository checkout
        repo: PathBuf,
        /// File path relative to the repository root
        file: String,
    },
    /// Summarize every aggregation document and write the report and chart
    Report {
        /// Directory holding aggregation documents
        #[arg(long)]
        results_dir: Option<PathBuf>,
        /// Number of methods in the top fix ratio list
        #[arg(long)]
        top: Option<usize>,
    },
    /// Find popular repositories on GitHub and clone them
    #[command(long_about = "Find popular repositories on GitHub and clone them.\n\n\
        Searches for the most-starred repositories of a language, writes their clone\n\
        URLs to the list file, and clones each into the repositories directory.\n\
        Checkouts that already exist are left alone. With --from-file the search is\n\
        skipped and the list file is read instead. Uses GITHUB_TOKEN when set.")]
    FetchRepos {
        /// Read clone URLs from the list file instead of searching
        #[arg(long)]
        from_file: bool,
        /// File with one clone URL per line
        #[arg(long)]
        list_file: Option<PathBuf>,
        /// Directory to clone into
        #[arg(long)]
        repos_dir: Option<PathBuf>,
        /// Repository language
        #[arg(long)]
        language: Option<String>,
        /// Minimum star count
        #[arg(long)]
        min_stars: Option<u32>,
        /// Number of repositories
        #[arg(long)]
        top: Option<usize>,
        /// GitHub token (default: GITHUB_TOKEN)
        #[arg(long)]
        github_token: Option<String>,
    },
    /// Create a default .fixscope.toml configuration file
    #[command(long_about = "Create a default .fixscope.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .fixscope.toml already exists.")]
    Init,
    /// Check your fixscope setup and environment
    #[command(long_about = "Check your fixscope setup and environment.\n\n\
        Runs diagnostics for the Java executable, the CodeShovel jar, the\n\
        repositories and results directories, the config file, and the GitHub\n\
        token. Use --format json for machine-readable output.")]
    Doctor,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

fn print_welcome(use_color: bool) {
    let version = env!("CARGO_PKG_VERSION");

    if use_color {
        println!("\x1b[1mfixscope\x1b[0m v{version}: method size vs fix changes\n");

        println!("Quick start:");
        println!("  \x1b[36mfixscope init\x1b[0m          Create a .fixscope.toml config file");
        println!("  \x1b[36mfixscope fetch-repos\x1b[0m   Clone popular repositories");
        println!("  \x1b[36mfixscope analyze\x1b[0m       Aggregate fix ratios per method\n");

        println!("All commands:");
        println!("  \x1b[32manalyze\x1b[0m      Trace method histories and aggregate fix ratios");
        println!("  \x1b[32mreport\x1b[0m       Statistics, Markdown report and chart");
        println!("  \x1b[32mscan\x1b[0m         Methods detected in source files");
        println!("  \x1b[32mquality\x1b[0m      Per-method quality metrics and authorship");
        println!("  \x1b[32mfetch-repos\x1b[0m  Search GitHub and clone repositories");
        println!("  \x1b[32mdoctor\x1b[0m       Check your setup and environment");
        println!("  \x1b[32minit\x1b[0m         Create default configuration\n");
    } else {
        println!("fixscope v{version}: method size vs fix changes\n");

        println!("Quick start:");
        println!("  fixscope init          Create a .fixscope.toml config file");
        println!("  fixscope fetch-repos   Clone popular repositories");
        println!("  fixscope analyze       Aggregate fix ratios per method\n");

        println!("All commands:");
        println!("  analyze      Trace method histories and aggregate fix ratios");
        println!("  report       Statistics, Markdown report and chart");
        println!("  scan         Methods detected in source files");
        println!("  quality      Per-method quality metrics and authorship");
        println!("  fetch-repos  Search GitHub and clone repositories");
        println!("  doctor       Check your setup and environment");
        println!("  init         Create default configuration\n");
    }

    println!("Run 'fixscope <command> --help' for details.");
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<FixscopeConfig> {
    let mut config = match path {
        Some(path) => FixscopeConfig::from_file(path)
            .wrap_err_with(|| format!("loading {}", path.display()))?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                FixscopeConfig::from_file(default_path)?
            } else {
                FixscopeConfig::default()
            }
        }
    };
    config.apply_env();
    Ok(config)
}

fn ensure_valid(config: &FixscopeConfig) -> Result<()> {
    let problems = config.validate();
    if problems.is_empty() {
        return Ok(());
    }
    Err(FixscopeError::Config(problems.join("; ")).into())
}

/// A spinner on a terminal; plain status lines otherwise.
struct Status {
    bar: Option<ProgressBar>,
}

impl Status {
    fn new() -> Result<Self> {
        if !std::io::stderr().is_terminal() {
            return Ok(Self { bar: None });
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})").into_diagnostic()?,
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Ok(Self { bar: Some(bar) })
    }

    fn message(&self, msg: String) {
        match &self.bar {
            Some(bar) => bar.set_message(msg),
            None => eprintln!("{msg}"),
        }
    }

    fn finish(self, msg: &str) {
        match self.bar {
            Some(bar) => bar.finish_with_message(msg.to_string()),
            None => eprintln!("{msg}"),
        }
    }
}

/// List the repositories to analyze, turning an empty or missing directory
/// into a setup error.
fn repositories(repos_dir: &Path, limit: Option<usize>) -> Result<Vec<RepoEntry>> {
    let hint = "run 'fixscope fetch-repos' or set [paths] repositories_dir";
    let mut repos = match discover_repositories(repos_dir) {
        Ok(repos) => repos,
        Err(FixscopeError::FileNotFound(path)) => {
            return Err(FixscopeError::setup(
                format!("repositories directory not found: {}", path.display()),
                hint,
            )
            .into());
        }
        Err(e) => return Err(e.into()),
    };
    if repos.is_empty() {
        return Err(FixscopeError::setup(
            format!("no git repositories found in {}", repos_dir.display()),
            hint,
        )
        .into());
    }
    if let Some(limit) = limit {
        repos.truncate(limit);
    }
    Ok(repos)
}

/// Compute statistics, write the Markdown report and chart into
/// `results_dir`, and print the statistics in `format`.
fn write_report(
    config: &FixscopeConfig,
    methods: &[AggregatedMethod],
    results_dir: &Path,
    format: OutputFormat,
) -> Result<Statistics> {
    let tiers = SizeTiers::from_config(&config.report)?;
    let stats = fixscope_report::compute(methods, tiers, config.report.top_k);
    let keywords = config.fix_keywords();

    std::fs::create_dir_all(results_dir).into_diagnostic()?;
    let markdown = stats.to_markdown(&keywords);
    let report_path = results_dir.join(REPORT_FILE);
    std::fs::write(&report_path, &markdown)
        .into_diagnostic()
        .wrap_err_with(|| format!("writing {}", report_path.display()))?;
    tracing::info!(path = %report_path.display(), "report written");

    let chart_path = results_dir.join(CHART_FILE);
    let charted = chart::write_chart(
        &chart_path,
        methods,
        &stats,
        config.report.chart_width,
        config.report.chart_height,
    )?;

    match format {
        OutputFormat::Json => println!("{}", stats.to_json()?),
        OutputFormat::Markdown => print!("{markdown}"),
        OutputFormat::Text => {
            print!("{stats}");
            println!("\nReport: {}", report_path.display());
            if charted {
                println!("Chart:  {}", chart_path.display());
            }
        }
    }
    Ok(stats)
}

#[derive(serde::Serialize)]
struct CheckResult {
    name: &'static str,
    status: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl CheckResult {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "pass",
            detail: detail.into(),
            hint: None,
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name,
            status: "fail",
            detail: detail.into(),
            hint: Some(hint.into()),
        }
    }

    fn info(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "info",
            detail: detail.into(),
            hint: None,
        }
    }

    fn symbol(&self) -> &'static str {
        match self.status {
            "pass" => "\u{2713}",
            "fail" => "\u{2717}",
            _ => "~",
        }
    }

    fn colored_symbol(&self) -> String {
        match self.status {
            "pass" => "\x1b[32m\u{2713}\x1b[0m".into(),
            "fail" => "\x1b[31m\u{2717}\x1b[0m".into(),
            _ => "\x1b[33m~\x1b[0m".into(),
        }
    }
}

fn run_doctor(
    config: &FixscopeConfig,
    config_path: Option<&Path>,
    format: OutputFormat,
    use_color: bool,
) -> Result<()> {
    let mut checks: Vec<CheckResult> = Vec::new();

    // 1. Java
    match which::which(&config.analysis.java) {
        Ok(path) => checks.push(CheckResult::pass("java", path.display().to_string())),
        Err(_) => checks.push(CheckResult::fail(
            "java",
            format!("{} not found", config.analysis.java),
            "install a JRE or set [analysis] java to its full path",
        )),
    }

    // 2. CodeShovel jar
    let jar = &config.paths.codeshovel_jar;
    if jar.is_file() {
        checks.push(CheckResult::pass("codeshovel_jar", jar.display().to_string()));
    } else {
        checks.push(CheckResult::fail(
            "codeshovel_jar",
            format!("{} not found", jar.display()),
            "download CodeShovel and set [paths] codeshovel_jar",
        ));
    }

    // 3. Repositories
    let repos_dir = &config.paths.repositories_dir;
    match discover_repositories(repos_dir) {
        Ok(repos) if !repos.is_empty() => checks.push(CheckResult::pass(
            "repositories",
            format!("{} git repositories in {}", repos.len(), repos_dir.display()),
        )),
        Ok(_) => checks.push(CheckResult::fail(
            "repositories",
            format!("no git repositories in {}", repos_dir.display()),
            "run 'fixscope fetch-repos' to clone some",
        )),
        Err(_) => checks.push(CheckResult::fail(
            "repositories",
            format!("{} not found", repos_dir.display()),
            "run 'fixscope fetch-repos' or set [paths] repositories_dir",
        )),
    }

    // 4. Results
    let results_dir = &config.paths.results_dir;
    if results_dir.is_dir() {
        let documents = JsonDirStore::new(results_dir)
            .load_all()
            .map(|methods| methods.len())
            .unwrap_or(0);
        checks.push(CheckResult::info(
            "results",
            format!("{} ({documents} aggregated methods)", results_dir.display()),
        ));
    } else {
        checks.push(CheckResult::info(
            "results",
            format!("{} will be created", results_dir.display()),
        ));
    }

    // 5. Config file
    let path = config_path.unwrap_or(Path::new(CONFIG_FILE));
    let problems = config.validate();
    if !path.exists() {
        checks.push(CheckResult::info("config_file", format!("{} not found, using defaults", path.display())));
    } else if problems.is_empty() {
        checks.push(CheckResult::pass("config_file", format!("{} is valid", path.display())));
    }
    if !problems.is_empty() {
        checks.push(CheckResult::fail(
            "config_values",
            problems.join("; "),
            "fix the listed values in the config file",
        ));
    }
    checks.push(CheckResult::info(
        "fix_keywords",
        config.fix_keywords().words().join(", "),
    ));

    // 6. GitHub token
    if std::env::var("GITHUB_TOKEN").is_ok() {
        checks.push(CheckResult::pass("github_token", "GITHUB_TOKEN set"));
    } else {
        checks.push(CheckResult::info(
            "github_token",
            "GITHUB_TOKEN not set (fetch-repos searches anonymously)",
        ));
    }

    // Output
    let version = env!("CARGO_PKG_VERSION");
    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "version": version,
                "checks": checks,
            });
            println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
        }
        _ => {
            println!("fixscope v{version}: environment check\n");

            for check in &checks {
                let sym = if use_color {
                    check.colored_symbol()
                } else {
                    check.symbol().to_string()
                };
                let label = check.name.replace('_', " ");
                println!("  {sym} {label:<16} {}", check.detail);
                if let Some(hint) = &check.hint {
                    println!("    hint: {hint}");
                }
            }

            let passed = checks.iter().filter(|c| c.status == "pass").count();
            let failed = checks.iter().filter(|c| c.status == "fail").count();
            let info = checks.iter().filter(|c| c.status == "info").count();
            println!("\n{passed} checks passed, {failed} failed, {info} info");
        }
    }

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# fixscope configuration
# CLI flags override FIXSCOPE_* environment variables, which override this file.

[paths]
# repositories_dir = "./repos"
# results_dir = "./fix_analysis_results"
# codeshovel_jar = "codeshovel.jar"

[analysis]
# keyword_set = "default"          # or "strict"
# keywords = ["fix", "bug", "crash"]
# timeout_secs = 300
# repo_limit = 5
# file_limit = 50
# method_limit = 1000
# jobs = 1
# java = "java"

[filters]
# extensions = ["java"]
# exclude_patterns = ["test", "Test", "target", "build"]
# min_size = 1
# max_size = 500
# min_commits = 1

[report]
# small_max = 10
# medium_max = 50
# top_k = 10
# chart_width = 1200
# chart_height = 900

[sources]
# language = "Java"
# min_stars = 5000
# top_n = 20
# list_file = "repos/top_repos.txt"
"#;

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    match cli.command {
        None => {
            print_welcome(use_color);
            return Ok(());
        }
        Some(Command::Analyze {
            repos_dir,
            results_dir,
            codeshovel_jar,
            java,
            jobs,
            timeout,
            max_repos,
            max_files,
            max_methods,
            keyword_set,
            keywords,
            force,
            resume,
            no_report,
        }) => {
            if let Some(dir) = repos_dir {
                config.paths.repositories_dir = dir;
            }
            if let Some(dir) = results_dir {
                config.paths.results_dir = dir;
            }
            if let Some(jar) = codeshovel_jar {
                config.paths.codeshovel_jar = jar;
            }
            if let Some(java) = java {
                config.analysis.java = java;
            }
            if let Some(jobs) = jobs {
                config.analysis.jobs = jobs;
            }
            if let Some(secs) = timeout {
                config.analysis.timeout_secs = secs;
            }
            if max_repos.is_some() {
                config.analysis.repo_limit = max_repos;
            }
            if max_files.is_some() {
                config.analysis.file_limit = max_files;
            }
            if max_methods.is_some() {
                config.analysis.method_limit = max_methods;
            }
            if let Some(set) = keyword_set {
                config.analysis.keyword_set = set;
                config.analysis.keywords = None;
            }
            if let Some(list) = keywords {
                config.analysis.keywords =
                    Some(FixKeywords::from_list(&list).words().to_vec());
            }
            ensure_valid(&config)?;

            let provider = CodeShovelProvider::new(&config.paths.codeshovel_jar)
                .with_java(config.analysis.java.clone())
                .with_timeout(Duration::from_secs(config.analysis.timeout_secs));
            provider.verify()?;

            let repos = repositories(&config.paths.repositories_dir, config.analysis.repo_limit)?;
            let results_dir = config.paths.results_dir.clone();
            let options = AggregateOptions {
                jobs: config.analysis.jobs.max(1),
                file_limit: config.analysis.file_limit,
                method_limit: config.analysis.method_limit,
                force,
                methods: MethodFilter::from_config(&config.filters),
            };
            let aggregator = Aggregator::new(
                provider,
                JsonDirStore::new(&results_dir),
                config.fix_keywords(),
                SourceFilter::from_config(&config.filters),
                options,
            );

            let status = Status::new()?;
            let total = repos.len();
            let mut methods = Vec::new();
            let mut failed = 0usize;
            for (i, repo) in repos.iter().enumerate() {
                status.message(format!("Analyzing {} ({}/{total})", repo.name, i + 1));
                let outcome = if resume {
                    aggregator.resume_repository(repo, &results_dir).await
                } else {
                    aggregator.run_repository(repo).await
                };
                match outcome {
                    Ok(outcome) => {
                        tracing::info!(
                            repository = %outcome.repository,
                            methods = outcome.methods.len(),
                            resumed = outcome.resumed,
                            provider_calls = outcome.stats.provider_calls,
                            provider_failures = outcome.stats.provider_failures,
                            "repository done"
                        );
                        methods.extend(outcome.methods);
                    }
                    Err(e) => {
                        failed += 1;
                        tracing::warn!(repository = %repo.name, error = %e, "repository failed, skipping");
                    }
                }
            }
            status.finish(&format!(
                "Analyzed {} repositories: {} methods ({failed} failed)",
                total - failed,
                methods.len()
            ));

            if !no_report {
                write_report(&config, &methods, &results_dir, cli.format)?;
            }
        }
        Some(Command::Scan { ref files }) => {
            let paths: Vec<&Path> = files.iter().map(PathBuf::as_path).collect();
            let output = fixscope_scan::render_spans(&paths, cli.format)?;
            print!("{output}");
        }
        Some(Command::Quality { ref repo, ref file }) => {
            let report =
                fixscope_pipeline::quality::analyze_file(repo, file, &config.fix_keywords())?;
            match cli.format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
                }
                OutputFormat::Markdown => {
                    println!("# Quality: `{}`\n", report.file_path);
                    println!(
                        "**Fix commits:** {}, **author concentration:** {:.2}\n",
                        report.fix_authors.len(),
                        report.author_concentration
                    );
                    println!("| Method | Lines | Code | Comment ratio | Complexity | Identifiers | Authors |");
                    println!("|--------|-------|-----:|--------------:|-----------:|------------:|---------|");
                    for m in &report.methods {
                        println!(
                            "| `{}` | {}-{} | {} | {:.2} | {} | {} | {} |",
                            m.name,
                            m.start_line,
                            m.end_line,
                            m.metrics.lines.code_lines,
                            m.metrics.lines.comment_ratio,
                            m.metrics.cyclomatic_complexity,
                            m.metrics.identifiers.total_count,
                            m.authors.join(", ")
                        );
                    }
                }
                OutputFormat::Text => print!("{report}"),
            }
        }
        Some(Command::Report { results_dir, top }) => {
            if let Some(dir) = results_dir {
                config.paths.results_dir = dir;
            }
            if let Some(top) = top {
                config.report.top_k = top;
            }
            ensure_valid(&config)?;
            let results_dir = config.paths.results_dir.clone();
            let methods = JsonDirStore::new(&results_dir).load_all()?;
            if methods.is_empty() {
                tracing::warn!(dir = %results_dir.display(), "no aggregated methods found");
            }
            write_report(&config, &methods, &results_dir, cli.format)?;
        }
        Some(Command::FetchRepos {
            from_file,
            list_file,
            repos_dir,
            language,
            min_stars,
            top,
            github_token,
        }) => {
            let sources = &mut config.sources;
            if let Some(path) = list_file {
                sources.list_file = path;
            }
            if let Some(language) = language {
                sources.language = language;
            }
            if let Some(stars) = min_stars {
                sources.min_stars = stars;
            }
            if let Some(top) = top {
                sources.top_n = top;
            }
            if let Some(dir) = repos_dir {
                config.paths.repositories_dir = dir;
            }

            let list_path = config.sources.list_file.clone();
            let urls = if from_file {
                fixscope_pipeline::sources::read_list(&list_path)?
            } else {
                let status = Status::new()?;
                status.message(format!(
                    "Searching GitHub for {} repositories",
                    config.sources.language
                ));
                let search = fixscope_pipeline::sources::GitHubSearch::new(github_token.as_deref())?;
                let urls = search
                    .top_repositories(
                        &config.sources.language,
                        config.sources.min_stars,
                        config.sources.top_n,
                    )
                    .await?;
                fixscope_pipeline::sources::write_list(&list_path, &urls)?;
                status.finish(&format!(
                    "Found {} repositories, list saved to {}",
                    urls.len(),
                    list_path.display()
                ));
                urls
            };

            let repos_dir = config.paths.repositories_dir.clone();
            let status = Status::new()?;
            status.message(format!("Cloning {} repositories", urls.len()));
            let summary = tokio::task::spawn_blocking(move || {
                fixscope_pipeline::sources::clone_all(&urls, &repos_dir)
            })
            .await
            .into_diagnostic()??;
            status.finish(&format!(
                "Cloned {}, skipped {} existing, {} failed",
                summary.cloned.len(),
                summary.skipped.len(),
                summary.failed.len()
            ));
            for name in &summary.failed {
                eprintln!("  failed: {name}");
            }
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Some(Command::Doctor) => {
            run_doctor(&config, cli.config.as_deref(), cli.format, use_color)?;
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "fixscope", &mut std::io::stdout());
        }
    }

    Ok(())
}
