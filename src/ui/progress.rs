use crate::errors::SweepError;
use crate::github::Repository;
use crate::logs::FindingSet;
use crate::sweep::{SweepProgress, SweepReport};
use crate::ui::icons::{CHECK, CROSS, FOLDER, KEY, SEARCH, SPARKLE};
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

/// Terminal progress for a sweep, rendered via `indicatif`.
///
/// Two bars are stacked:
/// - Repository bar, counting finished repositories
/// - Spinner, naming the repository currently being orchestrated
///
/// Per-repository outcomes are printed above the bars as they happen.
pub struct SweepUI {
    multi: MultiProgress,
    repo_bar: ProgressBar,
    spinner: ProgressBar,
    verbose: bool,
}

impl SweepUI {
    pub fn new(verbose: bool) -> Self {
        let multi = MultiProgress::new();

        let repo_style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");

        let repo_bar = multi.add(ProgressBar::new(0));
        repo_bar.set_style(repo_style);
        repo_bar.set_prefix("Repos");

        let spinner_style = ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {msg}")
            .expect("progress bar template is a valid static string");

        let spinner = multi.add(ProgressBar::new_spinner());
        spinner.set_style(spinner_style);
        spinner.set_prefix("  Run");

        Self {
            multi,
            repo_bar,
            spinner,
            verbose,
        }
    }

    /// Print above the bars, falling back to `eprintln!` when the terminal is gone.
    fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.println(msg.as_ref()).is_err() {
            eprintln!("{}", msg.as_ref());
        }
    }
}

impl SweepProgress for SweepUI {
    fn repos_matched(&self, pattern: &str, repos: &[Repository]) {
        self.print_line(format!(
            "{}{} repositories match {}",
            SEARCH,
            repos.len(),
            style(pattern).cyan()
        ));
        for repo in repos {
            self.print_line(format!("  {}{}", FOLDER, repo.name));
        }
    }

    fn sweep_started(&self, total: usize) {
        self.repo_bar.set_length(total as u64);
        self.repo_bar.set_position(0);
    }

    fn repo_started(&self, repo: &str) {
        self.repo_bar.set_message(style(repo).yellow().to_string());
        self.spinner.set_message(format!(
            "{}orchestrating {}",
            SEARCH,
            style(repo).cyan()
        ));
        self.spinner.enable_steady_tick(Duration::from_millis(100));
    }

    fn repo_verified(&self, repo: &str, findings: &FindingSet) {
        self.repo_bar.inc(1);
        let total = findings.total();
        let summary = if total == 0 {
            style("clean".to_string()).green().to_string()
        } else {
            style(format!("{} finding(s)", total)).red().bold().to_string()
        };
        self.print_line(format!("{} {} {}", CHECK, style(repo).bold(), summary));
        if self.verbose {
            for (env, lines) in findings.iter() {
                for line in lines {
                    self.print_line(format!("    {}{} {}", KEY, style(env).dim(), line));
                }
            }
        }
    }

    fn repo_failed(&self, repo: &str, error: &SweepError) {
        self.repo_bar.inc(1);
        self.print_line(format!(
            "{} {} {}: {}",
            CROSS,
            style(repo).bold(),
            style(error.kind()).red(),
            error
        ));
    }

    fn sweep_finished(&self, report: &SweepReport) {
        self.spinner.finish_and_clear();
        self.repo_bar.finish_with_message(format!(
            "{}{} verified, {} failed",
            SPARKLE,
            report.findings().count(),
            report.failures().count()
        ));
    }
}
