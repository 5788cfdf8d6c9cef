use console::style;
use std::fmt::Write;

use crate::sweep::SweepReport;
use crate::ui::icons::{CROSS, FOLDER, KEY};

/// Human-readable aggregate report, one block per verified repository
/// followed by the failures.
pub fn render_report(report: &SweepReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", style("═".repeat(70)).cyan());
    let _ = writeln!(
        out,
        "{}",
        style(format!(
            "Sweep report: {} repositories, {} finding(s)",
            report.len(),
            report.total_findings()
        ))
        .bold()
    );
    let _ = writeln!(out, "{}", style("═".repeat(70)).cyan());

    for (repo, findings) in report.findings() {
        let _ = writeln!(out, "{}{}", FOLDER, style(repo).bold());
        for (env, lines) in findings.iter() {
            if lines.is_empty() {
                let _ = writeln!(out, "    {}: {}", env, style("none").dim());
                continue;
            }
            let _ = writeln!(out, "    {}: {}", env, lines.len());
            for line in lines {
                let _ = writeln!(out, "      {}{}", KEY, line);
            }
        }
    }

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", style("Failed repositories").red().bold());
        for (repo, kind, message) in failures {
            let _ = writeln!(out, "  {}{} [{}] {}", CROSS, repo, kind, message);
        }
    }

    out
}
