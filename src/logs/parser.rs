//! Finding extraction from a run's log archive.
//!
//! The archive is staged into a private scratch directory together with the
//! per-environment members extracted from it. The directory is dropped when
//! parsing returns, whichever way it returns.

use regex::Regex;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

use super::types::{FindingSet, LogEnvironment};
use crate::errors::LogBundleError;

const ARCHIVE_NAME: &str = "logs.zip";

/// Parser for the zip bundle returned by the run-logs endpoint.
#[derive(Debug, Clone)]
pub struct LogBundleParser {
    pattern: Regex,
    scratch_root: Option<PathBuf>,
}

impl LogBundleParser {
    pub fn new(pattern: Regex) -> Self {
        Self {
            pattern,
            scratch_root: None,
        }
    }

    /// Stage scratch directories under `root` instead of the system temp dir.
    #[cfg(test)]
    pub(crate) fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// Extract findings for every log environment.
    ///
    /// Members missing from the archive yield an empty list. An archive that
    /// is not a readable zip fails with `LogBundleError::Corrupt`.
    pub fn parse(&self, archive: &[u8]) -> Result<FindingSet, LogBundleError> {
        let scratch = self.scratch_dir()?;
        let archive_path = scratch.path().join(ARCHIVE_NAME);
        fs::write(&archive_path, archive)?;

        let mut zip = ZipArchive::new(File::open(&archive_path)?)?;
        let mut findings = FindingSet::new();

        for env in LogEnvironment::ALL {
            let Some(extracted) = extract_member(&mut zip, env.member_name(), scratch.path())?
            else {
                debug!(environment = %env, "no log member for environment");
                continue;
            };
            let bytes = fs::read(&extracted)?;
            let matches = self.extract(&String::from_utf8_lossy(&bytes));
            debug!(environment = %env, count = matches.len(), "findings extracted");
            findings.insert(env, matches);
        }

        Ok(findings)
    }

    /// All matches of the finding signature in `text`, in order of appearance.
    pub fn extract(&self, text: &str) -> Vec<String> {
        self.pattern
            .find_iter(text)
            .map(|m| m.as_str().trim_end_matches('\r').to_string())
            .collect()
    }

    fn scratch_dir(&self) -> io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("keysweep-logs-");
        match &self.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
    }
}

/// Copy one member out of the archive; `None` when it is absent.
fn extract_member(
    zip: &mut ZipArchive<File>,
    name: &str,
    dir: &Path,
) -> Result<Option<PathBuf>, LogBundleError> {
    let mut entry = match zip.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let target = dir.join(name);
    let mut out = File::create(&target)?;
    // Read errors here mean a damaged member, not a local I/O problem.
    io::copy(&mut entry, &mut out).map_err(ZipError::Io)?;
    Ok(Some(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_FINDING_PATTERN;
    use crate::github::fake::log_archive;

    fn parser() -> LogBundleParser {
        LogBundleParser::new(Regex::new(DEFAULT_FINDING_PATTERN).unwrap())
    }

    const PR_LOG: &str = "2024-05-02T10:00:00.000Z Fetching secrets for pr\n\
        2024-05-02T10:00:01.000Z Is present in AWS secret prod/db-credentials\n\
        2024-05-02T10:00:02.000Z Not present in vault\n\
        2024-05-02T10:00:03.000Z Is present in AWS secret prod/api-gateway\r\n";

    #[test]
    fn test_parse_single_member_archive() {
        let archive = log_archive(&[("1_get-pr-secrets.txt", PR_LOG)]);
        let findings = parser().parse(&archive).unwrap();

        let expected = FindingSet::from_entries([(
            LogEnvironment::Pr,
            vec![
                "Is present in AWS secret prod/db-credentials",
                "Is present in AWS secret prod/api-gateway",
            ],
        )]);
        assert_eq!(findings, expected);
        assert!(findings.get(LogEnvironment::Qa).is_empty());
        assert!(findings.get(LogEnvironment::St).is_empty());
    }

    #[test]
    fn test_parse_is_idempotent() {
        let archive = log_archive(&[
            ("1_get-qa-secrets.txt", "Is present in AWS qa/one\n"),
            ("1_get-pr-secrets.txt", PR_LOG),
        ]);
        let p = parser();
        assert_eq!(p.parse(&archive).unwrap(), p.parse(&archive).unwrap());
    }

    #[test]
    fn test_parse_ignores_unrelated_members() {
        let archive = log_archive(&[
            ("0_checkout.txt", "Is present in AWS but not in a secrets step\n"),
            ("1_get-st-secrets.txt", "Is present in AWS st/key\n"),
        ]);
        let findings = parser().parse(&archive).unwrap();
        assert_eq!(findings.get(LogEnvironment::St), ["Is present in AWS st/key"]);
        assert_eq!(findings.total(), 1);
    }

    #[test]
    fn test_parse_empty_archive_is_clean() {
        let findings = parser().parse(&log_archive(&[])).unwrap();
        assert!(findings.is_clean());
    }

    #[test]
    fn test_parse_corrupt_archive() {
        let result = parser().parse(b"definitely not a zip file");
        assert!(matches!(result, Err(LogBundleError::Corrupt(_))));
    }

    #[test]
    fn test_parse_truncated_archive() {
        let archive = log_archive(&[("1_get-pr-secrets.txt", PR_LOG)]);
        let truncated = &archive[..archive.len() / 2];
        assert!(matches!(
            parser().parse(truncated),
            Err(LogBundleError::Corrupt(_))
        ));
    }

    #[test]
    fn test_scratch_directory_removed_on_success_and_failure() {
        let root = tempfile::tempdir().unwrap();
        let p = parser().with_scratch_root(root.path());

        p.parse(&log_archive(&[("1_get-qa-secrets.txt", "Is present in AWS x\n")]))
            .unwrap();
        assert!(p.parse(b"garbage").is_err());

        let leftovers: Vec<_> = fs::read_dir(root.path()).unwrap().collect();
        assert!(leftovers.is_empty(), "scratch dirs left behind: {:?}", leftovers);
    }

    #[test]
    fn test_extract_uses_configured_signature() {
        let broad = LogBundleParser::new(Regex::new("Is present in.*").unwrap());
        let text = "Is present in AWS a\nIs present in GCP b\n";
        assert_eq!(broad.extract(text).len(), 2);
        assert_eq!(parser().extract(text), vec!["Is present in AWS a".to_string()]);
    }
}
