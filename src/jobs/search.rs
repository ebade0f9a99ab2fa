use super::{CacheEntry, Job};
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid tag selector '{0}' (expected key=value)")]
    InvalidTag(String),

    #[error("at least one selector is required (--name or --tag)")]
    Empty,
}

/// Compile `pattern`, keeping the regex engine's message verbatim
///
/// # Errors
///
/// Returns `SelectorError::InvalidPattern` if `pattern` is not a valid regex
pub fn compile(pattern: &str) -> Result<Regex, SelectorError> {
    Regex::new(pattern).map_err(|e| SelectorError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Predicate over jobs, composable with AND / OR
#[derive(Debug, Clone)]
pub enum Selector {
    /// Case-sensitive, unanchored regex on the job name
    Name(Regex),
    /// Exact tag key and value
    Tag { key: String, value: String },
    All(Vec<Selector>),
    Any(Vec<Selector>),
}

impl Selector {
    /// Build a selector from CLI-style criteria
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern does not compile, a tag is not
    /// `key=value`, or no criteria were given
    pub fn build<S: AsRef<str>>(
        name: Option<&str>,
        tags: &[S],
        use_or: bool,
    ) -> Result<Self, SelectorError> {
        let mut selectors = Vec::new();

        if let Some(pattern) = name {
            selectors.push(Self::Name(compile(pattern)?));
        }

        for tag in tags {
            let tag = tag.as_ref();
            let Some((key, value)) = tag.split_once('=') else {
                return Err(SelectorError::InvalidTag(tag.to_string()));
            };
            if key.is_empty() {
                return Err(SelectorError::InvalidTag(tag.to_string()));
            }
            selectors.push(Self::Tag {
                key: key.to_string(),
                value: value.to_string(),
            });
        }

        match selectors.len() {
            0 => Err(SelectorError::Empty),
            1 => Ok(selectors.remove(0)),
            _ if use_or => Ok(Self::Any(selectors)),
            _ => Ok(Self::All(selectors)),
        }
    }

    #[must_use]
    pub fn matches(&self, job: &Job) -> bool {
        match self {
            Self::Name(rx) => rx.is_match(&job.name),
            Self::Tag { key, value } => job.tags.get(key) == Some(value),
            Self::All(selectors) => selectors.iter().all(|s| s.matches(job)),
            Self::Any(selectors) => selectors.iter().any(|s| s.matches(job)),
        }
    }

    /// Jobs in `entry` matching this selector, in listing order
    #[must_use]
    pub fn select(&self, entry: &CacheEntry) -> Vec<Job> {
        entry.jobs.iter().filter(|job| self.matches(job)).cloned().collect()
    }
}

/// Jobs in `entry` whose name matches `pattern`, in listing order
///
/// # Errors
///
/// Returns `SelectorError::InvalidPattern` if `pattern` does not compile
pub fn search(pattern: &str, entry: &CacheEntry) -> Result<Vec<Job>, SelectorError> {
    Ok(Selector::Name(compile(pattern)?).select(entry))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::{jobs::JobCache, testing::FakeGateway};
    use std::{sync::Arc, time::Duration};

    async fn entry(jobs: Vec<Job>) -> Arc<CacheEntry> {
        let fake = Arc::new(FakeGateway::new().with_jobs(jobs));
        JobCache::new(fake, Duration::from_secs(60))
            .get(false)
            .await
            .unwrap()
    }

    fn listing() -> Vec<Job> {
        vec![
            Job::new(1, "python-etl").with_tag("team", "data"),
            Job::new(2, "java-batch").with_tag("team", "core"),
            Job::new(3, "python-report").with_tag("team", "core"),
        ]
    }

    #[tokio::test]
    async fn test_search_python_scenario() {
        let entry = entry(vec![Job::new(1, "python-etl"), Job::new(2, "java-batch")]).await;
        let found = search("python.*", &entry).unwrap();
        assert_eq!(found, vec![Job::new(1, "python-etl")]);
    }

    #[tokio::test]
    async fn test_search_preserves_listing_order() {
        let entry = entry(listing()).await;
        let found = search("python|java", &entry).unwrap();
        let ids: Vec<_> = found.iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_search_is_case_sensitive() {
        let entry = entry(listing()).await;
        assert!(search("PYTHON", &entry).unwrap().is_empty());
        assert_eq!(search("(?i)PYTHON", &entry).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_search_empty_result_is_ok() {
        let entry = entry(listing()).await;
        assert!(search("^rust", &entry).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_invalid_pattern() {
        let entry = entry(listing()).await;
        let err = search("python(", &entry).unwrap_err();
        match err {
            SelectorError::InvalidPattern { pattern, reason } => {
                assert_eq!(pattern, "python(");
                assert!(!reason.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_selector_and_tags() {
        let entry = entry(listing()).await;
        let selector = Selector::build(Some("python"), &["team=core"], false).unwrap();
        let ids: Vec<_> = selector.select(&entry).iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[tokio::test]
    async fn test_selector_or_tags() {
        let entry = entry(listing()).await;
        let selector = Selector::build(Some("etl"), &["team=core"], true).unwrap();
        let ids: Vec<_> = selector.select(&entry).iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_selector_requires_criteria() {
        let empty: [&str; 0] = [];
        assert_eq!(
            Selector::build(None, &empty, false).unwrap_err(),
            SelectorError::Empty
        );
    }

    #[test]
    fn test_selector_rejects_malformed_tag() {
        for bad in ["team", "=core"] {
            assert_eq!(
                Selector::build(None, &[bad], false).unwrap_err(),
                SelectorError::InvalidTag(bad.to_string())
            );
        }
    }

    #[test]
    fn test_selector_tag_value_may_contain_equals() {
        let selector = Selector::build(None, &["expr=a=b"], false).unwrap();
        let job = Job::new(9, "x").with_tag("expr", "a=b");
        assert!(selector.matches(&job));
    }
}
