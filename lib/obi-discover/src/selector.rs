use std::collections::HashMap;

use tracing::trace;

use crate::{Criterion, DiscoveryConfiguration, ProcessInfo, StringMatcher};

impl Criterion {
    /// Returns `true` if the process satisfies every constraint this criterion sets.
    pub fn matches(&self, process: &ProcessInfo) -> bool {
        if let Some(ports) = self.open_ports() {
            if !ports.contains_any(process.open_ports()) {
                return false;
            }
        }

        if let Some(matcher) = self.exe_path() {
            if !matcher.is_match(process.exe_path()) {
                return false;
            }
        }

        if let Some(matcher) = self.exe_path_regexp() {
            if !matcher.is_match(process.exe_path()) {
                return false;
            }
        }

        if let Some(namespace) = self.k8s_namespace() {
            if process.k8s_namespace() != Some(namespace) {
                return false;
            }
        }

        if self.containers_only() && process.container_id().is_none() {
            return false;
        }

        all_entries_match(self.metadata(), |key| process.metadata(key))
            && all_entries_match(self.pod_labels(), |key| process.pod_label(key))
            && all_entries_match(self.pod_annotations(), |key| process.pod_annotation(key))
    }
}

fn all_entries_match<'a, F>(matchers: &HashMap<String, StringMatcher>, lookup: F) -> bool
where
    F: Fn(&str) -> Option<&'a str>,
{
    matchers
        .iter()
        .all(|(key, matcher)| lookup(key).is_some_and(|value| matcher.is_match(value)))
}

/// A process paired with the criteria that selected it.
///
/// Criteria are kept in configuration order, so later entries take precedence when their settings conflict.
#[derive(Clone, Debug)]
pub struct ProcessMatch<'a> {
    /// The selected process.
    pub process: &'a ProcessInfo,

    /// The criteria that matched the process, in configuration order.
    pub criteria: Vec<&'a Criterion>,
}

impl<'a> ProcessMatch<'a> {
    /// Creates a new `ProcessMatch`.
    pub fn new(process: &'a ProcessInfo, criteria: Vec<&'a Criterion>) -> Self {
        Self { process, criteria }
    }
}

/// Evaluates processes against the configured instrumentation criteria.
///
/// A process is selected when at least one instrumentation criterion matches it and no exclusion criterion does.
/// Evaluation has no side effects, and can be repeated on every discovery pass.
#[derive(Clone, Debug, Default)]
pub struct CriteriaEvaluator {
    instrument: Vec<Criterion>,
    exclude: Vec<Criterion>,
}

impl CriteriaEvaluator {
    /// Creates a new `CriteriaEvaluator` from the given instrumentation and exclusion criteria.
    pub fn new(instrument: Vec<Criterion>, exclude: Vec<Criterion>) -> Self {
        Self { instrument, exclude }
    }

    /// Creates a new `CriteriaEvaluator` from the given configuration.
    pub fn from_configuration(config: &DiscoveryConfiguration) -> Self {
        Self::new(config.instrument().to_vec(), config.exclude_instrument().to_vec())
    }

    /// Returns the instrumentation criteria matching the process, in configuration order.
    pub fn matching_criteria(&self, process: &ProcessInfo) -> Vec<&Criterion> {
        self.instrument
            .iter()
            .filter(|criterion| criterion.matches(process))
            .collect()
    }

    /// Returns `true` if any exclusion criterion matches the process.
    pub fn is_excluded(&self, process: &ProcessInfo) -> bool {
        self.exclude.iter().any(|criterion| criterion.matches(process))
    }

    /// Evaluates the process.
    ///
    /// Returns `None` if the process is excluded, or if no instrumentation criterion matches it.
    pub fn evaluate<'a>(&'a self, process: &'a ProcessInfo) -> Option<ProcessMatch<'a>> {
        if self.is_excluded(process) {
            trace!(pid = process.pid(), exe_path = process.exe_path(), "Process excluded from instrumentation.");
            return None;
        }

        let criteria = self.matching_criteria(process);
        if criteria.is_empty() {
            return None;
        }

        trace!(
            pid = process.pid(),
            exe_path = process.exe_path(),
            criteria = criteria.len(),
            "Process selected for instrumentation."
        );
        Some(ProcessMatch::new(process, criteria))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn java_process() -> ProcessInfo {
        ProcessInfo::new(100, "/usr/bin/java")
            .with_open_ports([8080, 9090])
            .with_container_id("c0ffee")
            .with_k8s_namespace("prod")
            .with_metadata("k8s_deployment_name", "checkout-7d9f")
            .with_pod_label("app", "checkout")
            .with_pod_annotation("team", "payments")
    }

    #[test]
    fn empty_criterion_matches_everything() {
        assert!(Criterion::new().matches(&java_process()));
        assert!(Criterion::new().matches(&ProcessInfo::default()));
    }

    #[test]
    fn ports() {
        let process = java_process();
        assert!(Criterion::new()
            .with_open_ports("8000-8999".parse().unwrap())
            .matches(&process));
        assert!(!Criterion::new().with_open_ports("443".parse().unwrap()).matches(&process));
        assert!(!Criterion::new()
            .with_open_ports("8080".parse().unwrap())
            .matches(&ProcessInfo::new(1, "/usr/bin/java")));
    }

    #[test]
    fn executable_path() {
        let process = java_process();
        assert!(Criterion::new()
            .with_exe_path(StringMatcher::glob("*/java").unwrap())
            .matches(&process));
        assert!(!Criterion::new()
            .with_exe_path(StringMatcher::glob("*/node").unwrap())
            .matches(&process));
        assert!(Criterion::new()
            .with_exe_path_regexp(StringMatcher::regex("ja.a$").unwrap())
            .matches(&process));
        assert!(!Criterion::new()
            .with_exe_path_regexp(StringMatcher::regex("^/opt/").unwrap())
            .matches(&process));
    }

    #[test]
    fn namespace_and_containers() {
        let process = java_process();
        assert!(Criterion::new().with_k8s_namespace("prod").matches(&process));
        assert!(!Criterion::new().with_k8s_namespace("staging").matches(&process));
        assert!(!Criterion::new()
            .with_k8s_namespace("prod")
            .matches(&ProcessInfo::new(1, "/usr/bin/java")));

        assert!(Criterion::new().with_containers_only(true).matches(&process));
        assert!(!Criterion::new()
            .with_containers_only(true)
            .matches(&ProcessInfo::new(1, "/usr/bin/java")));
    }

    #[test]
    fn metadata_labels_and_annotations() {
        let process = java_process();
        assert!(Criterion::new()
            .with_metadata("k8s_deployment_name", StringMatcher::glob("checkout-*").unwrap())
            .with_pod_label("app", StringMatcher::exact("checkout"))
            .with_pod_annotation("team", StringMatcher::glob("pay*").unwrap())
            .matches(&process));

        assert!(!Criterion::new()
            .with_pod_label("app", StringMatcher::exact("frontend"))
            .matches(&process));
        assert!(!Criterion::new()
            .with_pod_label("tier", StringMatcher::glob("*").unwrap())
            .matches(&process));
        assert!(!Criterion::new()
            .with_metadata("k8s_deployment_name", StringMatcher::glob("checkout-*").unwrap())
            .with_pod_annotation("team", StringMatcher::exact("search"))
            .matches(&process));
    }

    #[test]
    fn all_constraints_must_hold() {
        let criterion = Criterion::new()
            .with_exe_path(StringMatcher::glob("*/java").unwrap())
            .with_open_ports("443".parse().unwrap());
        assert!(!criterion.matches(&java_process()));
    }

    #[test]
    fn matching_criteria_preserves_order() {
        let evaluator = CriteriaEvaluator::new(
            vec![
                Criterion::new().with_name("catch-all"),
                Criterion::new()
                    .with_name("node")
                    .with_exe_path(StringMatcher::glob("*/node").unwrap()),
                Criterion::new()
                    .with_name("java")
                    .with_exe_path(StringMatcher::glob("*/java").unwrap()),
            ],
            Vec::new(),
        );

        let process = java_process();
        let names = evaluator
            .matching_criteria(&process)
            .into_iter()
            .map(Criterion::name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["catch-all", "java"]);

        let process_match = evaluator.evaluate(&process).unwrap();
        assert_eq!(process_match.process, &process);
        assert_eq!(process_match.criteria.len(), 2);
    }

    #[test]
    fn exclusions_win() {
        let evaluator = CriteriaEvaluator::new(
            vec![Criterion::new()],
            vec![Criterion::new().with_exe_path(StringMatcher::glob("*/java").unwrap())],
        );

        assert!(evaluator.is_excluded(&java_process()));
        assert!(evaluator.evaluate(&java_process()).is_none());
        assert!(evaluator.evaluate(&ProcessInfo::new(2, "/usr/bin/node")).is_some());
    }

    #[test]
    fn unmatched_process_is_not_selected() {
        let evaluator = CriteriaEvaluator::new(
            vec![Criterion::new().with_exe_path(StringMatcher::glob("*/node").unwrap())],
            Vec::new(),
        );
        assert!(evaluator.evaluate(&java_process()).is_none());
        assert!(CriteriaEvaluator::default().evaluate(&java_process()).is_none());
    }

    proptest! {
        #[test]
        fn property_test_matching_is_repeatable(
            ports in proptest::collection::vec(any::<u16>(), 0..4),
            exe in "/[a-z]{1,6}/[a-z]{1,6}",
            pattern in "\\*?[a-z]{1,4}\\*?",
        ) {
            let process = ProcessInfo::new(1, exe).with_open_ports(ports);
            let evaluator = CriteriaEvaluator::new(
                vec![
                    Criterion::new().with_exe_path(StringMatcher::glob(&pattern).unwrap()),
                    Criterion::new().with_open_ports("1-1024".parse().unwrap()),
                ],
                Vec::new(),
            );

            let first = evaluator.matching_criteria(&process);
            let second = evaluator.matching_criteria(&process);
            prop_assert_eq!(first, second);
        }
    }
}
