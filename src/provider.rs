//! Graph inference providers and the retry policy around them.
//!
//! A provider turns a free-text script into a [`GraphDocument`]. Providers are
//! async and may fail transiently (rate limiting) or permanently. Results are
//! validated before they are handed to the layout step.

use crate::constants::{INITIAL_BACKOFF, MAX_PROVIDER_ATTEMPTS};
use crate::types::{Diagram, Edge, GraphDocument, IngestError, Node, NodeKind};
use futures::future::BoxFuture;
use std::time::Duration;
use thiserror::Error;

/// Failures reported by a provider or by the retry loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The provider asked us to slow down; retried with backoff
    #[error("rate limited: {0}")]
    RateLimited(String),
    /// Any other provider failure; surfaced immediately
    #[error("{0}")]
    Failed(String),
    /// The payload failed validation; never retried
    #[error(transparent)]
    Invalid(#[from] IngestError),
    /// Nothing to infer from
    #[error("the script is empty")]
    EmptyScript,
}

impl ProviderError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::RateLimited(_))
    }

    /// Message for the user, with nested JSON error payloads unwrapped.
    pub fn user_message(&self) -> String {
        match self {
            ProviderError::RateLimited(msg) | ProviderError::Failed(msg) => {
                unwrap_error_message(msg)
            }
            other => other.to_string(),
        }
    }
}

/// Extracts `error.message` from a (possibly prefixed) JSON error payload.
/// Anything that is not such a payload is returned unchanged.
pub fn unwrap_error_message(raw: &str) -> String {
    let candidate = raw.find('{').map(|i| &raw[i..]).unwrap_or(raw);
    serde_json::from_str::<serde_json::Value>(candidate)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| raw.to_string())
}

/// Turns a script into a graph document.
pub trait GraphProvider: Send + Sync {
    /// Short name shown in logs.
    fn name(&self) -> &'static str;

    /// Infers a graph from `script`.
    fn infer<'a>(&'a self, script: &'a str) -> BoxFuture<'a, Result<GraphDocument, ProviderError>>;
}

/// Attempt limit and backoff of [`infer_with_retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry; doubles after every retry
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_PROVIDER_ATTEMPTS,
            initial_backoff: INITIAL_BACKOFF,
        }
    }
}

/// Calls the provider, retrying rate-limit failures with exponential backoff, and
/// validates the returned diagram. Other failures, and the last rate-limit failure
/// once attempts are exhausted, are returned as they are.
pub async fn infer_with_retry(
    provider: &dyn GraphProvider,
    script: &str,
    policy: RetryPolicy,
) -> Result<GraphDocument, ProviderError> {
    if script.trim().is_empty() {
        return Err(ProviderError::EmptyScript);
    }
    let mut delay = policy.initial_backoff;
    let mut attempt = 1;
    loop {
        match provider.infer(script).await {
            Ok(doc) => {
                doc.flowchart.validate()?;
                log::info!(
                    "{} inferred {} nodes, {} edges (attempt {})",
                    provider.name(),
                    doc.flowchart.nodes.len(),
                    doc.flowchart.edges.len(),
                    attempt
                );
                return Ok(doc);
            }
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                log::warn!(
                    "{} attempt {}/{} failed: {}; retrying in {:?}",
                    provider.name(),
                    attempt,
                    policy.max_attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(e) => {
                log::error!("{} failed: {}", provider.name(), e);
                return Err(e);
            }
        }
    }
}

/// Identifies one inference request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestTag(u64);

/// Hands out request tags and remembers the latest one.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: u64,
}

impl RequestTracker {
    /// Issues a new tag, superseding every earlier one.
    pub fn next_tag(&mut self) -> RequestTag {
        self.latest += 1;
        RequestTag(self.latest)
    }

    /// Whether a response carrying `tag` should still be applied.
    pub fn is_current(&self, tag: RequestTag) -> bool {
        tag.0 == self.latest
    }
}

/// Treats the script itself as a JSON graph document.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonProvider;

impl GraphProvider for JsonProvider {
    fn name(&self) -> &'static str {
        "json"
    }

    fn infer<'a>(&'a self, script: &'a str) -> BoxFuture<'a, Result<GraphDocument, ProviderError>> {
        Box::pin(async move { Ok(GraphDocument::from_json(script)?) })
    }
}

/// Offline heuristic provider.
///
/// Accepts a JSON document as-is. Anything else is read as a sequence of steps,
/// separated by newlines, `;` or the word "then", and becomes a linear flow from a
/// start node to an end node. A step ending in `?` becomes a decision whose "yes"
/// edge continues the flow and whose "no" edge jumps to the end.
#[derive(Debug, Clone, Copy)]
pub struct OutlineProvider {
    /// Labels longer than this are shortened; the full text becomes the description
    pub max_label_chars: usize,
}

impl Default for OutlineProvider {
    fn default() -> Self {
        Self { max_label_chars: 40 }
    }
}

impl GraphProvider for OutlineProvider {
    fn name(&self) -> &'static str {
        "outline"
    }

    fn infer<'a>(&'a self, script: &'a str) -> BoxFuture<'a, Result<GraphDocument, ProviderError>> {
        Box::pin(async move {
            if script.trim_start().starts_with('{') {
                return Ok(GraphDocument::from_json(script)?);
            }
            self.outline(script)
        })
    }
}

impl OutlineProvider {
    /// Builds the flow for a plain-text script.
    pub fn outline(&self, script: &str) -> Result<GraphDocument, ProviderError> {
        let functions = function_names(script);
        let steps: Vec<String> = split_steps(script)
            .into_iter()
            .filter(|s| !is_declaration(s))
            .collect();
        if steps.is_empty() {
            return Err(ProviderError::EmptyScript);
        }

        let mut nodes = vec![Node::new("start", "Start", NodeKind::Start)];
        for (i, step) in steps.iter().enumerate() {
            let kind = if step.ends_with('?') {
                NodeKind::Decision
            } else {
                NodeKind::Process
            };
            let mut node = Node::new(format!("step{}", i + 1), self.shorten(step), kind);
            if node.label != *step {
                node.description = Some(step.clone());
            }
            nodes.push(node);
        }
        nodes.push(Node::new("end", "End", NodeKind::End));

        let mut edges = Vec::with_capacity(nodes.len());
        for pair in nodes.windows(2) {
            let (from, to) = (&pair[0], &pair[1]);
            let mut edge = Edge::new(from.id.clone(), to.id.clone());
            if from.kind == NodeKind::Decision {
                edge = edge.with_label("yes");
            }
            edges.push(edge);
            if from.kind == NodeKind::Decision && to.id != "end" {
                edges.push(Edge::new(from.id.clone(), "end").with_label("no"));
            }
        }

        Ok(GraphDocument {
            flowchart: Diagram { nodes, edges },
            functions,
        })
    }

    fn shorten(&self, step: &str) -> String {
        if step.chars().count() <= self.max_label_chars {
            return step.to_string();
        }
        let mut short: String = step.chars().take(self.max_label_chars.saturating_sub(1)).collect();
        short.push('…');
        short
    }
}

/// Splits a script into trimmed, non-empty steps.
fn split_steps(script: &str) -> Vec<String> {
    let mut steps = Vec::new();
    for fragment in script.split(['\n', ';']) {
        let mut current: Vec<&str> = Vec::new();
        for word in fragment.split_whitespace() {
            if word.eq_ignore_ascii_case("then") {
                push_step(&mut steps, &current);
                current.clear();
            } else {
                current.push(word);
            }
        }
        push_step(&mut steps, &current);
    }
    steps
}

fn push_step(steps: &mut Vec<String>, words: &[&str]) {
    let text = words.join(" ");
    let text = text.trim_end_matches([',', '.']).trim();
    if !text.is_empty() {
        steps.push(text.to_string());
    }
}

const DECLARATION_KEYWORDS: [&str; 3] = ["fn", "def", "function"];

fn is_declaration(step: &str) -> bool {
    step.split_whitespace()
        .next()
        .is_some_and(|w| DECLARATION_KEYWORDS.contains(&w))
}

/// Names declared with `fn`, `def` or `function`, in source order, without duplicates.
fn function_names(script: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut words = script.split_whitespace().peekable();
    while let Some(word) = words.next() {
        if !DECLARATION_KEYWORDS.contains(&word) {
            continue;
        }
        let Some(next) = words.peek() else {
            break;
        };
        let name: String = next
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn then_splits_into_linear_flow() {
        let doc = OutlineProvider::default()
            .infer("A happens then B happens")
            .await
            .unwrap();
        let labels: Vec<&str> = doc.flowchart.nodes.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["Start", "A happens", "B happens", "End"]);
        assert_eq!(doc.flowchart.edges.len(), 3);
        assert!(doc.flowchart.validate().is_ok());
    }

    #[test]
    fn question_becomes_decision() {
        let doc = OutlineProvider::default()
            .outline("Read input\nIs it valid?\nSave it")
            .unwrap();
        let check = doc.flowchart.node("step2").unwrap();
        assert_eq!(check.kind, NodeKind::Decision);
        let out: Vec<(&str, Option<&str>)> = doc
            .flowchart
            .edges
            .iter()
            .filter(|e| e.source == "step2")
            .map(|e| (e.target.as_str(), e.label.as_deref()))
            .collect();
        assert_eq!(out, vec![("step3", Some("yes")), ("end", Some("no"))]);
    }

    #[test]
    fn declarations_populate_functions() {
        let doc = OutlineProvider::default()
            .outline("fn load_user()\nLoad user; def save(x)\nSave user")
            .unwrap();
        assert_eq!(doc.functions, vec!["load_user", "save"]);
        assert_eq!(doc.flowchart.nodes.len(), 4);
    }

    #[test]
    fn long_steps_keep_full_text_as_description() {
        let provider = OutlineProvider { max_label_chars: 10 };
        let doc = provider.outline("Send the weekly report").unwrap();
        let step = doc.flowchart.node("step1").unwrap();
        assert_eq!(step.label.chars().count(), 10);
        assert_eq!(step.description.as_deref(), Some("Send the weekly report"));
    }

    #[tokio::test]
    async fn dangling_edge_is_rejected_without_retry() {
        let json = r#"{"flowchart":{"nodes":[{"id":"a","label":"A","type":"start"}],
            "edges":[{"source":"a","target":"ghost"}]},"functions":[]}"#;
        let err = infer_with_retry(&JsonProvider, json, RetryPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Invalid(IngestError::DanglingEdge { .. })
        ));
        assert!(!err.is_retryable());
    }

    struct Flaky {
        calls: AtomicU32,
        failures: u32,
    }

    impl GraphProvider for Flaky {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn infer<'a>(&'a self, script: &'a str) -> BoxFuture<'a, Result<GraphDocument, ProviderError>> {
            Box::pin(async move {
                let n = self.calls.fetch_add(1, Ordering::SeqCst);
                if n < self.failures {
                    return Err(ProviderError::RateLimited(
                        r#"429 {"error":{"message":"slow down"}}"#.into(),
                    ));
                }
                OutlineProvider::default().outline(script)
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_is_retried_with_doubling_backoff() {
        let provider = Flaky {
            calls: AtomicU32::new(0),
            failures: 2,
        };
        let started = tokio::time::Instant::now();
        let doc = infer_with_retry(&provider, "A then B", RetryPolicy::default())
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(6000));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert_eq!(doc.flowchart.nodes.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_surface_unwrapped_message() {
        let provider = Flaky {
            calls: AtomicU32::new(0),
            failures: 10,
        };
        let err = infer_with_retry(&provider, "A", RetryPolicy::default())
            .await
            .unwrap_err();
        assert_eq!(provider.calls.load(Ordering::SeqCst), MAX_PROVIDER_ATTEMPTS);
        assert_eq!(err.user_message(), "slow down");
    }

    #[test]
    fn plain_messages_are_left_alone() {
        assert_eq!(unwrap_error_message("boom"), "boom");
        assert_eq!(unwrap_error_message("{not json"), "{not json");
        assert_eq!(
            unwrap_error_message(r#"{"error":{"message":"quota exceeded","code":429}}"#),
            "quota exceeded"
        );
    }

    #[test]
    fn only_latest_tag_is_current() {
        let mut tracker = RequestTracker::default();
        let first = tracker.next_tag();
        let second = tracker.next_tag();
        assert!(!tracker.is_current(first));
        assert!(tracker.is_current(second));
    }
}
