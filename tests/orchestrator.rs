//! Integration tests for the model fallback chain.
//!
//! A scripted generator stands in for the provider: each model id maps to a
//! queue of canned results, and every call is recorded so tests can assert
//! the exact order of attempts.

use async_trait::async_trait;
use doc2html::{
    FormatProgressCallback, GenerationOutcome, ModelChain, ModelDescriptor, ModelStatus,
    Orchestrator, ProviderError, ProviderErrorKind, RetryPolicy, TextGenerator, FALLBACK_MODEL_ID,
};
use doc2html::synthesize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// ── Test helpers ─────────────────────────────────────────────────────────────

#[derive(Clone)]
enum Step {
    Reply(&'static str),
    Fail(ProviderErrorKind),
    Hang,
}

#[derive(Default)]
struct ScriptedGenerator {
    script: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedGenerator {
    fn new(script: &[(&str, &[Step])]) -> Arc<Self> {
        let map = script
            .iter()
            .map(|(model, steps)| (model.to_string(), steps.iter().cloned().collect()))
            .collect();
        Arc::new(Self {
            script: Mutex::new(map),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }

    fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate_text(&self, model: &str, _prompt: &str) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push((model.to_string(), Instant::now()));
        let step = self
            .script
            .lock()
            .unwrap()
            .get_mut(model)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Step::Fail(ProviderErrorKind::Fatal));
        match step {
            Step::Reply(html) => Ok(html.to_string()),
            Step::Fail(kind) => Err(ProviderError::new(model, kind, format!("{kind:?} from {model}"))),
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok("<html>too late</html>".to_string())
            }
        }
    }
}

const BACKOFF_MS: u64 = 50;
const DOC: &str = "<!DOCTYPE html><html><body>ok</body></html>";

fn orchestrator(generator: Arc<ScriptedGenerator>, ids: &[&str]) -> (Orchestrator, Arc<ModelStatus>) {
    let status = Arc::new(ModelStatus::new("unset"));
    let chain = ModelChain::from_identifiers(ids.iter().copied(), BACKOFF_MS).unwrap();
    let o = Orchestrator::new(generator, chain)
        .with_status(status.clone())
        .with_timeout(Duration::from_millis(500));
    (o, status)
}

use ProviderErrorKind::{Fatal, RateLimited, Transient};

// ── Chain order and retry policy ─────────────────────────────────────────────

#[tokio::test]
async fn primary_success_makes_one_call() {
    let g = ScriptedGenerator::new(&[("p1", &[Step::Reply(DOC)])]);
    let (o, status) = orchestrator(g.clone(), &["p1", "p2"]);

    let outcome = o.generate("text", "").await;
    assert_eq!(outcome.model_used(), Some("p1"));
    assert_eq!(outcome.html(), Some(DOC));
    assert_eq!(g.calls(), vec!["p1"]);
    assert_eq!(status.current(), "p1");
}

#[tokio::test]
async fn primary_rate_limit_retries_once_after_backoff() {
    let g = ScriptedGenerator::new(&[("p1", &[Step::Fail(RateLimited), Step::Reply(DOC)])]);
    let (o, _) = orchestrator(g.clone(), &["p1", "p2"]);

    let report = o.run("text", "").await;
    assert_eq!(report.outcome.model_used(), Some("p1"));
    assert_eq!(g.calls(), vec!["p1", "p1"]);

    let times = g.call_times();
    assert!(
        times[1].duration_since(times[0]) >= Duration::from_millis(BACKOFF_MS),
        "retry came before the backoff elapsed"
    );
    let attempts: Vec<u32> = report.attempts.iter().map(|a| a.attempt).collect();
    assert_eq!(attempts, vec![1, 2]);
}

#[tokio::test]
async fn primary_rate_limited_twice_moves_on() {
    let g = ScriptedGenerator::new(&[
        ("p1", &[Step::Fail(RateLimited), Step::Fail(RateLimited)]),
        ("p2", &[Step::Reply(DOC)]),
    ]);
    let (o, _) = orchestrator(g.clone(), &["p1", "p2"]);

    let outcome = o.generate("text", "").await;
    assert_eq!(outcome.model_used(), Some("p2"));
    assert_eq!(g.calls(), vec!["p1", "p1", "p2"]);
}

#[tokio::test]
async fn primary_non_rate_limit_failure_is_not_retried() {
    for kind in [Fatal, Transient] {
        let g = ScriptedGenerator::new(&[("p1", &[Step::Fail(kind)]), ("p2", &[Step::Reply(DOC)])]);
        let (o, _) = orchestrator(g.clone(), &["p1", "p2"]);
        let outcome = o.generate("text", "").await;
        assert_eq!(outcome.model_used(), Some("p2"));
        assert_eq!(g.calls(), vec!["p1", "p2"], "{kind:?} must not retry");
    }
}

#[tokio::test]
async fn secondary_rate_limit_is_not_retried() {
    let g = ScriptedGenerator::new(&[
        ("p1", &[Step::Fail(Fatal)]),
        ("p2", &[Step::Fail(RateLimited)]),
        ("p3", &[Step::Reply(DOC)]),
    ]);
    let (o, status) = orchestrator(g.clone(), &["p1", "p2", "p3"]);

    let outcome = o.generate("text", "").await;
    assert_eq!(outcome.model_used(), Some("p3"));
    assert_eq!(g.calls(), vec!["p1", "p2", "p3"]);
    assert_eq!(status.current(), "p3");
}

#[tokio::test]
async fn explicit_retry_policy_on_later_model() {
    let g = ScriptedGenerator::new(&[
        ("a", &[Step::Fail(Fatal)]),
        ("b", &[Step::Fail(RateLimited), Step::Reply(DOC)]),
    ]);
    let chain = ModelChain::new(vec![
        ModelDescriptor::new("a", 1),
        ModelDescriptor::new("b", 2).with_retry(RetryPolicy::OnceOnRateLimit { backoff_ms: 1 }),
    ])
    .unwrap();
    let o = Orchestrator::new(g.clone(), chain).with_status(Arc::new(ModelStatus::new("x")));

    assert_eq!(o.generate("t", "").await.model_used(), Some("b"));
    assert_eq!(g.calls(), vec!["a", "b", "b"]);
}

// ── Failure handling ─────────────────────────────────────────────────────────

#[tokio::test]
async fn timeout_counts_as_transient() {
    let g = ScriptedGenerator::new(&[("slow", &[Step::Hang]), ("fast", &[Step::Reply(DOC)])]);
    let (o, _) = orchestrator(g.clone(), &["slow", "fast"]);
    let o = o.with_timeout(Duration::from_millis(20));

    let report = o.run("text", "").await;
    assert_eq!(report.outcome.model_used(), Some("fast"));
    let first = report.attempts[0].error.as_ref().unwrap();
    assert_eq!(first.kind, Transient);
    assert!(first.message.contains("timed out"));
}

#[tokio::test]
async fn blank_reply_moves_on() {
    let g = ScriptedGenerator::new(&[("p1", &[Step::Reply("```html\n```")]), ("p2", &[Step::Reply(DOC)])]);
    let (o, _) = orchestrator(g.clone(), &["p1", "p2"]);
    assert_eq!(o.generate("text", "").await.model_used(), Some("p2"));
}

#[tokio::test]
async fn fenced_reply_is_cleaned() {
    let g = ScriptedGenerator::new(&[(
        "p1",
        &[Step::Reply("```html\n<!DOCTYPE html><html><body>ok</body></html>\n```")],
    )]);
    let (o, _) = orchestrator(g, &["p1"]);
    assert_eq!(o.generate("text", "").await.html(), Some(DOC));
}

#[tokio::test]
async fn exhausted_chain_uses_fallback() {
    let g = ScriptedGenerator::new(&[("p1", &[Step::Fail(RateLimited), Step::Fail(RateLimited)])]);
    let (o, status) = orchestrator(g.clone(), &["p1", "p2", "p3"]);

    let text = "Website Report for example.org\nGrade: A-\nScore: 92";
    let template = "<html><body><p>Not available</p><p>Not available</p><p>Not available</p></body></html>";
    let report = o.run(text, template).await;

    assert_eq!(
        report.outcome,
        GenerationOutcome::FallbackUsed {
            html: "<html><body><p>example.org</p><p>A-</p><p>92</p></body></html>".into()
        }
    );
    assert_eq!(report.outcome.model_used(), Some(FALLBACK_MODEL_ID));
    assert_eq!(g.calls(), vec!["p1", "p1", "p2", "p3"]);
    assert_eq!(report.attempts.len(), 4);
    assert!(report.attempts.iter().all(|a| a.error.is_some()));
    assert_eq!(status.current(), FALLBACK_MODEL_ID);
}

#[tokio::test]
async fn fallback_output_is_exactly_synthesize() {
    let text = "OVERVIEW\nQuarterly revenue grew in every region.\nWe should improve onboarding.";
    for template in ["", "<div>[SUMMARY] / Not available</div>"] {
        let g = ScriptedGenerator::new(&[
            ("p1", &[Step::Fail(RateLimited), Step::Fail(Fatal)]),
            ("p2", &[Step::Fail(RateLimited)]),
        ]);
        let (o, _) = orchestrator(g, &["p1", "p2"]);
        assert_eq!(
            o.generate(text, template).await,
            GenerationOutcome::FallbackUsed {
                html: synthesize(text, template)
            }
        );
    }
}

#[tokio::test]
async fn fallback_without_template_is_a_document() {
    let g = ScriptedGenerator::new(&[]);
    let (o, _) = orchestrator(g, &["p1"]);
    let outcome = o.generate("SUMMARY\n<script>alert(1)</script>", "").await;
    let html = outcome.html().unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.trim_end().ends_with("</html>"));
    assert!(!html.contains("<script>"));
}

// ── Progress events ──────────────────────────────────────────────────────────

#[derive(Default)]
struct EventLog(Mutex<Vec<String>>);

impl FormatProgressCallback for EventLog {
    fn on_model_attempt(&self, model: &str, _priority: u32, attempt: u32) {
        self.0.lock().unwrap().push(format!("try {model}#{attempt}"));
    }
    fn on_model_failed(&self, model: &str, kind: ProviderErrorKind, _error: &str) {
        self.0.lock().unwrap().push(format!("fail {model} {kind:?}"));
    }
    fn on_rate_limit_backoff(&self, model: &str, _backoff_ms: u64) {
        self.0.lock().unwrap().push(format!("backoff {model}"));
    }
    fn on_generation_complete(&self, model: &str, _html_len: usize) {
        self.0.lock().unwrap().push(format!("done {model}"));
    }
    fn on_fallback(&self, models_tried: usize) {
        self.0.lock().unwrap().push(format!("fallback {models_tried}"));
    }
}

#[tokio::test]
async fn progress_events_follow_the_walk() {
    let g = ScriptedGenerator::new(&[
        ("p1", &[Step::Fail(RateLimited), Step::Fail(Transient)]),
        ("p2", &[Step::Reply(DOC)]),
    ]);
    let log = Arc::new(EventLog::default());
    let (o, _) = orchestrator(g, &["p1", "p2"]);
    let o = o.with_progress(log.clone());

    o.generate("text", "").await;
    assert_eq!(
        *log.0.lock().unwrap(),
        vec![
            "try p1#1",
            "fail p1 RateLimited",
            "backoff p1",
            "try p1#2",
            "fail p1 Transient",
            "try p2#1",
            "done p2",
        ]
    );
}

#[tokio::test]
async fn concurrent_requests_each_get_their_own_answer() {
    let g = ScriptedGenerator::new(&[
        ("p1", &[Step::Reply(DOC), Step::Fail(Fatal)]),
        ("p2", &[Step::Reply(DOC)]),
    ]);
    let (o, _) = orchestrator(g, &["p1", "p2"]);
    let o = Arc::new(o);

    let (a, b) = tokio::join!(o.generate("a", ""), o.generate("b", ""));
    let mut used = vec![
        a.model_used().unwrap().to_string(),
        b.model_used().unwrap().to_string(),
    ];
    used.sort();
    assert_eq!(used, vec!["p1", "p2"]);
}
