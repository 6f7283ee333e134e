//! Test suite for the LLMPipeline library
//!
//! This module contains tests for:
//! - Pipeline sequencing and failure handling
//! - Built-in agent types
//! - The ready-made apps, run offline against scripted models
//! - The chat bridge end to end

#[cfg(test)]
mod tests {
    use crate::agents::{FetchAgent, FnAgent, LlmAgent};
    use crate::apps::{financial_coach, real_estate, FinancialCoach, RealEstateTeam};
    use crate::apps::debt::Debt;
    use crate::bridge::{
        ChatBridge, ChatEvent, ChatSink, ServeSummary, SessionStore, TaskBackend, TaskPoller,
        TaskState, TaskStatus,
    };
    use crate::criteria::{Criteria, FinancialProfile, PropertySearch};
    use crate::errors::{ApiError, BridgeError, CriteriaError, PipelineError, StageError};
    use crate::fetch::{FetchRequest, StaticFetcher};
    use crate::generate::{ChatModel, ChatRequest};
    use crate::models::pipeline::{Agent, Pipeline};
    use crate::models::stage::{PipelineContext, StageOutput};
    use crate::progress::{FnReporter, NoopReporter, ProgressEvent};
    use crate::render::render_markdown;
    use crate::PipelineResult;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    // ================================
    // TEST AGENTS AND MODELS
    // ================================

    /// Simple test agent that echoes the previous stage (or the city)
    pub struct EchoAgent {
        name: String,
    }

    impl EchoAgent {
        pub fn new(name: impl Into<String>) -> Self {
            Self { name: name.into() }
        }
    }

    #[async_trait]
    impl Agent for EchoAgent {
        async fn run(&mut self, ctx: &PipelineContext) -> PipelineResult<StageOutput> {
            let input = match ctx.previous() {
                Some(output) => output.text.clone(),
                None => ctx.criteria().text_or("city", "nowhere"),
            };
            Ok(StageOutput::text(&self.name, format!("Echo: {}", input)))
        }

        fn get_name(&self) -> &str {
            &self.name
        }
    }

    /// Test agent that always fails
    pub struct FailingAgent;

    #[async_trait]
    impl Agent for FailingAgent {
        async fn run(&mut self, _ctx: &PipelineContext) -> PipelineResult<StageOutput> {
            Err(ApiError::RateLimitExceeded.into())
        }

        fn get_name(&self) -> &str {
            "flaky"
        }
    }

    /// Chat model returning queued replies, then a fixed fallback.
    /// Every request is kept for inspection.
    #[derive(Default)]
    pub struct ScriptedModel {
        replies: Mutex<VecDeque<String>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedModel {
        pub fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, request: ChatRequest) -> Result<String, ApiError> {
            self.requests.lock().unwrap().push(request);
            Ok(self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| "Scripted answer.".to_string()))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn recording_reporter() -> (
        Arc<Mutex<Vec<ProgressEvent>>>,
        FnReporter<impl Fn(ProgressEvent) + Send + Sync>,
    ) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let reporter = FnReporter::new(move |event| sink.lock().unwrap().push(event));
        (events, reporter)
    }

    fn listings() -> StaticFetcher {
        StaticFetcher::from_json(
            &json!({
                "properties": [
                    {"address": "1 Main St", "price": "$350,000", "bedrooms": 3},
                    {"address": "9 Oak Ave", "price": "$410,000", "listing_url": "https://example.com/9"}
                ]
            }),
            Some("properties"),
        )
    }

    // ================================
    // CORE PIPELINE TESTS
    // ================================

    /// Test that stages run in order and each sees the one before
    #[tokio::test]
    async fn test_stages_run_in_order() {
        let mut pipeline = Pipeline::new("echo")
            .with_stage(Box::new(EchoAgent::new("first")))
            .unwrap()
            .with_stage(Box::new(EchoAgent::new("second")))
            .unwrap();
        assert_eq!(pipeline.stage_names(), vec!["first", "second"]);

        let run = pipeline
            .run(Criteria::new().with("city", "Austin"), &NoopReporter)
            .await
            .unwrap();

        assert_eq!(run.pipeline(), "echo");
        assert_eq!(run.outputs().len(), 2);
        assert_eq!(run.output("first").unwrap().text, "Echo: Austin");
        assert_eq!(run.final_output().text, "Echo: Echo: Austin");
        assert_eq!(run.criteria().text_or("city", ""), "Austin");
    }

    /// Test construction errors
    #[tokio::test]
    async fn test_empty_and_duplicate_stages_are_rejected() {
        let mut empty = Pipeline::new("empty");
        assert!(empty.is_empty());
        let err = empty.run(Criteria::new(), &NoopReporter).await.unwrap_err();
        assert!(matches!(err, PipelineError::EmptyPipeline));

        let mut pipeline = Pipeline::new("dupes");
        pipeline.add_stage(Box::new(EchoAgent::new("same"))).unwrap();
        let err = pipeline.add_stage(Box::new(EchoAgent::new("same"))).unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateStage(ref name) if name == "same"));
        assert_eq!(pipeline.len(), 1);
    }

    /// Test that the first failure stops the run and names the stage
    #[tokio::test]
    async fn test_failure_stops_pipeline() {
        let after_failure = Arc::new(AtomicUsize::new(0));
        let counter = after_failure.clone();

        let mut pipeline = Pipeline::new("broken")
            .with_stage(Box::new(EchoAgent::new("search")))
            .unwrap()
            .with_stage(Box::new(FailingAgent))
            .unwrap()
            .with_stage(Box::new(FnAgent::new("never", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(String::new())
            })))
            .unwrap();

        let (events, reporter) = recording_reporter();
        let err = pipeline.run(Criteria::new(), &reporter).await.unwrap_err();

        match err {
            PipelineError::Stage(StageError::Failed { stage, source }) => {
                assert_eq!(stage, "flaky");
                assert!(matches!(*source, PipelineError::Api(ApiError::RateLimitExceeded)));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(after_failure.load(Ordering::SeqCst), 0);

        let described: Vec<String> = events.lock().unwrap().iter().map(|e| e.describe()).collect();
        assert_eq!(described.len(), 4);
        assert_eq!(described[0], "[1/3] search running...");
        assert_eq!(described[2], "[2/3] flaky running...");
        assert_eq!(described[3], "[2/3] flaky failed: API error: API rate limit exceeded");
    }

    /// Test that the reporter sees a start and a completion per stage
    #[tokio::test]
    async fn test_progress_events_bracket_each_stage() {
        let mut pipeline = Pipeline::new("progress")
            .with_stage(Box::new(EchoAgent::new("a")))
            .unwrap()
            .with_stage(Box::new(EchoAgent::new("b")))
            .unwrap();

        let (events, reporter) = recording_reporter();
        pipeline.run(Criteria::new(), &reporter).await.unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], ProgressEvent::Started { index: 0, total: 2, .. }));
        assert!(matches!(events[1], ProgressEvent::Completed { index: 0, .. }));
        assert!(matches!(events[2], ProgressEvent::Started { index: 1, .. }));
        assert!(matches!(events[3], ProgressEvent::Completed { index: 1, total: 2, .. }));
    }

    // ================================
    // BUILT-IN AGENT TESTS
    // ================================

    /// Test that the LLM agent renders its prompt from the context
    #[tokio::test]
    async fn test_llm_agent_renders_prompt() {
        let model = ScriptedModel::new(&["Prices are rising."]);
        let analyst = LlmAgent::new("market_analysis", model.clone())
            .with_instructions("You are an analyst.")
            .with_prompt("Market in {criteria.city}:\n{stage.search}")
            .with_temperature(0.2)
            .with_max_tokens(500);

        let mut pipeline = Pipeline::new("llm")
            .with_stage(Box::new(EchoAgent::new("search")))
            .unwrap()
            .with_stage(Box::new(analyst))
            .unwrap();

        let run = pipeline
            .run(Criteria::new().with("city", "Denver"), &NoopReporter)
            .await
            .unwrap();
        assert_eq!(run.final_output().text, "Prices are rising.");

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].system.as_deref(), Some("You are an analyst."));
        assert_eq!(requests[0].prompt, "Market in Denver:\nEcho: Denver");
        assert_eq!(requests[0].temperature, 0.2);
        assert_eq!(requests[0].max_tokens, Some(500));
    }

    /// Test empty model output and unresolved placeholders
    #[tokio::test]
    async fn test_llm_agent_errors() {
        let model = ScriptedModel::new(&["   "]);
        let mut pipeline = Pipeline::new("blank")
            .with_stage(Box::new(LlmAgent::new("writer", model.clone())))
            .unwrap();
        let err = pipeline.run(Criteria::new(), &NoopReporter).await.unwrap_err();
        match err {
            PipelineError::Stage(StageError::Failed { source, .. }) => assert!(matches!(
                *source,
                PipelineError::Stage(StageError::EmptyOutput(ref name)) if name == "writer"
            )),
            other => panic!("unexpected error: {:?}", other),
        }

        let mut pipeline = Pipeline::new("typo")
            .with_stage(Box::new(
                LlmAgent::new("writer", model.clone()).with_prompt("{stage.serach}"),
            ))
            .unwrap();
        let err = pipeline.run(Criteria::new(), &NoopReporter).await.unwrap_err();
        assert!(err.to_string().contains("stage.serach"));
        // the template failed before any request went out
        assert_eq!(model.requests().len(), 1);
    }

    /// Test that the fetch agent passes records downstream
    #[tokio::test]
    async fn test_fetch_agent_outputs_records() {
        let fetcher = Arc::new(listings());
        let search = FetchAgent::new("search", fetcher, |criteria| {
            Ok(FetchRequest::new(format!("homes in {}", criteria.text_or("city", ""))))
        });

        let mut pipeline = Pipeline::new("fetch")
            .with_stage(Box::new(search))
            .unwrap()
            .with_stage(Box::new(FnAgent::new("count", |ctx| {
                let found = ctx.output("search").map(|o| o.records.len()).unwrap_or(0);
                Ok(format!("{} listings", found))
            })))
            .unwrap();

        let run = pipeline.run(Criteria::new(), &NoopReporter).await.unwrap();
        let search = run.output("search").unwrap();
        assert_eq!(search.records.len(), 2);
        assert!(search.text.contains("\"address\": \"1 Main St\""));
        assert_eq!(run.final_output().text, "2 listings");
    }

    /// Test that an empty fetch can be made fatal
    #[tokio::test]
    async fn test_fetch_agent_can_require_records() {
        let search = FetchAgent::new("search", Arc::new(StaticFetcher::default()), |_| {
            Ok(FetchRequest::new("anything"))
        })
        .require_records(true);

        let mut pipeline = Pipeline::new("strict").with_stage(Box::new(search)).unwrap();
        let err = pipeline.run(Criteria::new(), &NoopReporter).await.unwrap_err();
        assert!(err.to_string().contains("returned empty output"));
    }

    // ================================
    // APP TESTS
    // ================================

    /// Test the real-estate team end to end against canned listings
    #[tokio::test]
    async fn test_real_estate_team() {
        let model = ScriptedModel::new(&["Austin is a seller's market.", "Buy 1 Main St."]);
        let team = RealEstateTeam::new(model.clone(), Arc::new(listings()));

        let criteria: Criteria = PropertySearch {
            city: "Austin".into(),
            state: "TX".into(),
            min_price: Some(300_000.0),
            max_price: Some(450_000.0),
            bedrooms: Some(3),
            special_features: vec!["pool".into()],
            ..Default::default()
        }
        .into();

        let run = team.run(criteria, &NoopReporter).await.unwrap();
        let stages: Vec<&str> = run.outputs().iter().map(|o| o.stage.as_str()).collect();
        assert_eq!(
            stages,
            vec![
                real_estate::PROPERTY_SEARCH,
                real_estate::MARKET_ANALYSIS,
                real_estate::PROPERTY_VALUATION
            ]
        );

        let requests = model.requests();
        assert!(requests[0].prompt.contains("Austin, TX"));
        assert!(requests[0].prompt.contains("1 Main St"));
        assert!(requests[1].prompt.contains("Buyer wants: pool."));
        assert!(requests[1].prompt.contains("Austin is a seller's market."));

        let report = real_estate::report(&run);
        assert!(report
            .metrics
            .iter()
            .any(|m| m.label == "Properties found" && m.value == "2"));
        assert!(report.metrics.iter().any(|m| m.value == "$300000 - $450000"));

        let markdown = render_markdown(&report);
        assert!(markdown.starts_with("# Properties in Austin, TX\n"));
        assert!(markdown.contains("## Property Search"));
        assert!(markdown.contains("### 1. 1 Main St"));
        assert!(markdown.contains("- **Agent Contact**: N/A"));
        assert!(markdown.contains("## Property Valuation\n\nBuy 1 Main St."));
    }

    /// Test that missing location stops the team before any call
    #[tokio::test]
    async fn test_real_estate_requires_location() {
        let model = ScriptedModel::new(&[]);
        let team = RealEstateTeam::new(model.clone(), Arc::new(listings()));

        let err = team
            .run(Criteria::new().with("city", "Austin"), &NoopReporter)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Criteria(CriteriaError::Missing(ref field)) if field == "state"
        ));
        assert!(model.requests().is_empty());
    }

    fn household() -> FinancialProfile {
        FinancialProfile {
            monthly_income: 5200.0,
            dependants: 1,
            expenses: vec![("Housing".into(), 1600.0), ("Food".into(), 700.0)],
            debts: vec![
                Debt::new("Credit card", 3000.0, 21.0, 90.0),
                Debt::new("Car loan", 8000.0, 5.5, 220.0),
            ],
            extra_debt_payment: 200.0,
        }
    }

    /// Test the financial coach with a locally computed debt plan
    #[tokio::test]
    async fn test_financial_coach() {
        let model = ScriptedModel::new(&["Housing is 31% of income.", "Save 15%.", "Cards first."]);
        let coach = FinancialCoach::new(model.clone());
        let profile = household();

        let run = coach.run(&profile, &NoopReporter).await.unwrap();
        assert_eq!(run.outputs().len(), 4);

        let plan = &run.output(financial_coach::DEBT_PLAN).unwrap().text;
        assert!(plan.contains("Avalanche: debt-free in"));
        assert!(plan.contains("Snowball: debt-free in"));

        let requests = model.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[0].prompt.contains("Monthly income: $5200"));
        assert!(requests[0].prompt.contains("Housing: $1600.00, Food: $700.00"));
        assert!(requests[1].prompt.contains("Housing is 31% of income."));
        assert!(requests[2].prompt.contains(plan.as_str()));

        let report = financial_coach::report(&run, &profile);
        let labels: Vec<&str> = report.metrics.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Monthly income", "Monthly expenses", "Savings potential", "Debt-free in"]
        );
        assert_eq!(report.metrics[2].value, "$2900.00");
    }

    /// Test income validation
    #[tokio::test]
    async fn test_financial_coach_rejects_zero_income() {
        let model = ScriptedModel::new(&[]);
        let profile = FinancialProfile {
            monthly_income: 0.0,
            ..household()
        };
        let err = FinancialCoach::new(model.clone())
            .run(&profile, &NoopReporter)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Criteria(CriteriaError::Invalid { .. })));
        assert!(model.requests().is_empty());
    }

    /// Test that a debt that is never paid off is coached, not fatal
    #[tokio::test]
    async fn test_financial_coach_hopeless_debt() {
        let model = ScriptedModel::new(&["Tight budget.", "Save 5%.", "Refinance the payday loan."]);
        let profile = FinancialProfile {
            debts: vec![Debt::new("Payday", 10_000.0, 36.0, 50.0)],
            extra_debt_payment: 0.0,
            ..household()
        };

        let run = FinancialCoach::new(model.clone())
            .run(&profile, &NoopReporter)
            .await
            .unwrap();
        assert_eq!(run.outputs().len(), 4);

        let plan = &run.output(financial_coach::DEBT_PLAN).unwrap().text;
        assert!(plan.contains("Debt 'Payday' is never paid off at current payments."));
        assert!(model.requests()[2].prompt.contains(plan.as_str()));
        assert_eq!(run.final_output().text, "Refinance the payday loan.");

        let report = financial_coach::report(&run, &profile);
        assert!(report.metrics.iter().all(|m| m.label != "Debt-free in"));
    }

    /// Test that search results without addresses still render as cards
    #[tokio::test]
    async fn test_real_estate_team_with_search_results() {
        let model = ScriptedModel::new(&[]);
        let results = StaticFetcher::from_json(
            &json!([
                {"title": "3BR home near Zilker", "url": "https://homes.test/z", "publishedDate": null, "text": "Big yard"}
            ]),
            None,
        );
        let team = RealEstateTeam::new(model, Arc::new(results));

        let criteria = Criteria::new().with("city", "Austin").with("state", "TX");
        let run = team.run(criteria, &NoopReporter).await.unwrap();

        let markdown = render_markdown(&real_estate::report(&run));
        assert!(markdown.contains("### 1. 3BR home near Zilker"));
        assert!(markdown.contains("https://homes.test/z"));
        assert!(!markdown.contains("### 1. N/A"));
    }

    // ================================
    // CHAT BRIDGE TESTS
    // ================================

    /// Backend that finishes every task immediately with a fixed status
    struct InstantBackend {
        outcome: TaskStatus,
        submitted: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl TaskBackend for InstantBackend {
        async fn submit(&self, session_id: &str, message: &str) -> Result<String, BridgeError> {
            let mut submitted = self.submitted.lock().unwrap();
            submitted.push((session_id.to_string(), message.to_string()));
            Ok(format!("t-{}", submitted.len()))
        }

        async fn status(&self, _task_id: &str) -> Result<TaskStatus, BridgeError> {
            Ok(self.outcome.clone())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        posts: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl ChatSink for RecordingSink {
        async fn post(&self, channel: &str, thread_ts: &str, text: &str) -> Result<(), BridgeError> {
            self.posts
                .lock()
                .unwrap()
                .push((channel.to_string(), thread_ts.to_string(), text.to_string()));
            Ok(())
        }
    }

    fn bridge(outcome: TaskStatus) -> (ChatBridge, Arc<InstantBackend>, Arc<RecordingSink>, Arc<SessionStore>) {
        let store = Arc::new(SessionStore::in_memory().unwrap());
        let backend = Arc::new(InstantBackend {
            outcome,
            submitted: Mutex::new(Vec::new()),
        });
        let sink = Arc::new(RecordingSink::default());
        let bridge = ChatBridge::new(
            store.clone(),
            backend.clone(),
            sink.clone(),
            TaskPoller::new(Duration::from_millis(1), 5),
            2,
        );
        (bridge, backend, sink, store)
    }

    fn message(ts: &str, thread_ts: Option<&str>, text: &str) -> ChatEvent {
        ChatEvent {
            channel: "C42".into(),
            ts: ts.into(),
            thread_ts: thread_ts.map(String::from),
            text: text.into(),
        }
    }

    /// Test that results are posted in the thread and sessions are reused
    #[tokio::test]
    async fn test_bridge_replies_in_thread() {
        let done = TaskStatus::new(TaskState::Completed).with_result(json!("Found 3 homes."));
        let (bridge, backend, sink, store) = bridge(done);

        bridge
            .handle(&message("100.1", None, "<@U1> homes in Austin"))
            .await
            .unwrap();
        bridge
            .handle(&message("100.9", Some("100.1"), "under 400k"))
            .await
            .unwrap();

        let submitted = backend.submitted.lock().unwrap().clone();
        assert_eq!(submitted[0], ("C42-100.1".to_string(), "homes in Austin".to_string()));
        assert_eq!(submitted[1].0, "C42-100.1");

        let posts = sink.posts.lock().unwrap().clone();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0], ("C42".into(), "100.1".into(), "Found 3 homes.".into()));

        let state = store.load_state("C42-100.1").unwrap().unwrap();
        assert_eq!(state["last_task"], "t-2");
        assert_eq!(state["last_state"], "completed");
        assert_eq!(bridge.available_workers(), 2);
    }

    /// Test that failures are reported in the thread
    #[tokio::test]
    async fn test_bridge_reports_failures() {
        let failed = TaskStatus::new(TaskState::Failed).with_message("boom");
        let (bridge, _backend, sink, _store) = bridge(failed);

        let err = bridge
            .handle(&message("200.1", None, "break"))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::TaskFailed { ref message, .. } if message == "boom"));

        let posts = sink.posts.lock().unwrap().clone();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].2, "An error occurred: Task t-1 failed: boom");
    }

    /// Test that a stream of event lines is handled concurrently
    #[tokio::test]
    async fn test_bridge_serves_event_lines() {
        let done = TaskStatus::new(TaskState::Completed).with_result(json!("On it."));
        let (bridge, backend, sink, _store) = bridge(done);

        let input = concat!(
            r#"{"channel":"C42","ts":"300.1","text":"<@U1> homes in Austin"}"#,
            "\n\n",
            "not json\n",
            r#"{"channel":"C42","ts":"300.5","thread_ts":"300.1","text":"with a pool"}"#,
            "\n",
        );
        let summary = Arc::new(bridge).serve(input.as_bytes()).await.unwrap();
        assert_eq!(
            summary,
            ServeSummary {
                handled: 2,
                failed: 0,
                malformed: 1
            }
        );

        let submitted = backend.submitted.lock().unwrap().clone();
        assert_eq!(submitted.len(), 2);
        assert!(submitted.iter().all(|(session, _)| session == "C42-300.1"));
        assert_eq!(sink.posts.lock().unwrap().len(), 2);
    }

    /// Test that failed events are counted and the stream keeps going
    #[tokio::test]
    async fn test_bridge_serve_counts_failures() {
        let failed = TaskStatus::new(TaskState::Failed).with_message("backend down");
        let (bridge, _backend, sink, _store) = bridge(failed);

        let input = r#"{"channel":"C7","ts":"1.1","text":"first"}
{"channel":"C7","ts":"2.2","text":"second"}
"#;
        let summary = Arc::new(bridge).serve(input.as_bytes()).await.unwrap();
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.handled, 0);

        let posts = sink.posts.lock().unwrap().clone();
        assert_eq!(posts.len(), 2);
        assert!(posts.iter().all(|(_, _, text)| text.starts_with("An error occurred:")));
    }

    // ================================
    // LIVE API TESTS
    // ================================

    /// Runs one real model call using the configured provider
    #[tokio::test]
    #[ignore = "requires an LLM API key in the environment or .env"]
    async fn test_live_llm_stage() {
        let config = crate::Config::from_env().unwrap();
        let client = crate::ChatClient::from_config(&config).unwrap();

        let mut pipeline = Pipeline::new("live")
            .with_stage(Box::new(
                LlmAgent::new("haiku", Arc::new(client))
                    .with_prompt("Write one short sentence about {criteria.city}.")
                    .with_max_tokens(60),
            ))
            .unwrap();

        let run = pipeline
            .run(Criteria::new().with("city", "Lisbon"), &NoopReporter)
            .await
            .unwrap();
        println!("{}", run.final_output().text);
        assert!(!run.final_output().text.trim().is_empty());
    }
}
