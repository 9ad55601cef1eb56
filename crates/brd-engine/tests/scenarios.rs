use brd_engine::{
    build_clusters, detect, package, AuditEntry, ConsolidationError, ConsolidationPipeline,
    ConsolidationReport, EngineConfig, FailureKind, FragmentExtractor, RunState, RunTracker,
    SynthesisOutcome, Synthesizer,
};
use brd_model::{EdgeKind, FragmentId, Scope, IMPLICIT_LABEL};
use brd_oracle::ContractViolation;
use brd_test_utils::{fixtures, reply_json, EchoOracle, FailingOracle, ScriptedOracle};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::Arc;

fn pipeline() -> ConsolidationPipeline {
    ConsolidationPipeline::new(EngineConfig::default()).unwrap()
}

fn sessions(report: &ConsolidationReport) -> Vec<String> {
    report.records().into_iter().map(|r| r.session).collect()
}

#[tokio::test]
async fn test_otp_flow_consolidates_into_one_requirement() {
    let report = pipeline().run(fixtures::OTP_FLOW).await.unwrap();

    assert_eq!(report.requirements.len(), 1);
    let record = &report.records()[0];
    assert_eq!(record.requirement_id.to_string(), "REQ-001");
    assert_eq!(record.session, IMPLICIT_LABEL);
    assert_eq!(
        record.source_texts,
        vec!["User enters OTP.", "System validates OTP.", "If OTP invalid, show error."]
    );
    assert_eq!(
        report.audit.entries().next(),
        Some(&AuditEntry::ImplicitScopeFallback { fragment_count: 3 })
    );
}

#[tokio::test]
async fn test_shared_object_across_sessions_stays_split() {
    let report = pipeline().run(fixtures::RECEIPT_ACROSS_SESSIONS).await.unwrap();

    assert_eq!(sessions(&report), vec!["Upload Receipt", "Redeem Reward"]);
    assert!(report.requirements.iter().all(|r| r.source_fragment_ids.len() == 1));
    assert_eq!(report.stats.clustered_edges, 0);
    assert_eq!(report.stats.discarded_edges, 1);

    let discarded: Vec<_> = report
        .audit
        .entries()
        .filter_map(|e| match e {
            AuditEntry::CrossBoundaryEdgeDiscarded { from, to, kind, .. } => Some((*from, *to, *kind)),
            _ => None,
        })
        .collect();
    assert_eq!(
        discarded,
        vec![(FragmentId(0), FragmentId(1), EdgeKind::SharedDataObject)]
    );
}

#[tokio::test]
async fn test_new_vocabulary_from_oracle_fails_the_cluster() {
    let sources = [
        "User enters OTP.",
        "System validates OTP.",
        "If OTP invalid, show error.",
    ];
    let oracle = ScriptedOracle::new().with_reply(
        "User enters OTP.",
        reply_json(
            &sources,
            "User enters OTP. System automatically validates OTP. If OTP invalid, show error.",
        ),
    );
    let report = pipeline()
        .with_oracle(Arc::new(oracle))
        .run(fixtures::OTP_FLOW)
        .await
        .unwrap();

    assert!(report.requirements.is_empty());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(
        report.failures[0].kind,
        FailureKind::OracleContractViolation(ContractViolation::OutOfVocabulary {
            tokens: vec!["automatically".to_string()],
        })
    );
    assert_eq!(report.audit.failures().count(), 1);
    assert!(report.audit.verify_integrity().is_ok());
}

#[tokio::test]
async fn test_blank_line_keeps_same_scope_flow_together() {
    let text = "User opens the settings page.\n\nUser changes the display name.";
    let report = pipeline().run(text).await.unwrap();

    assert_eq!(report.requirements.len(), 1);
    assert_eq!(
        report.records()[0].source_texts,
        vec!["User opens the settings page.", "User changes the display name."]
    );

    let split = ConsolidationPipeline::new(EngineConfig::default().with_paragraph_breaks_sequence(true))
        .unwrap()
        .run(text)
        .await
        .unwrap();
    assert_eq!(split.requirements.len(), 2);
}

#[tokio::test]
async fn test_empty_document_is_empty_input() {
    for text in ["", fixtures::NOISE_ONLY] {
        let result = pipeline().run(text).await;
        assert!(matches!(result, Err(ConsolidationError::EmptyInput)));
    }
}

#[tokio::test]
async fn test_failed_cluster_keeps_numbering_contiguous() {
    let oracle = ScriptedOracle::new().with_reply(
        "Admin reviews the Receipt image.",
        reply_json(
            &[
                "Admin reviews the Receipt image.",
                "If approved, credit Points to the Customer wallet.",
                "Otherwise reject the Receipt with a reason.",
            ],
            "Admin quickly reviews the Receipt image.",
        ),
    );
    let report = pipeline()
        .with_oracle(Arc::new(oracle))
        .run(fixtures::LOYALTY_BRD)
        .await
        .unwrap();

    let ids: Vec<String> = report
        .requirements
        .iter()
        .map(|r| r.requirement_id.to_string())
        .collect();
    assert_eq!(ids, vec!["REQ-001", "REQ-002", "REQ-003", "REQ-004"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(
        report.failures[0].scope,
        Scope::new(
            brd_model::Label::named("Admin"),
            brd_model::Label::named("Upload Receipt")
        )
    );
    assert!(report.failures[0].raw_reply.is_some());
}

#[tokio::test]
async fn test_strict_mode_aborts_on_first_failure() {
    let oracle = ScriptedOracle::new().with_reply("OTP", "not json");
    let pipeline = ConsolidationPipeline::new(EngineConfig::default().with_strict_mode(true))
        .unwrap()
        .with_oracle(Arc::new(oracle));

    let err = pipeline.run(fixtures::OTP_FLOW).await.unwrap_err();
    let ConsolidationError::StrictModeViolation(failure) = err else {
        panic!("expected strict mode violation, got {err:?}");
    };
    assert!(failure.kind.is_contract_violation());
}

#[tokio::test]
async fn test_oracle_outage_fails_the_run() {
    let result = pipeline()
        .with_oracle(Arc::new(FailingOracle::new()))
        .run(fixtures::OTP_FLOW)
        .await;
    assert!(matches!(result, Err(ConsolidationError::OracleUnavailable { .. })));

    let oracle = Arc::new(ScriptedOracle::new().failing_on("Reward catalogue", "quota exceeded"));
    let result = pipeline()
        .with_oracle(oracle.clone())
        .run(fixtures::LOYALTY_BRD)
        .await;
    assert!(matches!(result, Err(ConsolidationError::OracleUnavailable { .. })));
    // No retry: clusters before the outage were called once each, none after
    assert_eq!(oracle.calls(), 4);
}

#[tokio::test]
async fn test_loyalty_document_end_to_end() {
    let oracle = Arc::new(EchoOracle::new());
    let report = pipeline()
        .with_oracle(oracle.clone())
        .run(fixtures::LOYALTY_BRD)
        .await
        .unwrap();

    assert_eq!(report.stats.fragments, 16);
    assert_eq!(
        sessions(&report),
        vec!["Registration", "Upload Receipt", "Upload Receipt", "Redeem Reward", "Profile"]
    );
    assert_eq!(oracle.calls(), report.stats.clusters);
    assert!(report.stats.discarded_edges > 0);
    assert!(report.is_complete());
    assert_eq!(
        report.states,
        vec![
            RunState::Idle,
            RunState::Extracting,
            RunState::Detecting,
            RunState::Clustering,
            RunState::Synthesizing,
            RunState::Packaged,
        ]
    );

    let registration = &report.records()[0];
    assert_eq!(registration.source_texts.len(), 5);
    assert_eq!(registration.requirement_text, registration.source_texts.join(" "));
}

#[tokio::test]
async fn test_runs_are_deterministic() {
    let first = pipeline().run(fixtures::LOYALTY_BRD).await.unwrap();
    let second = pipeline().run(fixtures::LOYALTY_BRD).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[tokio::test]
async fn test_batch_runs_are_independent() {
    let pipeline = pipeline();
    let results = pipeline.run_batch(&fixtures::BATCH).await;
    assert_eq!(results.len(), fixtures::BATCH.len());

    for (text, result) in fixtures::BATCH.iter().zip(results) {
        let batched = result.unwrap();
        assert_eq!(batched, pipeline.run(text).await.unwrap());
        assert_eq!(batched.records()[0].requirement_id.to_string(), "REQ-001");
    }
}

#[tokio::test]
async fn test_report_round_trips_through_json() {
    let report = pipeline().run(fixtures::LOYALTY_BRD).await.unwrap();
    let json = serde_json::to_string_pretty(&report).unwrap();
    let back: ConsolidationReport = serde_json::from_str(&json).unwrap();

    assert_eq!(back, report);
    assert!(back.audit.verify_integrity().is_ok());
}

#[tokio::test]
async fn test_callers_can_drive_stages_with_supplied_scopes() {
    let config = EngineConfig::default();
    let mut tracker = RunTracker::new();

    tracker.advance(RunState::Extracting).unwrap();
    let overrides = BTreeMap::from([(FragmentId(2), Scope::session("Error Handling"))]);
    let fragments = FragmentExtractor::new(&config).extract_with_scopes(fixtures::OTP_FLOW, &overrides);

    tracker.advance(RunState::Detecting).unwrap();
    let graph = detect(&fragments, &config);
    assert_eq!(graph.discarded().count(), 2);

    tracker.advance(RunState::Clustering).unwrap();
    let clusters = build_clusters(&fragments, &graph).unwrap();
    assert_eq!(clusters.len(), 2);

    tracker.advance(RunState::Synthesizing).unwrap();
    let synthesizer = Synthesizer::new();
    let mut drafts = Vec::new();
    for cluster in &clusters {
        if let SynthesisOutcome::Drafted(draft) = synthesizer.synthesize(cluster, &fragments).await.unwrap() {
            drafts.push(draft);
        }
    }
    let packaged = package(drafts).unwrap();
    tracker.advance(RunState::Packaged).unwrap();

    let sessions: Vec<String> = packaged.records().into_iter().map(|r| r.session).collect();
    assert_eq!(sessions, vec![IMPLICIT_LABEL.to_string(), "Error Handling".to_string()]);
    assert!(tracker.current().is_terminal());
}
