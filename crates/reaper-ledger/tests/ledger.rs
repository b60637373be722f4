use jiff::Timestamp;
use reaper_core::{ResourceKind, ResourceRef};
use reaper_ledger::{
    AttemptOutcome, AttemptRecord, FileLedger, FinalOutcome, LedgerEntry, MemoryLedger,
    OutcomeLedger, PlanSnapshot, PlannedNode, RunId, RunState,
};

fn queue(id: &str) -> ResourceRef {
    ResourceRef::new(ResourceKind::Queue, "inst-1", id)
}

fn user(id: &str) -> ResourceRef {
    ResourceRef::new(ResourceKind::User, "inst-1", id)
}

fn planned(run_id: RunId, resources: &[ResourceRef]) -> LedgerEntry {
    LedgerEntry::Planned {
        run_id,
        at: Timestamp::now(),
        caller: Some("arn:aws:iam::123456789012:user/ops".into()),
        plan: PlanSnapshot {
            nodes: resources
                .iter()
                .map(|r| PlannedNode {
                    resource: r.clone(),
                    dependencies: vec![],
                })
                .collect(),
        },
    }
}

fn attempt(run_id: RunId, resource: &ResourceRef, n: u32, outcome: AttemptOutcome) -> LedgerEntry {
    LedgerEntry::Attempt(AttemptRecord {
        run_id,
        resource: resource.clone(),
        attempt: n,
        started_at: Timestamp::now(),
        outcome,
        error_detail: match outcome {
            AttemptOutcome::Success => None,
            _ => Some(format!("attempt {n} failed")),
        },
    })
}

#[tokio::test]
async fn memory_ledger_keeps_insertion_order_per_run() {
    let ledger = MemoryLedger::new();
    let run = RunId(1);
    let other = RunId(2);

    ledger.append(&planned(run, &[queue("q1")])).await.unwrap();
    ledger
        .append(&attempt(run, &queue("q1"), 1, AttemptOutcome::TransientFailure))
        .await
        .unwrap();
    ledger
        .append(&attempt(other, &queue("q9"), 1, AttemptOutcome::Success))
        .await
        .unwrap();
    ledger
        .append(&attempt(run, &queue("q1"), 2, AttemptOutcome::Success))
        .await
        .unwrap();

    let records = ledger.records_for(run).await.unwrap();
    let attempts: Vec<u32> = records.iter().map(|r| r.attempt).collect();
    assert_eq!(attempts, vec![1, 2]);
    assert_eq!(records[1].outcome, AttemptOutcome::Success);
    assert_eq!(ledger.latest_run_id().await.unwrap(), Some(RunId(2)));
}

#[tokio::test]
async fn unknown_run_has_no_entries() {
    let ledger = MemoryLedger::new();
    assert!(ledger.entries_for(RunId(7)).await.unwrap().is_empty());
    assert_eq!(ledger.latest_run_id().await.unwrap(), None);
}

#[tokio::test]
async fn summary_uses_last_outcome_and_lists_every_planned_resource() {
    let ledger = MemoryLedger::new();
    let run = RunId(3);
    let (q1, q2, q3, u1) = (queue("q1"), queue("q2"), queue("q3"), user("u1"));

    ledger.append(&planned(run, &[u1.clone(), q1.clone(), q2.clone(), q3.clone()])).await.unwrap();
    ledger.append(&attempt(run, &u1, 1, AttemptOutcome::TransientFailure)).await.unwrap();
    ledger.append(&attempt(run, &u1, 2, AttemptOutcome::Success)).await.unwrap();
    ledger.append(&attempt(run, &q1, 1, AttemptOutcome::PermanentFailure)).await.unwrap();
    ledger
        .append(&LedgerEntry::Skipped {
            run_id: run,
            at: Timestamp::now(),
            resource: q2.clone(),
            blocked_by: q1.clone(),
        })
        .await
        .unwrap();
    ledger
        .append(&LedgerEntry::Finished {
            run_id: run,
            at: Timestamp::now(),
            state: RunState::Cancelled,
            detail: None,
        })
        .await
        .unwrap();

    let summary = ledger.summarize(run).await.unwrap();
    assert_eq!(summary.state, Some(RunState::Cancelled));
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.unresolved, 1);
    assert_eq!(summary.total(), 4);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].resource, q1);
    assert_eq!(summary.failures[0].reason, "attempt 1 failed");
    assert_eq!(summary.outcome_of(&q3), Some(&FinalOutcome::Unresolved));
    assert_eq!(
        summary.outcome_of(&q2),
        Some(&FinalOutcome::Skipped { blocked_by: q1 })
    );
    assert_eq!(summary.resources[0].attempts, 2);
}

#[tokio::test]
async fn file_ledger_round_trips_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let run = RunId(12);
    {
        let ledger = FileLedger::new(dir.path());
        ledger.append(&planned(run, &[queue("q1")])).await.unwrap();
        ledger
            .append(&attempt(run, &queue("q1"), 1, AttemptOutcome::Success))
            .await
            .unwrap();
    }

    let reopened = FileLedger::new(dir.path());
    let entries = reopened.entries_for(run).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert!(matches!(entries[0], LedgerEntry::Planned { .. }));
    assert_eq!(reopened.latest_run_id().await.unwrap(), Some(run));
    assert_eq!(reopened.summarize(run).await.unwrap().succeeded, 1);
}

#[tokio::test]
async fn file_ledger_latest_run_ignores_foreign_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
    let ledger = FileLedger::new(dir.path());
    ledger.append(&planned(RunId(2), &[])).await.unwrap();
    ledger.append(&planned(RunId(10), &[])).await.unwrap();
    assert_eq!(ledger.latest_run_id().await.unwrap(), Some(RunId(10)));
}

#[tokio::test]
async fn file_ledger_tolerates_torn_trailing_line() {
    let dir = tempfile::tempdir().unwrap();
    let run = RunId(4);
    let ledger = FileLedger::new(dir.path());
    ledger.append(&planned(run, &[queue("q1")])).await.unwrap();

    let path = dir.path().join("run-4.jsonl");
    let mut contents = std::fs::read_to_string(&path).unwrap();
    contents.push_str("{\"entry\":\"attempt\",\"run_id\":4,\"reso");
    std::fs::write(&path, contents).unwrap();

    let entries = ledger.entries_for(run).await.unwrap();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn file_ledger_appends_cleanly_after_a_torn_line() {
    let dir = tempfile::tempdir().unwrap();
    let run = RunId(6);
    let ledger = FileLedger::new(dir.path());
    ledger.append(&planned(run, &[queue("q1")])).await.unwrap();
    ledger
        .append(&attempt(run, &queue("q1"), 1, AttemptOutcome::TransientFailure))
        .await
        .unwrap();

    let path = dir.path().join("run-6.jsonl");
    let mut contents = std::fs::read_to_string(&path).unwrap();
    contents.push_str("{\"entry\":\"attempt\",\"run_id\":6,\"reso");
    std::fs::write(&path, contents).unwrap();

    let reopened = FileLedger::new(dir.path());
    reopened
        .append(&attempt(run, &queue("q1"), 2, AttemptOutcome::Success))
        .await
        .unwrap();

    let entries = reopened.entries_for(run).await.unwrap();
    assert_eq!(entries.len(), 3);
    match &entries[2] {
        LedgerEntry::Attempt(record) => {
            assert_eq!(record.attempt, 2);
            assert_eq!(record.outcome, AttemptOutcome::Success);
        }
        other => panic!("expected the new attempt last, got {other:?}"),
    }

    let on_disk = std::fs::read_to_string(&path).unwrap();
    assert_eq!(on_disk.lines().count(), 3);
    assert!(on_disk.ends_with('\n'));
    assert!(!on_disk.contains("\"reso{"));

    let summary = reopened.summarize(run).await.unwrap();
    assert_eq!(summary.succeeded, 1);
}

#[tokio::test]
async fn file_ledger_drops_a_file_holding_only_a_torn_line() {
    let dir = tempfile::tempdir().unwrap();
    let run = RunId(7);
    std::fs::write(dir.path().join("run-7.jsonl"), "{\"entry\":\"plan").unwrap();

    let ledger = FileLedger::new(dir.path());
    ledger.append(&planned(run, &[user("u1")])).await.unwrap();

    let entries = ledger.entries_for(run).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(matches!(entries[0], LedgerEntry::Planned { .. }));
}

#[tokio::test]
async fn file_ledger_rejects_corruption_mid_file() {
    let dir = tempfile::tempdir().unwrap();
    let run = RunId(5);
    let path = dir.path().join("run-5.jsonl");
    std::fs::write(&path, "not json\n{}\n").unwrap();

    let ledger = FileLedger::new(dir.path());
    let err = ledger.entries_for(run).await.unwrap_err();
    assert!(err.to_string().contains("corrupt ledger entry"));
}

#[test]
fn entries_serialize_with_entry_tag() {
    let entry = attempt(RunId(1), &queue("q1"), 1, AttemptOutcome::Success);
    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(json["entry"], "attempt");
    assert_eq!(json["run_id"], 1);
    assert_eq!(json["outcome"], "success");
    assert_eq!(json["resource"]["kind"], "queue");
}
