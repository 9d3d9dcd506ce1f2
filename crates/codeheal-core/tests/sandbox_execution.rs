//! Cross-module scenarios for the sandbox battery, the knowledge base's
//! fallback query, and value-weighted garbage collection.

use std::sync::Arc;

use chrono::{Duration, Utc};
use codeheal_core::knowledge_base::{CompactionPolicy, CompactionStrategy};
use codeheal_core::sandbox::{IsolationLevel, SandboxBackend, SandboxRequest};
use codeheal_core::{KnowledgeBase, LocalSandbox, SuccessPattern};
use codeheal_storage::fakes::MemoryKnowledgeStore;
use codeheal_storage::KnowledgeStore;

/// The sandbox's isolation levels carry distinct resource profiles and
/// side-effect sets even though the test battery itself is deterministic
/// over patch length, not isolation level.
#[tokio::test]
async fn sandbox_isolation_levels_are_distinguishable() {
    let sandbox = LocalSandbox::new();
    let request = |isolation| SandboxRequest {
        patch_content: "abcdefgh".to_string(),
        isolation,
        resource_limits: Default::default(),
    };

    let full = sandbox.execute(&request(IsolationLevel::Full)).await.unwrap();
    let none = sandbox.execute(&request(IsolationLevel::None)).await.unwrap();

    assert_eq!(full.tests.len(), 5);
    assert!(full.side_effects.is_empty());
    assert!(none.side_effects.contains(&"potential_system_impact".to_string()));
    assert!(full.execution_time_ms > none.execution_time_ms);
}

/// S5 — a knowledge base seeded with three patterns clustered under
/// `RES002:{requests,pandas,numpy}` plus one unrelated `RES001:file-missing`
/// pattern. Querying with a cluster id that matches none of the stored
/// clusters falls through to the error-code level, which does match all
/// three `RES002` patterns. (The query API returns ranked patterns, not a
/// separate fallback-level tag, so the assertion checks the level it
/// actually fell through to by construction: no cluster hit, but every
/// returned pattern shares the queried error code.)
#[tokio::test]
async fn s5_knowledge_base_falls_back_from_cluster_to_error_code() {
    let store = Arc::new(MemoryKnowledgeStore::new());
    let mut kb = KnowledgeBase::new(20, store);

    for (id, lib) in [("p1", "requests"), ("p2", "pandas"), ("p3", "numpy")] {
        kb.record_success(SuccessPattern::new(
            id,
            "RES002",
            Some(format!("RES002:{lib}")),
            "resolution",
            format!("pinned {lib} import"),
            format!("- import {lib}\n+ import {lib} ==1.0"),
            0.9,
        ))
        .await
        .unwrap();
    }
    kb.record_success(SuccessPattern::new(
        "p4",
        "RES001",
        Some("RES001:file-missing".to_string()),
        "resolution",
        "created the missing file",
        "+ touch missing.txt",
        0.9,
    ))
    .await
    .unwrap();

    let results = kb
        .query(Some("RES002:newlib"), "RES002", "resolution", 0.0, 5)
        .await
        .unwrap();

    assert!(results.len() >= 3);
    assert!(results.iter().all(|p| p.error_code == "RES002"));
}

/// S6 — a long-lived, heavily-reused pattern survives a nuclear garbage
/// collection pass via the protection rule (`success_count >= 10`), even
/// though nuclear would otherwise drop anything under 5 successes.
#[tokio::test]
async fn s6_garbage_collection_protects_heavily_reused_patterns() {
    let store = MemoryKnowledgeStore::new();
    let mut pattern = SuccessPattern::new(
        "winner",
        "RES002",
        Some("RES002:requests".to_string()),
        "resolution",
        "pinned requests import",
        "- import requests\n+ import requests ==2.31",
        0.9,
    );
    for _ in 0..14 {
        pattern.record_success(0.9, pattern.last_success_at + Duration::days(1));
    }
    let mut winner = pattern.to_record();
    winner.stored_at = Utc::now() - Duration::days(730);
    store.put_pattern(winner).await.unwrap();

    let kb = KnowledgeBase::new(20, Arc::new(store));
    let policy = CompactionPolicy {
        strategy: CompactionStrategy::Nuclear,
        max_age_days: 90,
        max_entries: 5_000,
    };
    let result = kb.compact(&policy).await.unwrap();

    assert_eq!(result.removed_count, 0);
    assert_eq!(result.remaining_count, 1);
    assert_eq!(result.protected_count, 1);
    assert!(!result.removed_ids.contains(&"winner".to_string()));
}

/// S7 — a pattern tagged `GOLD_STANDARD` survives nuclear GC purely on
/// its tag, even with a success count nuclear would otherwise sweep.
#[tokio::test]
async fn s7_garbage_collection_protects_gold_standard_tag() {
    let store = MemoryKnowledgeStore::new();
    let pattern = SuccessPattern::new(
        "gold",
        "SYN001",
        Some("SYN001:paren".to_string()),
        "syntax",
        "closed the missing paren",
        "- def x(: pass\n+ def x(): pass",
        0.95,
    );
    assert!(pattern.tags.contains(&"GOLD_STANDARD".to_string()));
    assert_eq!(pattern.success_count, 1);
    let record = pattern.to_record();
    store.put_pattern(record).await.unwrap();

    let kb = KnowledgeBase::new(20, Arc::new(store));
    let policy = CompactionPolicy {
        strategy: CompactionStrategy::Nuclear,
        max_age_days: 90,
        max_entries: 5_000,
    };
    let result = kb.compact(&policy).await.unwrap();

    assert_eq!(result.removed_count, 0);
    assert_eq!(result.protected_count, 1);
}
