//! End-to-end routing scenarios
//!
//! These tests drive the router through its public API only: route a
//! classified message, observe the disposition, then resolve, withdraw or
//! tick the SLA clock forward.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;

use escalation_engine::integration::{AgentAssignment, ExecutiveNotice};
use escalation_engine::prelude::*;

fn agent(
    id: &str,
    specialty: AgentSpecialty,
    languages: &[&str],
    tier: SupportTier,
    cap: u32,
) -> HumanAgent {
    HumanAgent::new(id, id, specialty, languages, tier, cap)
}

/// English-speaking generalist
fn general(id: &str, tier: SupportTier, cap: u32) -> HumanAgent {
    agent(id, AgentSpecialty::GeneralSupport, &["en"], tier, cap)
}

fn message(case: &str, text: &str, confidence: f64) -> ClassifiedMessage {
    ClassifiedMessage::new(case, "user-1", text, confidence, "en")
}

async fn router_with(config: EscalationConfig) -> Arc<EscalationRouter> {
    EscalationRouter::new(config).await.unwrap()
}

/// Notifier that keeps everything it was asked to send
#[derive(Default)]
struct RecordingNotifier {
    agents: Mutex<Vec<(AgentId, CaseId)>>,
    users: Mutex<Vec<(CaseId, UserNotice)>>,
    executives: Mutex<Vec<ExecutiveNotice>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_agent(&self, agent_id: &AgentId, assignment: &AgentAssignment) -> Result<()> {
        self.agents.lock().push((agent_id.clone(), assignment.case_id.clone()));
        Ok(())
    }

    async fn notify_user(&self, case_id: &CaseId, notice: &UserNotice) -> Result<()> {
        self.users.lock().push((case_id.clone(), notice.clone()));
        Ok(())
    }

    async fn notify_executive(&self, notice: &ExecutiveNotice) -> Result<()> {
        self.executives.lock().push(notice.clone());
        Ok(())
    }
}

#[tokio::test]
async fn test_black_emergency_breach_pages_executives() {
    let notifier = Arc::new(RecordingNotifier::default());
    let router = EscalationRouter::with_collaborators(
        EscalationConfig::default(),
        notifier.clone(),
        Arc::new(InMemoryEscalationStore::new()),
        None,
    )
    .await
    .unwrap();

    let outcome = router
        .route(&message("vip-1", "My account was HACKED, funds gone", 0.15), SupportTier::Black)
        .await
        .unwrap();

    assert!(outcome.escalated);
    assert_eq!(outcome.priority.value(), 5);
    assert_eq!(outcome.reason, Some(EscalationReason::EmergencyDetected));
    assert_eq!(outcome.disposition, Disposition::Queued);
    assert_eq!(outcome.queue_position, Some(1));
    assert_eq!(outcome.estimated_response_seconds, Some(60));

    let later = Utc::now() + Duration::seconds(61);
    let breached = router.check_sla_at(later, TickScope::BlackOnly);
    assert_eq!(breached.len(), 1);
    assert!(breached[0].breached);

    // a second tick does not flag the same record twice
    assert!(router.check_sla_at(later, TickScope::All).is_empty());

    assert_eq!(router.events().count(EventKind::SlaBreach), 1);
    assert_eq!(router.events().count(EventKind::ExecutiveAlert), 1);
    let status = router.get_sla_status_at(later);
    let black = status.tier(SupportTier::Black).unwrap();
    assert_eq!(black.breach_count, 1);
    assert_eq!(black.open_breached, 1);

    router.shutdown().await.unwrap();
    let executives = notifier.executives.lock();
    assert_eq!(executives.len(), 1);
    assert_eq!(executives[0].case_id, CaseId::from("vip-1"));
    assert_eq!(executives[0].target_seconds, 60);
}

#[tokio::test]
async fn test_standard_tick_ignores_black() {
    let router = router_with(EscalationConfig::default()).await;
    router
        .route(&message("vip-2", "where is my withdrawal", 0.2), SupportTier::Black)
        .await
        .unwrap();

    let later = Utc::now() + Duration::seconds(120);
    assert!(router.check_sla_at(later, TickScope::StandardTiers).is_empty());
    assert_eq!(router.check_sla_at(later, TickScope::BlackOnly).len(), 1);
}

#[tokio::test]
async fn test_confident_pro_answer_is_auto_resolved() {
    let router = router_with(EscalationConfig::default()).await;
    router
        .register_agent(general("pro-1", SupportTier::Pro, 2))
        .unwrap();

    let outcome = router
        .route(&message("c-1", "what are your trading fees", 0.9), SupportTier::Pro)
        .await
        .unwrap();

    assert_eq!(outcome.disposition, Disposition::AutoResolved);
    assert!(!outcome.escalated);
    assert_eq!(outcome.reason, None);
    assert_eq!(outcome.estimated_response_seconds, None);
    assert_eq!(router.case_state(&CaseId::from("c-1")), Some(CaseState::AutoResolved));
    assert_eq!(router.active_case_count(), 0);
    assert_eq!(router.queue_stats(SupportTier::Pro).size, 0);
    assert_eq!(router.agent_load(&AgentId::from("pro-1")), Some(0));
    assert_eq!(router.get_analytics().auto_resolved, 1);
}

#[tokio::test]
async fn test_tier_threshold_decides_escalation() {
    let router = router_with(EscalationConfig::default()).await;

    let pro = router
        .route(&message("p-1", "how do I reset 2fa", 0.6), SupportTier::Pro)
        .await
        .unwrap();
    assert!(!pro.escalated);

    let elite = router
        .route(&message("e-1", "how do I reset 2fa", 0.6), SupportTier::Elite)
        .await
        .unwrap();
    assert!(elite.escalated);
    assert_eq!(elite.reason, Some(EscalationReason::LowConfidence));
    assert_eq!(elite.priority.value(), 4);
}

#[tokio::test]
async fn test_queued_elite_case_goes_to_released_agent() {
    let router = router_with(EscalationConfig::default()).await;
    let elite = AgentId::from("elite-1");
    router
        .register_agent(general("elite-1", SupportTier::Elite, 1))
        .unwrap();

    let first = router
        .route(&message("e-1", "deposit not showing", 0.6), SupportTier::Elite)
        .await
        .unwrap();
    assert_eq!(first.disposition, Disposition::Assigned);
    assert_eq!(first.agent_id, Some(elite.clone()));
    assert_eq!(first.estimated_response_seconds, Some(0));

    let second = router
        .route(&message("e-2", "deposit not showing", 0.6), SupportTier::Elite)
        .await
        .unwrap();
    assert_eq!(second.disposition, Disposition::Queued);
    assert_eq!(second.queue_position, Some(1));
    assert_eq!(second.estimated_response_seconds, Some(120));

    let closed = router.release_agent(&elite).unwrap();
    assert_eq!(closed, Some(CaseId::from("e-1")));
    assert_eq!(router.case_state(&CaseId::from("e-1")), Some(CaseState::Resolved));
    assert_eq!(router.case_state(&CaseId::from("e-2")), Some(CaseState::Assigned));
    assert_eq!(router.case_info(&CaseId::from("e-2")).unwrap().agent_id, Some(elite.clone()));
    assert_eq!(router.agent_load(&elite), Some(1));
    assert_eq!(router.queue_stats(SupportTier::Elite).size, 0);
}

#[tokio::test]
async fn test_higher_tier_drains_first() {
    let router = router_with(EscalationConfig::default()).await;

    let lite = router
        .route(&message("lite-1", "help", 0.1), SupportTier::Lite)
        .await
        .unwrap();
    let black = router
        .route(&message("black-1", "help", 0.1), SupportTier::Black)
        .await
        .unwrap();
    assert_eq!(lite.disposition, Disposition::Queued);
    assert_eq!(black.disposition, Disposition::Queued);

    router
        .register_agent(general("any-1", SupportTier::Black, 1))
        .unwrap();

    assert_eq!(router.case_state(&CaseId::from("black-1")), Some(CaseState::Assigned));
    assert_eq!(router.case_state(&CaseId::from("lite-1")), Some(CaseState::Queued));
}

#[tokio::test]
async fn test_clearance_is_a_ceiling() {
    let router = router_with(EscalationConfig::default()).await;
    router
        .register_agent(general("pro-1", SupportTier::Pro, 3))
        .unwrap();

    let black = router
        .route(&message("b-1", "help", 0.1), SupportTier::Black)
        .await
        .unwrap();
    assert_eq!(black.disposition, Disposition::Queued);

    let lite = router
        .route(&message("l-1", "help", 0.1), SupportTier::Lite)
        .await
        .unwrap();
    assert_eq!(lite.disposition, Disposition::Assigned);
}

#[tokio::test]
async fn test_specialty_and_language_matching() {
    let router = router_with(EscalationConfig::default()).await;
    router
        .register_agent(general("gen", SupportTier::Elite, 3))
        .unwrap();
    router
        .register_agent(agent(
            "deriv",
            AgentSpecialty::DerivativesExpert,
            &["en"],
            SupportTier::Elite,
            3,
        ))
        .unwrap();
    router
        .register_agent(agent("es", AgentSpecialty::GeneralSupport, &["es"], SupportTier::Elite, 3))
        .unwrap();

    let complex = router
        .route(
            &message("d-1", "liquidation price on my perp", 0.3).with_category("derivatives"),
            SupportTier::Elite,
        )
        .await
        .unwrap();
    assert_eq!(complex.reason, Some(EscalationReason::ComplexQuery));
    assert_eq!(complex.agent_id, Some(AgentId::from("deriv")));

    // es-MX falls back to a same-family speaker
    let mexican = ClassifiedMessage::new("m-1", "user-2", "no puedo retirar", 0.3, "es_MX");
    let outcome = router.route(&mexican, SupportTier::Elite).await.unwrap();
    assert_eq!(outcome.agent_id, Some(AgentId::from("es")));

    // emergencies need an exact speaker
    let portuguese = ClassifiedMessage::new("pt-1", "user-3", "fraude na conta", 0.3, "pt-BR");
    let outcome = router.route(&portuguese, SupportTier::Elite).await.unwrap();
    assert_eq!(outcome.reason, Some(EscalationReason::EmergencyDetected));
    assert_eq!(outcome.disposition, Disposition::Queued);
}

#[tokio::test]
async fn test_hundred_and_first_case_is_deferred() {
    let router = router_with(EscalationConfig::default()).await;

    for i in 0..100 {
        let outcome = router
            .route(&message(&format!("lite-{}", i), "help", 0.1), SupportTier::Lite)
            .await
            .unwrap();
        assert_eq!(outcome.disposition, Disposition::Queued);
    }
    assert_eq!(router.queue_stats(SupportTier::Lite).size, 100);

    let overflow = router
        .route(&message("lite-100", "help", 0.1), SupportTier::Lite)
        .await
        .unwrap();
    assert_eq!(overflow.disposition, Disposition::ServiceUnavailable);
    assert!(overflow.escalated);
    assert!(overflow.retry_scheduled);
    assert!(!overflow.queued);
    assert_eq!(router.case_state(&CaseId::from("lite-100")), Some(CaseState::Deferred));
    assert_eq!(router.queue_stats(SupportTier::Lite).size, 100);
    assert_eq!(router.events().count(EventKind::QueueOverflow), 1);

    // other tiers are unaffected
    let pro = router
        .route(&message("pro-0", "help", 0.1), SupportTier::Pro)
        .await
        .unwrap();
    assert_eq!(pro.disposition, Disposition::Queued);
}

#[tokio::test]
async fn test_backlog_overflow_drops_and_refills() {
    let mut config = EscalationConfig::default();
    config.queues.max_queue_size = 2;
    config.queues.deferred_backlog_size = 1;
    let router = router_with(config).await;

    for i in 1..=2 {
        let outcome = router
            .route(&message(&format!("c{}", i), "help", 0.1), SupportTier::Lite)
            .await
            .unwrap();
        assert_eq!(outcome.disposition, Disposition::Queued);
    }
    let deferred = router
        .route(&message("c3", "help", 0.1), SupportTier::Lite)
        .await
        .unwrap();
    assert!(deferred.retry_scheduled);
    assert_eq!(deferred.estimated_response_seconds, Some(7200));

    let dropped = router
        .route(&message("c4", "help", 0.1), SupportTier::Lite)
        .await
        .unwrap();
    assert_eq!(dropped.disposition, Disposition::ServiceUnavailable);
    assert!(!dropped.retry_scheduled);
    assert_eq!(dropped.estimated_response_seconds, None);
    assert_eq!(router.case_state(&CaseId::from("c4")), Some(CaseState::Dropped));

    let report = router.get_analytics();
    assert_eq!(report.queue_overflows, 2);
    assert_eq!(report.service_unavailable, 2);
    assert_eq!(report.dropped, 1);

    router
        .register_agent(general("lite-agent", SupportTier::Lite, 1))
        .unwrap();

    assert_eq!(router.case_state(&CaseId::from("c1")), Some(CaseState::Assigned));
    assert_eq!(router.case_state(&CaseId::from("c3")), Some(CaseState::Queued));
    assert_eq!(router.queue_stats(SupportTier::Lite).size, 2);
    assert_eq!(router.deferred_count(SupportTier::Lite), 0);
}

#[tokio::test]
async fn test_deferred_case_promoted_when_breach_reassignment_frees_slot() {
    let mut config = EscalationConfig::default();
    config.queues.max_queue_size = 1;
    config.queues.deferred_backlog_size = 1;
    let router = router_with(config).await;
    router
        .register_agent(general("en-only", SupportTier::Elite, 1))
        .unwrap();

    let first = ClassifiedMessage::new("fr-1", "user-1", "je ne peux pas retirer", 0.3, "fr");
    let second = ClassifiedMessage::new("fr-2", "user-2", "je ne peux pas retirer", 0.3, "fr");
    assert_eq!(
        router.route(&first, SupportTier::Elite).await.unwrap().disposition,
        Disposition::Queued
    );
    let parked = router.route(&second, SupportTier::Elite).await.unwrap();
    assert_eq!(parked.disposition, Disposition::ServiceUnavailable);
    assert!(parked.retry_scheduled);

    let later = Utc::now() + Duration::seconds(301);
    assert_eq!(router.check_sla_at(later, TickScope::StandardTiers).len(), 2);
    assert_eq!(router.case_state(&CaseId::from("fr-1")), Some(CaseState::Assigned));
    assert_eq!(router.case_state(&CaseId::from("fr-2")), Some(CaseState::Queued));
    assert_eq!(router.deferred_count(SupportTier::Elite), 0);

    // the promoted case keeps its place ahead of newer traffic
    let newer = router
        .route(&message("new-1", "deposit missing", 0.3), SupportTier::Elite)
        .await
        .unwrap();
    assert_eq!(newer.disposition, Disposition::ServiceUnavailable);
    assert_eq!(router.case_state(&CaseId::from("new-1")), Some(CaseState::Deferred));
    assert_eq!(router.queue_stats(SupportTier::Elite).size, 1);
}

#[tokio::test]
async fn test_deferred_cases_keep_fifo_order_as_slots_free() {
    let mut config = EscalationConfig::default();
    config.queues.max_queue_size = 1;
    config.queues.deferred_backlog_size = 2;
    let router = router_with(config).await;

    for case in ["q-1", "d-1", "d-2"] {
        router.route(&message(case, "help", 0.1), SupportTier::Pro).await.unwrap();
    }
    assert_eq!(router.deferred_count(SupportTier::Pro), 2);

    router.withdraw_case(&CaseId::from("q-1")).unwrap();
    assert_eq!(router.case_state(&CaseId::from("d-1")), Some(CaseState::Queued));
    assert_eq!(router.case_state(&CaseId::from("d-2")), Some(CaseState::Deferred));

    // each freed slot goes to the oldest parked case, not to newer traffic
    router.withdraw_case(&CaseId::from("d-1")).unwrap();
    let newcomer = router
        .route(&message("late", "help", 0.1), SupportTier::Pro)
        .await
        .unwrap();
    assert_eq!(newcomer.disposition, Disposition::ServiceUnavailable);
    assert_eq!(router.case_state(&CaseId::from("d-2")), Some(CaseState::Queued));
    assert_eq!(router.case_state(&CaseId::from("late")), Some(CaseState::Deferred));
}

#[tokio::test]
async fn test_raising_capacity_takes_waiting_work() {
    let router = router_with(EscalationConfig::default()).await;
    let id = AgentId::from("grow");
    router.register_agent(general("grow", SupportTier::Pro, 1)).unwrap();

    router.route(&message("g-1", "help", 0.1), SupportTier::Pro).await.unwrap();
    router.route(&message("g-2", "help", 0.1), SupportTier::Pro).await.unwrap();
    assert_eq!(router.case_state(&CaseId::from("g-2")), Some(CaseState::Queued));

    router.update_agent(general("grow", SupportTier::Pro, 2)).unwrap();
    assert_eq!(router.case_state(&CaseId::from("g-2")), Some(CaseState::Assigned));
    assert_eq!(router.agent_load(&id), Some(2));
    assert_eq!(router.agent(&id).unwrap().max_concurrent_cases, 2);
    assert_eq!(router.total_agent_load(), router.assigned_escalations() as u64);

    assert!(matches!(
        router.update_agent(general("ghost", SupportTier::Pro, 1)),
        Err(EscalationError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_withdrawal_from_queue() {
    let router = router_with(EscalationConfig::default()).await;
    for case in ["w-1", "w-2", "w-3"] {
        router
            .route(&message(case, "help", 0.1), SupportTier::Pro)
            .await
            .unwrap();
    }

    router.withdraw_case(&CaseId::from("w-2")).unwrap();
    assert_eq!(router.case_state(&CaseId::from("w-2")), Some(CaseState::Withdrawn));
    assert_eq!(router.queue_stats(SupportTier::Pro).size, 2);
    assert_eq!(router.events().count(EventKind::CaseWithdrawn), 1);

    assert!(matches!(
        router.withdraw_case(&CaseId::from("w-2")),
        Err(EscalationError::InvalidTransition { .. })
    ));
    assert!(matches!(
        router.withdraw_case(&CaseId::from("nope")),
        Err(EscalationError::NotFound(_))
    ));

    let report = router.get_analytics();
    assert_eq!(report.by_tier[&SupportTier::Pro].withdrawals, 1);
}

#[tokio::test]
async fn test_withdrawing_assigned_case_frees_agent() {
    let router = router_with(EscalationConfig::default()).await;
    let id = AgentId::from("a-1");
    router
        .register_agent(general("a-1", SupportTier::Pro, 1))
        .unwrap();

    router.route(&message("x-1", "help", 0.1), SupportTier::Pro).await.unwrap();
    router.route(&message("x-2", "help", 0.1), SupportTier::Pro).await.unwrap();
    assert_eq!(router.case_state(&CaseId::from("x-2")), Some(CaseState::Queued));

    router.withdraw_case(&CaseId::from("x-1")).unwrap();
    assert_eq!(router.case_state(&CaseId::from("x-2")), Some(CaseState::Assigned));
    assert_eq!(router.agent_load(&id), Some(1));
}

#[tokio::test]
async fn test_resolution_rules() {
    let router = router_with(EscalationConfig::default()).await;
    let id = AgentId::from("r-1");
    router
        .register_agent(general("r-1", SupportTier::Black, 1))
        .unwrap();

    router.route(&message("r-case", "help", 0.1), SupportTier::Elite).await.unwrap();
    router.route(&message("q-case", "help", 0.1), SupportTier::Lite).await.unwrap();

    assert!(matches!(
        router.resolve_case(&CaseId::from("q-case"), None),
        Err(EscalationError::InvalidTransition { .. })
    ));
    assert!(matches!(
        router.resolve_case(&CaseId::from("ghost"), None),
        Err(EscalationError::NotFound(_))
    ));

    router.resolve_case(&CaseId::from("r-case"), Some(4.0)).unwrap();
    assert_eq!(router.case_state(&CaseId::from("q-case")), Some(CaseState::Assigned));

    let agent = router.agent(&id).unwrap();
    assert_eq!(agent.performance.total_cases_handled, 1);
    assert_eq!(agent.current_load, 1);

    let report = router.get_analytics();
    assert_eq!(report.by_tier[&SupportTier::Elite].resolutions, 1);
    assert_eq!(report.total_escalations, 2);
    assert_eq!(report.sla_compliance_rate, 1.0);
    assert!(matches!(
        router.release_agent(&AgentId::from("nobody")),
        Err(EscalationError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_breached_case_is_reassigned_across_languages() {
    let router = router_with(EscalationConfig::default()).await;
    router
        .register_agent(general("en-1", SupportTier::Elite, 1))
        .unwrap();

    let french = ClassifiedMessage::new("fr-1", "user-4", "je ne peux pas retirer", 0.3, "fr");
    let outcome = router.route(&french, SupportTier::Elite).await.unwrap();
    assert_eq!(outcome.disposition, Disposition::Queued);

    let later = Utc::now() + Duration::seconds(301);
    let breached = router.check_sla_at(later, TickScope::StandardTiers);
    assert_eq!(breached.len(), 1);
    assert_eq!(router.case_state(&CaseId::from("fr-1")), Some(CaseState::Assigned));
    assert_eq!(router.events().count(EventKind::BreachReassigned), 1);
    assert_eq!(router.queue_stats(SupportTier::Elite).size, 0);
}

#[tokio::test]
async fn test_unavailable_agent_is_skipped_until_back() {
    let router = router_with(EscalationConfig::default()).await;
    let id = AgentId::from("away");
    router
        .register_agent(general("away", SupportTier::Pro, 2))
        .unwrap();
    router.set_agent_available(&id, false).unwrap();

    let outcome = router.route(&message("u-1", "help", 0.1), SupportTier::Pro).await.unwrap();
    assert_eq!(outcome.disposition, Disposition::Queued);

    router.set_agent_available(&id, true).unwrap();
    assert_eq!(router.case_state(&CaseId::from("u-1")), Some(CaseState::Assigned));
}

#[tokio::test]
async fn test_rejected_input_leaves_no_trace() {
    let router = router_with(EscalationConfig::default()).await;

    assert!(matches!(
        router.route(&message("bad", "help", 1.5), SupportTier::Pro).await,
        Err(EscalationError::InvalidConfidence(_))
    ));
    assert!(matches!(
        router.route(&message("bad", "help", f64::NAN), SupportTier::Pro).await,
        Err(EscalationError::InvalidConfidence(_))
    ));
    assert_eq!(router.active_case_count(), 0);
    assert_eq!(router.case_state(&CaseId::from("bad")), None);

    router.route(&message("dup", "help", 0.1), SupportTier::Pro).await.unwrap();
    assert!(matches!(
        router.route(&message("dup", "help", 0.1), SupportTier::Pro).await,
        Err(EscalationError::AlreadyExists(_))
    ));
    assert_eq!(router.queue_stats(SupportTier::Pro).size, 1);
}

#[tokio::test]
async fn test_route_for_user_uses_directory() {
    let directory = Arc::new(InMemoryTierDirectory::new());
    directory.set_tier("whale", SupportTier::Black);
    let router = EscalationRouter::with_collaborators(
        EscalationConfig::default(),
        Arc::new(LoggingNotifier),
        Arc::new(InMemoryEscalationStore::new()),
        Some(directory as Arc<dyn TierDirectory>),
    )
    .await
    .unwrap();

    let whale = ClassifiedMessage::new("w-1", "whale", "help", 0.1, "en");
    let outcome = router.route_for_user(&whale).await.unwrap();
    assert_eq!(outcome.priority.value(), 5);

    let stranger = ClassifiedMessage::new("s-1", "stranger", "help", 0.1, "en");
    let outcome = router.route_for_user(&stranger).await.unwrap();
    assert_eq!(outcome.priority.value(), 2);
    assert_eq!(router.case_info(&CaseId::from("s-1")).unwrap().tier, SupportTier::Lite);

    let bare = router_with(EscalationConfig::default()).await;
    assert!(matches!(
        bare.route_for_user(&whale).await,
        Err(EscalationError::Configuration(_))
    ));
}

#[tokio::test]
async fn test_notifications_and_persistence_are_dispatched() {
    let notifier = Arc::new(RecordingNotifier::default());
    let path = std::env::temp_dir().join(format!("escalations-{}.jsonl", uuid::Uuid::new_v4()));
    let store = Arc::new(JsonlEscalationStore::new(&path));
    let router = EscalationRouter::with_collaborators(
        EscalationConfig::default(),
        notifier.clone(),
        store.clone(),
        None,
    )
    .await
    .unwrap();
    router
        .register_agent(general("n-1", SupportTier::Pro, 1))
        .unwrap();

    let outcome = router.route(&message("n-case", "help", 0.1), SupportTier::Pro).await.unwrap();
    let escalation_id = outcome.escalation_id.unwrap();
    router.resolve_case(&CaseId::from("n-case"), None).unwrap();
    router.shutdown().await.unwrap();

    assert_eq!(
        notifier.agents.lock().as_slice(),
        &[(AgentId::from("n-1"), CaseId::from("n-case"))]
    );
    let users = notifier.users.lock();
    assert!(matches!(users[0].1, UserNotice::AgentAssigned { .. }));
    assert_eq!(users.last().map(|(_, n)| n.clone()), Some(UserNotice::Resolved));

    let stored = store.get(&escalation_id).await.unwrap().unwrap();
    assert!(stored.resolved_at.is_some());
    assert_eq!(stored.assigned_agent_id, Some(AgentId::from("n-1")));
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_sla_loops_flag_breaches_on_their_own() {
    let mut config = EscalationConfig::default();
    config.tiers.policy_mut(SupportTier::Black).sla_target_seconds = 1;
    config.tiers.policy_mut(SupportTier::Elite).sla_target_seconds = 1;
    config.monitoring.black_check_interval_seconds = 1;
    config.monitoring.sla_check_interval_seconds = 60;
    let router = router_with(config).await;

    router.route(&message("vip", "help", 0.1), SupportTier::Black).await.unwrap();
    router.route(&message("elite", "help", 0.1), SupportTier::Elite).await.unwrap();

    router.start();
    router.start();
    tokio::time::sleep(std::time::Duration::from_millis(2500)).await;

    // only the fast Black loop has ticked past the deadline
    assert_eq!(router.events().count(EventKind::SlaBreach), 1);
    assert_eq!(router.events().count(EventKind::ExecutiveAlert), 1);
    let status = router.get_sla_status();
    assert_eq!(status.tier(SupportTier::Black).unwrap().breach_count, 1);
    assert_eq!(status.tier(SupportTier::Elite).unwrap().breach_count, 0);

    router.shutdown().await.unwrap();
}
