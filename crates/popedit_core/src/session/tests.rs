use super::*;
use crate::provider::FormState;
use crate::registry::ActiveChange;
use crate::scheduler::{StableTick, TokioStable};
use std::time::Duration;

struct Harness {
    form: Arc<FormState<String>>,
    registry: Arc<SessionRegistry>,
    tick: StableTick,
}

impl Harness {
    fn new(initial: &str) -> Self {
        Self {
            form: Arc::new(FormState::new(initial.to_string())),
            registry: Arc::new(SessionRegistry::new()),
            tick: StableTick::new(),
        }
    }

    fn open(&self) -> EditSession<String> {
        EditSession::new(self.form.clone(), self.registry.clone()).expect("open session")
    }

    fn open_with(&self, policy: ResetPolicy) -> EditSession<String> {
        EditSession::with_policy(self.form.clone(), self.registry.clone(), policy)
            .expect("open session")
    }

    fn value(&self) -> String {
        self.form.current_value()
    }

    fn set(&self, value: &str) {
        self.form.set_value(value.to_string());
    }
}

#[test]
fn construction_registers_session_as_active() {
    let harness = Harness::new("foo");
    let session = harness.open();

    assert!(session.is_active().expect("is_active"));
    assert_eq!(
        harness.registry.active().expect("active").as_ref(),
        Some(session.id())
    );
    assert_eq!(session.phase(), SessionPhase::Constructed);
    assert_eq!(session.revert_value(), None);
    assert_eq!(harness.form.applied_count(), 0, "construction must not touch the form");
}

#[test]
fn newer_session_supersedes_without_disposing_older_one() {
    let harness = Harness::new("foo");
    let first = harness.open();
    let second = harness.open();

    assert!(!first.is_active().expect("first active"));
    assert!(second.is_active().expect("second active"));
    assert_eq!(first.phase(), SessionPhase::Constructed);
    first.blur().expect("superseded session is still usable");
}

#[test]
fn reset_before_snapshot_is_a_precondition_failure() {
    let harness = Harness::new("foo");
    let session = harness.open();

    assert_eq!(session.reset(None), Err(EditError::RevertValueUnset));
    assert_eq!(harness.value(), "foo");
}

#[test]
fn init_waits_for_stabilization() {
    let harness = Harness::new("foo");
    let session = harness.open();
    session.init(None, &harness.tick).expect("init");

    assert_eq!(session.phase(), SessionPhase::Initializing);
    assert_eq!(session.revert_value(), None);

    assert_eq!(harness.tick.stabilize(), 1);
    assert_eq!(session.phase(), SessionPhase::Open);
    assert_eq!(session.revert_value().as_deref(), Some("foo"));
}

#[test]
fn bare_reset_restores_snapshot_from_init() {
    let harness = Harness::new("foo");
    let session = harness.open();
    session.init(None, &harness.tick).expect("init");
    harness.tick.stabilize();

    harness.set("bar");
    session.reset(None).expect("reset");
    assert_eq!(harness.value(), "foo");
}

#[test]
fn init_restores_previous_value_but_keeps_pristine_snapshot() {
    let harness = Harness::new("foo");
    let session = harness.open();
    session
        .init(Some("baz".to_string()), &harness.tick)
        .expect("init");
    assert_eq!(harness.value(), "foo", "restore waits for stabilization");

    harness.tick.stabilize();
    assert_eq!(harness.value(), "baz");
    assert_eq!(session.revert_value().as_deref(), Some("foo"));

    session.reset(None).expect("reset");
    assert_eq!(harness.value(), "foo");
}

#[test]
fn init_twice_is_rejected() {
    let harness = Harness::new("foo");
    let session = harness.open();
    session.init(None, &harness.tick).expect("first init");

    let err = session
        .init(None, &harness.tick)
        .expect_err("second init must fail");
    assert!(matches!(err, EditError::AlreadyInitialized(_)));
    assert_eq!(harness.tick.pending(), 1);
}

#[test]
fn dispose_before_stabilization_discards_init() {
    let harness = Harness::new("foo");
    let session = harness.open();
    session
        .init(Some("baz".to_string()), &harness.tick)
        .expect("init");
    session.dispose().expect("dispose");

    assert_eq!(harness.tick.stabilize(), 0);
    assert_eq!(harness.value(), "foo");
    assert_eq!(session.revert_value(), None);
}

#[test]
fn update_revert_value_moves_the_snapshot() {
    let harness = Harness::new("foo");
    let session = harness.open();
    session.init(None, &harness.tick).expect("init");
    harness.tick.stabilize();

    harness.set("checkpoint");
    session.update_revert_value().expect("checkpoint");
    harness.set("scratch");
    session.reset(None).expect("reset");
    assert_eq!(harness.value(), "checkpoint");
}

#[test]
fn explicit_reset_value_wins_over_snapshot() {
    let harness = Harness::new("foo");
    let session = harness.open();
    session.init(None, &harness.tick).expect("init");
    harness.tick.stabilize();

    session.reset(Some("qux".to_string())).expect("reset");
    assert_eq!(harness.value(), "qux");
    assert_eq!(session.revert_value().as_deref(), Some("foo"));
}

#[test]
fn default_policy_treats_blank_reset_value_as_absent() {
    let harness = Harness::new("foo");
    let session = harness.open();
    assert_eq!(session.policy(), ResetPolicy::BlankIsAbsent);
    session.init(None, &harness.tick).expect("init");
    harness.tick.stabilize();
    harness.set("bar");

    session.reset(Some(String::new())).expect("reset");
    assert_eq!(harness.value(), "foo");
}

#[test]
fn explicit_only_policy_honors_blank_reset_value() {
    let harness = Harness::new("foo");
    let session = harness.open_with(ResetPolicy::ExplicitOnly);
    session.init(None, &harness.tick).expect("init");
    harness.tick.stabilize();
    harness.set("bar");

    session.reset(Some(String::new())).expect("reset");
    assert_eq!(harness.value(), "");
}

#[test]
fn blank_previous_value_is_not_restored_under_default_policy() {
    let harness = Harness::new("foo");
    let session = harness.open();
    session
        .init(Some(String::new()), &harness.tick)
        .expect("init");
    harness.tick.stabilize();

    assert_eq!(harness.value(), "foo");
    assert_eq!(harness.form.applied_count(), 0);
}

#[test]
fn is_valid_passes_provider_validity_through() {
    let harness = Harness::new("");
    let session = harness.open();
    assert_eq!(session.is_valid(), None);

    harness.form.set_validator(|value| !value.is_empty());
    assert_eq!(session.is_valid(), Some(false));
    harness.set("ok");
    assert_eq!(session.is_valid(), Some(true));
}

#[test]
fn blur_emits_once_per_call() {
    let harness = Harness::new("foo");
    let session = harness.open();
    let blurs = session.blurs();

    session.blur().expect("blur");
    session.blur().expect("blur");
    assert_eq!(blurs.drain().len(), 2);
    assert_eq!(session.revert_value(), None);
    assert_eq!(harness.form.applied_count(), 0);
}

#[test]
fn close_pushes_marker_without_tearing_down() {
    let harness = Harness::new("foo");
    let session = harness.open();
    let changes = harness.registry.changes();
    let finals = session.final_values();

    session.close().expect("close");

    assert_eq!(changes.drain(), vec![ActiveChange::Closed]);
    assert_eq!(session.phase(), SessionPhase::CloseRequested);
    assert!(session.is_active().expect("is_active"));
    assert!(finals.try_next().is_none());
    assert!(!finals.is_completed());
}

#[test]
fn dispose_publishes_live_value_once_then_completes() {
    let harness = Harness::new("foo");
    let session = harness.open();
    session.init(None, &harness.tick).expect("init");
    harness.tick.stabilize();
    let early = session.final_values();
    let blurs = session.blurs();

    harness.set("x");
    session.dispose().expect("dispose");
    let late = session.final_values();

    assert_eq!(early.drain(), vec!["x".to_string()]);
    assert!(early.is_completed());
    assert!(late.drain().is_empty());
    assert!(late.is_completed());
    assert!(blurs.is_completed());
    assert!(!session.is_active().expect("is_active"));
    assert_eq!(session.phase(), SessionPhase::Disposed);
}

#[test]
fn repeated_dispose_is_a_no_op() {
    let harness = Harness::new("foo");
    let session = harness.open();
    let finals = session.final_values();

    session.dispose().expect("first dispose");
    session.dispose().expect("second dispose");
    assert_eq!(finals.drain().len(), 1);
}

#[test]
fn disposing_superseded_session_keeps_newer_one_active() {
    let harness = Harness::new("foo");
    let first = harness.open();
    let second = harness.open();

    first.dispose().expect("dispose first");
    assert!(second.is_active().expect("second active"));
    assert_eq!(
        harness.registry.active().expect("active").as_ref(),
        Some(second.id())
    );
}

#[test]
fn operations_after_dispose_fail_without_side_effects() {
    let harness = Harness::new("foo");
    let session = harness.open();
    session.init(None, &harness.tick).expect("init");
    harness.tick.stabilize();
    session.dispose().expect("dispose");
    let changes = harness.registry.changes();
    harness.set("bar");

    assert!(matches!(session.blur(), Err(EditError::Disposed(_))));
    assert!(matches!(session.close(), Err(EditError::Disposed(_))));
    assert!(matches!(session.reset(None), Err(EditError::Disposed(_))));
    assert!(matches!(
        session.update_revert_value(),
        Err(EditError::Disposed(_))
    ));
    assert!(matches!(
        session.init(None, &harness.tick),
        Err(EditError::Disposed(_))
    ));
    assert!(changes.drain().is_empty());
    assert_eq!(harness.value(), "bar");
}

#[test]
fn dropping_undisposed_session_still_tears_down() {
    let harness = Harness::new("foo");
    let session = harness.open();
    let finals = session.final_values();
    harness.set("kept");

    drop(session);

    assert_eq!(finals.drain(), vec!["kept".to_string()]);
    assert!(finals.is_completed());
    assert_eq!(harness.registry.active().expect("active"), None);
}

#[test]
fn session_ids_are_unique() {
    let harness = Harness::new("foo");
    let first = harness.open();
    let second = harness.open();
    assert_ne!(first.id(), second.id());
    assert!(first.id().as_str().starts_with("edit-"));
}

#[tokio::test]
async fn tokio_scheduler_drives_init() {
    let harness = Harness::new("foo");
    let session = harness.open();
    let scheduler = TokioStable::current().expect("inside runtime");
    session
        .init(Some("baz".to_string()), &scheduler)
        .expect("init");

    for _ in 0..20 {
        if session.phase() == SessionPhase::Open {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(session.phase(), SessionPhase::Open);
    assert_eq!(harness.value(), "baz");
    assert_eq!(session.revert_value().as_deref(), Some("foo"));
    session.dispose().expect("dispose");
}
