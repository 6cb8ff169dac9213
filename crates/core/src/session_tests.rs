use super::*;
use crate::mode::SynchronizationMode;

fn sample() -> Session {
    Session::new(
        "alpha:/data",
        "beta@host:/data",
        Configuration {
            mode: Some(SynchronizationMode::TwoWayResolved),
        },
        1_000,
    )
}

#[test]
fn new_session_is_not_paused_and_has_valid_identifier() {
    let session = sample();
    assert!(!session.paused);
    assert!(session.identifier.has_valid_prefix());
}

#[test]
fn effective_mode_uses_configuration_when_set() {
    let session = sample();
    assert_eq!(session.effective_mode(), SynchronizationMode::TwoWayResolved);
}

#[test]
fn effective_mode_defaults_to_two_way_safe() {
    let session = Session::new("a", "b", Configuration::default(), 0);
    assert_eq!(session.effective_mode(), SynchronizationMode::TwoWaySafe);
}

#[test]
fn paused_setter_flips_field() {
    let session = sample().paused(true);
    assert!(session.paused);
}

#[test]
fn name_setter_accepts_into_string() {
    let session = sample().name("my-session");
    assert_eq!(session.name, "my-session");
}

#[test]
fn roundtrips_through_json() {
    let session = sample();
    let json = serde_json::to_string(&session).unwrap();
    let decoded: Session = serde_json::from_str(&json).unwrap();
    assert_eq!(session, decoded);
}
