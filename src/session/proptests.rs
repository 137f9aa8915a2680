//! Property-based tests for the session state machine

use super::state::*;
use super::transition::*;
use super::*;
use crate::input::Attachment;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_status() -> impl Strategy<Value = SessionStatus> {
    prop_oneof![
        Just(SessionStatus::Idle),
        Just(SessionStatus::Submitted),
        Just(SessionStatus::Streaming),
    ]
}

fn arb_message() -> impl Strategy<Value = Message> {
    (any::<bool>(), "[a-zA-Z ]{0,20}").prop_map(|(user, text)| Message {
        id: "m".into(),
        role: if user { Role::User } else { Role::Assistant },
        parts: vec![Part::Text { text }],
    })
}

fn arb_session() -> impl Strategy<Value = Session> {
    (
        proptest::option::of("[a-z0-9]{4}"),
        proptest::collection::vec(arb_message(), 0..5),
        arb_status(),
        0u64..100,
    )
        .prop_map(|(conversation_id, messages, status, generation)| Session {
            conversation_id,
            messages,
            status,
            generation,
            last_error: None,
        })
}

fn arb_attachments() -> impl Strategy<Value = Vec<Attachment>> {
    proptest::collection::vec(
        prop_oneof![
            Just(Attachment::image(b"png")),
            Just(Attachment::audio(b"wav")),
        ],
        0..3,
    )
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Rebinding always yields an empty idle session for the new id
    #[test]
    fn prop_rebind_resets_transcript(
        session in arb_session(),
        target in proptest::option::of("[a-z0-9]{4}"),
    ) {
        let result = transition(&session, Event::Rebind { conversation_id: target.clone() }).unwrap();
        prop_assert!(result.new_state.messages.is_empty());
        prop_assert_eq!(result.new_state.status, SessionStatus::Idle);
        prop_assert_eq!(result.new_state.conversation_id, target);
        prop_assert!(result.new_state.generation > session.generation);

        let cancels = result.effects.iter().any(|e| matches!(e, Effect::CancelRequest { .. }));
        prop_assert_eq!(cancels, session.status.is_busy());
    }

    /// Whitespace-only text without attachments never changes anything
    #[test]
    fn prop_blank_submit_rejected(session in arb_session(), blank in "[ \t\n]{0,6}") {
        let result = transition(&session, Event::Submit {
            message_id: "u".into(),
            text: blank,
            attachments: vec![],
        });
        prop_assert!(result.is_err());
    }

    /// Submit succeeds only from idle, and then appends exactly one message
    #[test]
    fn prop_submit_appends_one_message(
        session in arb_session(),
        text in "[a-zA-Z ]{0,40}",
        attachments in arb_attachments(),
    ) {
        let attachment_count = attachments.len();
        let sendable = !text.trim().is_empty() || attachment_count > 0;
        let result = transition(&session, Event::Submit {
            message_id: "u".into(),
            text,
            attachments,
        });

        match result {
            Ok(result) => {
                prop_assert!(sendable);
                prop_assert_eq!(session.status, SessionStatus::Idle);
                prop_assert_eq!(result.new_state.messages.len(), session.messages.len() + 1);
                prop_assert_eq!(result.new_state.status, SessionStatus::Submitted);
                let last = result.new_state.messages.last().unwrap();
                prop_assert_eq!(last.file_count(), attachment_count);
            }
            Err(TransitionError::Busy) => prop_assert!(session.status.is_busy()),
            Err(TransitionError::EmptyMessage) => prop_assert!(!sendable),
            Err(e) => prop_assert!(false, "unexpected error {e}"),
        }
    }

    /// Stream events tagged with another generation are always stale
    #[test]
    fn prop_other_generation_is_stale(session in arb_session(), offset in 1u64..10) {
        let generation = session.generation + offset;
        for event in [
            Event::StreamStarted { generation, message_id: "a".into() },
            Event::TextDelta { generation, message_id: "a".into(), delta: "x".into() },
            Event::StreamFinished { generation },
            Event::StreamFailed { generation, message: "boom".into() },
        ] {
            prop_assert_eq!(transition(&session, event).unwrap_err(), TransitionError::StaleEvent);
        }
    }

    /// Streamed deltas concatenate in arrival order
    #[test]
    fn prop_deltas_concatenate_in_order(deltas in proptest::collection::vec("[a-z ]{0,8}", 1..10)) {
        let start = Session::new(Some("c".into()), 1);
        let mut state = transition(&start, Event::Submit {
            message_id: "u".into(),
            text: "hi".into(),
            attachments: vec![],
        })
        .unwrap()
        .new_state;
        let generation = state.generation;

        for delta in &deltas {
            state = transition(&state, Event::TextDelta {
                generation,
                message_id: "a".into(),
                delta: delta.clone(),
            })
            .unwrap()
            .new_state;
        }

        prop_assert_eq!(state.messages.len(), 2);
        prop_assert_eq!(state.messages[1].text(), deltas.concat());
    }
}
