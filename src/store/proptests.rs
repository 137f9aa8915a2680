//! Property-based tests for the store reducer

use super::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Add,
    /// Delete the conversation at this index (modulo length), or an unknown id when empty
    Delete(usize),
    DeleteUnknown,
    Update(usize, String),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Add),
        2 => any::<usize>().prop_map(Op::Delete),
        1 => Just(Op::DeleteUnknown),
        2 => (any::<usize>(), "[a-zA-Z ]{1,20}").prop_map(|(i, t)| Op::Update(i, t)),
    ]
}

fn pick(state: &StoreState, index: usize) -> Option<String> {
    if state.conversations.is_empty() {
        None
    } else {
        Some(state.conversations[index % state.conversations.len()].id.clone())
    }
}

proptest! {
    /// The active pointer is empty exactly when nothing was ever added or the
    /// active conversation was deleted since the last add.
    #[test]
    fn prop_active_pointer_null_iff_cleared(ops in proptest::collection::vec(arb_op(), 0..40)) {
        let mut state = StoreState::default();
        let mut cleared = true;

        for op in ops {
            match op {
                Op::Add => {
                    state = reduce(&state, StoreAction::Add(Conversation::untitled()));
                    cleared = false;
                }
                Op::Delete(i) => {
                    if let Some(id) = pick(&state, i) {
                        if state.current_conversation_id.as_deref() == Some(id.as_str()) {
                            cleared = true;
                        }
                        state = reduce(&state, StoreAction::Delete(id));
                    }
                }
                Op::DeleteUnknown => {
                    let before = state.clone();
                    state = reduce(&state, StoreAction::Delete("no-such-id".into()));
                    prop_assert_eq!(&state, &before);
                }
                Op::Update(i, title) => {
                    if let Some(id) = pick(&state, i) {
                        state = reduce(&state, StoreAction::Update {
                            id,
                            patch: ConversationPatch { title: Some(title), updated_at: None },
                        });
                    }
                }
            }

            prop_assert_eq!(state.current_conversation_id.is_none(), cleared);
            if state.conversations.is_empty() {
                prop_assert!(state.current_conversation_id.is_none());
            }
            if let Some(id) = &state.current_conversation_id {
                prop_assert!(state.get(id).is_some());
            }
        }
    }

    /// Add always puts the conversation first and makes it active.
    #[test]
    fn prop_add_is_first_and_active(
        existing in 0usize..6,
        title in "[a-zA-Z ]{1,20}",
    ) {
        let mut state = StoreState::default();
        for _ in 0..existing {
            state = reduce(&state, StoreAction::Add(Conversation::untitled()));
        }
        let conv = Conversation::new(title);
        let after = reduce(&state, StoreAction::Add(conv.clone()));

        prop_assert_eq!(&after.conversations[0], &conv);
        prop_assert_eq!(after.current_conversation_id.as_deref(), Some(conv.id.as_str()));
        prop_assert_eq!(after.conversations.len(), existing + 1);
        prop_assert_eq!(&after.conversations[1..], &state.conversations[..]);
    }

    /// Update never changes ids, order or the active pointer.
    #[test]
    fn prop_update_preserves_identity(count in 1usize..6, target in any::<usize>(), title in "[a-z]{1,10}") {
        let mut state = StoreState::default();
        for _ in 0..count {
            state = reduce(&state, StoreAction::Add(Conversation::untitled()));
        }
        let id = pick(&state, target).unwrap();
        let after = reduce(&state, StoreAction::Update {
            id: id.clone(),
            patch: ConversationPatch::retitle(title.clone()),
        });

        let before_ids: Vec<_> = state.conversations.iter().map(|c| &c.id).collect();
        let after_ids: Vec<_> = after.conversations.iter().map(|c| &c.id).collect();
        prop_assert_eq!(before_ids, after_ids);
        prop_assert_eq!(&after.current_conversation_id, &state.current_conversation_id);
        prop_assert_eq!(&after.get(&id).unwrap().title, &title);
    }
}
