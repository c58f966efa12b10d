// Conversation Store tests
// These cover the merge of the two unordered message sources: dedup by id,
// the non-decreasing created_at invariant, and stale-history discard.

mod common;
use common::{message, ts};

use parley::chat::conversation::ConversationStore;

#[test]
fn test_duplicate_ids_collapse_to_one_entry() {
    let mut store = ConversationStore::new();
    store.select(2);

    // History fetch delivers the message first...
    store.append(message(10, 2, 1, "hello", 5));
    // ...then the push echo of the same message arrives late
    store.append(message(10, 2, 1, "hello", 5));

    assert_eq!(store.messages().len(), 1);
    assert_eq!(store.messages()[0].id, 10);
}

#[test]
fn test_dedup_across_replace_and_append() {
    let mut store = ConversationStore::new();
    store.select(2);

    // A push event wins the race against the history fetch
    store.append(message(11, 2, 1, "early echo", 7));

    // The fetch then resolves, containing the same message
    store.replace(
        2,
        vec![
            message(10, 1, 2, "first", 3),
            message(11, 2, 1, "early echo", 7),
        ],
    );

    assert_eq!(store.messages().len(), 2);
    assert_eq!(store.messages()[0].id, 10);
    assert_eq!(store.messages()[1].id, 11);
}

#[test]
fn test_created_at_is_non_decreasing_after_any_mutation() {
    let mut store = ConversationStore::new();
    store.select(5);

    // Deliberately out of send order
    store.append(message(3, 5, 1, "third", 30));
    store.append(message(1, 5, 1, "first", 10));
    store.append(message(4, 1, 5, "fourth", 40));
    store.append(message(2, 1, 5, "second", 20));

    let stamps: Vec<_> = store.messages().iter().map(|m| m.created_at).collect();
    let mut sorted = stamps.clone();
    sorted.sort();
    assert_eq!(stamps, sorted, "created_at must be non-decreasing");
}

#[test]
fn test_equal_timestamps_keep_arrival_order() {
    let mut store = ConversationStore::new();
    store.select(5);

    store.append(message(1, 5, 1, "a", 10));
    store.append(message(2, 5, 1, "b", 10));
    store.append(message(3, 5, 1, "c", 10));

    let ids: Vec<i64> = store.messages().iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(store.messages().iter().all(|m| m.created_at == ts(10)));
}

#[test]
fn test_stale_history_is_discarded() {
    let mut store = ConversationStore::new();

    // Select peer A, then switch to peer B before A's fetch resolves
    store.select(1);
    store.select(2);

    // A's late response must not touch the displayed conversation
    store.replace(1, vec![message(50, 1, 9, "stale", 1)]);
    assert!(store.messages().is_empty());
    assert_eq!(store.active_peer(), Some(2));

    // B's response applies normally
    store.replace(2, vec![message(60, 2, 9, "fresh", 2)]);
    assert_eq!(store.messages().len(), 1);
    assert_eq!(store.messages()[0].id, 60);
}

#[test]
fn test_switching_contacts_discards_prior_sequence() {
    let mut store = ConversationStore::new();
    store.select(1);
    store.append(message(1, 1, 9, "old conversation", 1));
    assert_eq!(store.messages().len(), 1);

    store.select(2);
    assert!(store.messages().is_empty());

    store.clear_selection();
    assert_eq!(store.active_peer(), None);
}

#[test]
fn test_replace_without_selection_is_a_no_op() {
    let mut store = ConversationStore::new();
    store.replace(1, vec![message(1, 1, 9, "nobody asked", 1)]);
    assert!(store.messages().is_empty());
}
