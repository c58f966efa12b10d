// Contact Directory tests
// Presence snapshot semantics, unread flags, and the derived contact list
// (ordering and search filtering).

mod common;
use common::{contact, ts};

use parley::chat::contacts::ContactDirectory;

#[test]
fn test_presence_is_a_full_replace() {
    let mut directory = ContactDirectory::new();
    directory.load_snapshot(vec![contact(3, "Trois"), contact(7, "Sept"), contact(9, "Neuf")]);

    directory.apply_presence(&[3, 7]);
    assert!(directory.get(3).unwrap().online);
    assert!(directory.get(7).unwrap().online);
    assert!(!directory.get(9).unwrap().online);

    // The next snapshot omits 3: implicitly offline now
    directory.apply_presence(&[7]);
    assert!(!directory.get(3).unwrap().online);
    assert!(directory.get(7).unwrap().online);
}

#[test]
fn test_empty_presence_snapshot_marks_everyone_offline() {
    let mut directory = ContactDirectory::new();
    directory.load_snapshot(vec![contact(1, "Un"), contact(2, "Deux")]);
    directory.apply_presence(&[1, 2]);

    directory.apply_presence(&[]);
    assert!(!directory.get(1).unwrap().online);
    assert!(!directory.get(2).unwrap().online);
}

#[test]
fn test_unread_set_and_cleared() {
    let mut directory = ContactDirectory::new();
    directory.load_snapshot(vec![contact(42, "Answer"), contact(9, "Nine")]);

    // Message from 42 while 9's conversation is open
    directory.set_unread(42, true);
    assert!(directory.get(42).unwrap().unread);
    assert!(!directory.get(9).unwrap().unread);

    // Selecting 42 afterwards clears it
    directory.mark_read(42);
    assert!(!directory.get(42).unwrap().unread);
}

#[test]
fn test_preview_is_independent_of_read_state() {
    let mut directory = ContactDirectory::new();
    directory.load_snapshot(vec![contact(5, "Cinq")]);

    directory.update_preview(5, "salut", ts(100));
    let c = directory.get(5).unwrap();
    assert_eq!(c.last_message_preview.as_deref(), Some("salut"));
    assert_eq!(c.last_message_at, Some(ts(100)));
    assert!(!c.unread);
}

#[test]
fn test_visible_sorts_by_recency_with_no_message_contacts_last() {
    let mut directory = ContactDirectory::new();
    directory.load_snapshot(vec![
        contact(1, "Alice"),
        contact(2, "Bob"),
        contact(3, "Carol"),
        contact(4, "Dave"),
    ]);

    directory.update_preview(2, "older", ts(10));
    directory.update_preview(4, "newest", ts(50));

    let ids: Vec<i64> = directory.visible("").iter().map(|c| c.id).collect();
    // Messaged contacts newest-first, then the rest in snapshot order
    assert_eq!(ids, vec![4, 2, 1, 3]);
}

#[test]
fn test_visible_keeps_snapshot_order_among_ties() {
    let mut directory = ContactDirectory::new();
    directory.load_snapshot(vec![
        contact(10, "Premier"),
        contact(20, "Deuxieme"),
        contact(30, "Troisieme"),
    ]);

    // Same timestamp for everyone: stable sort must keep snapshot order
    directory.update_preview(10, "x", ts(5));
    directory.update_preview(20, "y", ts(5));
    directory.update_preview(30, "z", ts(5));

    let ids: Vec<i64> = directory.visible("").iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![10, 20, 30]);
}

#[test]
fn test_visible_filters_case_insensitively() {
    let mut directory = ContactDirectory::new();
    directory.load_snapshot(vec![
        contact(1, "Alice Martin"),
        contact(2, "Bob Martin"),
        contact(3, "Carol Dupont"),
    ]);

    let ids: Vec<i64> = directory.visible("martin").iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1, 2]);

    let ids: Vec<i64> = directory.visible("ALICE").iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1]);

    assert!(directory.visible("nobody").is_empty());
}

#[test]
fn test_visible_never_mutates_the_underlying_set() {
    let mut directory = ContactDirectory::new();
    directory.load_snapshot(vec![contact(1, "Alice"), contact(2, "Bob")]);
    directory.update_preview(2, "bump", ts(9));

    let _ = directory.visible("");
    let _ = directory.visible("alice");

    // Underlying storage still answers by id, untouched by the derived views
    assert_eq!(directory.len(), 2);
    assert_eq!(directory.get(1).unwrap().display_name, "Alice");
    assert_eq!(directory.get(2).unwrap().last_message_preview.as_deref(), Some("bump"));
}
