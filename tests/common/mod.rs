// Common test utilities for integration tests
// Shared message/contact builders used across the test files

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};

use parley::models::{Contact, Message};

/// Timestamp helper: a fixed base day plus an offset in seconds, so tests
/// can express relative ordering without touching the wall clock.
pub fn ts(offset_secs: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
        + chrono::Duration::seconds(i64::from(offset_secs))
}

pub fn message(id: i64, sender_id: i64, receiver_id: i64, content: &str, at_secs: u32) -> Message {
    Message {
        id,
        sender_id,
        receiver_id,
        content: content.to_string(),
        created_at: ts(at_secs),
        is_read: false,
    }
}

pub fn contact(id: i64, display_name: &str) -> Contact {
    Contact::new(id, display_name, None)
}

/// A chat_message push frame, exactly as the server would send it.
pub fn chat_frame(id: i64, sender_id: i64, receiver_id: i64, content: &str, at_secs: u32) -> String {
    format!(
        r#"{{"type":"chat_message","id":{},"sender_id":{},"receiver_id":{},"content":"{}","created_at":"{}","is_read":false}}"#,
        id,
        sender_id,
        receiver_id,
        content,
        ts(at_secs).format("%Y-%m-%dT%H:%M:%S")
    )
}

pub fn presence_frame(online_ids: &[i64]) -> String {
    let ids: Vec<String> = online_ids.iter().map(|id| id.to_string()).collect();
    format!(r#"{{"type":"presence","online_ids":[{}]}}"#, ids.join(","))
}

pub fn typing_frame(sender_id: i64, is_typing: bool) -> String {
    format!(
        r#"{{"type":"typing","sender_id":{},"is_typing":{}}}"#,
        sender_id, is_typing
    )
}
