#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use chrono::Duration;
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;
use switchboard_core::{Clock, ManualClock, Message, SequentialIds, UuidIds};
use switchboard_memory::{SessionError, SessionStore};

const WINDOW_SECS: i64 = 3600;

fn store_with_clock() -> (SessionStore, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let store = SessionStore::new(
        clock.clone(),
        Arc::new(SequentialIds::new("p")),
        Duration::seconds(WINDOW_SECS),
    );
    (store, clock)
}

proptest! {
    #[test]
    fn appended_messages_come_back_in_order(contents in prop::collection::vec("[a-z ]{0,16}", 1..20)) {
        let (store, clock) = store_with_clock();
        let id = store.create().unwrap().session_id;

        for content in &contents {
            store.append(&id, Message::user(content.clone(), clock.now())).unwrap();
            let history = store.get_history(&id).unwrap();
            prop_assert_eq!(&history.last().unwrap().content, content);
        }

        let history: Vec<String> = store
            .get_history(&id)
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        prop_assert_eq!(history, contents);
    }

    #[test]
    fn expiry_follows_the_sliding_window(gaps in prop::collection::vec(0i64..(2 * WINDOW_SECS), 1..10)) {
        let (store, clock) = store_with_clock();
        let id = store.create().unwrap().session_id;

        for gap in gaps {
            clock.advance(Duration::seconds(gap));
            let result = store.get_history(&id);
            if gap > WINDOW_SECS {
                prop_assert_eq!(result, Err(SessionError::Expired(id.clone())));
                return Ok(());
            }
            prop_assert!(result.is_ok());
        }
    }
}

#[test]
fn concurrent_appends_are_not_lost() {
    let store = Arc::new(SessionStore::new(
        Arc::new(ManualClock::default()),
        Arc::new(UuidIds),
        Duration::seconds(WINDOW_SECS),
    ));
    let id = store.create().unwrap().session_id;

    let mut handles = vec![];
    for i in 0..10 {
        let store = Arc::clone(&store);
        let id = id.clone();
        handles.push(thread::spawn(move || {
            for j in 0..20 {
                let msg = Message::user(format!("{i}-{j}"), chrono::Utc::now());
                store.append(&id, msg).unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let history = store.get_history(&id).unwrap();
    assert_eq!(history.len(), 200);

    // Per-writer order survives interleaving.
    for i in 0..10 {
        let own: Vec<_> = history
            .iter()
            .filter(|m| m.content.starts_with(&format!("{i}-")))
            .map(|m| m.content.clone())
            .collect();
        let expected: Vec<_> = (0..20).map(|j| format!("{i}-{j}")).collect();
        assert_eq!(own, expected);
    }
}

#[test]
fn sessions_are_isolated() {
    let (store, clock) = store_with_clock();
    let a = store.create().unwrap().session_id;
    let b = store.create().unwrap().session_id;

    store.append(&a, Message::user("for a", clock.now())).unwrap();
    assert_eq!(store.get_history(&a).unwrap().len(), 1);
    assert!(store.get_history(&b).unwrap().is_empty());

    store.delete(&a);
    assert!(store.get_history(&b).is_ok());
}
