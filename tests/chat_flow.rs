//! End-to-end scenarios for the chat flow: a session store on the
//! in-memory backend, driven by hand-fed stream events.

use tokio::sync::mpsc;

use parley::assembler::{Turn, TurnStatus};
use parley::gateway::StreamEvent;
use parley::session::{Role, SessionStore};
use parley::storage::MemoryBackend;

fn memory_store() -> SessionStore {
    SessionStore::load(Box::new(MemoryBackend::new()))
}

/// Start a turn for the active conversation after posting `input`.
fn begin_turn(store: &mut SessionStore, input: &str) -> (Turn, mpsc::Sender<StreamEvent>) {
    let id = store.post_user_message(input).unwrap();
    let prior = store.conversation(id).unwrap().messages.clone();
    let (tx, rx) = mpsc::channel(16);
    (Turn::new(id, prior, rx), tx)
}

#[test]
fn hello_streams_into_a_titled_conversation() {
    let mut store = memory_store();
    assert!(store.conversations().is_empty());

    let (mut turn, tx) = begin_turn(&mut store, "Hello");

    for delta in ["H", "i", " there"] {
        tx.try_send(StreamEvent::Delta(delta.to_string())).unwrap();
    }
    tx.try_send(StreamEvent::Done).unwrap();

    assert_eq!(turn.poll(&mut store).unwrap(), TurnStatus::Finished);

    let conversation = store.active_conversation().unwrap();
    assert_eq!(conversation.title, "Hello");
    assert_eq!(conversation.messages.len(), 2);
    assert_eq!(conversation.messages[0].role, Role::User);
    assert_eq!(conversation.messages[0].content, "Hello");
    assert_eq!(conversation.messages[1].role, Role::Assistant);
    assert_eq!(conversation.messages[1].content, "Hi there");
}

#[test]
fn each_delta_replaces_the_trailing_assistant_message() {
    let mut store = memory_store();
    let (mut turn, tx) = begin_turn(&mut store, "Hello");
    let id = turn.conversation_id();

    tx.try_send(StreamEvent::Delta("Hi".to_string())).unwrap();
    assert_eq!(turn.poll(&mut store).unwrap(), TurnStatus::Streaming);
    assert_eq!(store.conversation(id).unwrap().messages[1].content, "Hi");

    tx.try_send(StreamEvent::Delta(" there".to_string())).unwrap();
    assert_eq!(turn.poll(&mut store).unwrap(), TurnStatus::Streaming);

    let messages = &store.conversation(id).unwrap().messages;
    // Still one assistant message, grown, not a second one appended.
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "Hi there");
}

#[test]
fn failed_request_leaves_only_the_user_message() {
    let mut store = memory_store();
    let (mut turn, tx) = begin_turn(&mut store, "Hello");

    tx.try_send(StreamEvent::Failed("gateway returned 500".to_string()))
        .unwrap();

    match turn.poll(&mut store).unwrap() {
        TurnStatus::Failed(reason) => assert_eq!(reason, "gateway returned 500"),
        other => panic!("expected Failed, got {other:?}"),
    }

    let conversation = store.active_conversation().unwrap();
    assert_eq!(conversation.messages.len(), 1);
    assert_eq!(conversation.messages[0].role, Role::User);
}

#[test]
fn mid_stream_failure_keeps_partial_content() {
    let mut store = memory_store();
    let (mut turn, tx) = begin_turn(&mut store, "Hello");

    tx.try_send(StreamEvent::Delta("Hi th".to_string())).unwrap();
    tx.try_send(StreamEvent::Failed("connection reset".to_string()))
        .unwrap();

    assert!(matches!(
        turn.poll(&mut store).unwrap(),
        TurnStatus::Failed(_)
    ));

    // Whatever streamed before the failure stays visible.
    let conversation = store.active_conversation().unwrap();
    assert_eq!(conversation.messages.len(), 2);
    assert_eq!(conversation.messages[1].content, "Hi th");
}

#[test]
fn dropped_stream_counts_as_finished() {
    let mut store = memory_store();
    let (mut turn, tx) = begin_turn(&mut store, "Hello");

    tx.try_send(StreamEvent::Delta("Hi there".to_string())).unwrap();
    drop(tx);

    assert_eq!(turn.poll(&mut store).unwrap(), TurnStatus::Finished);
    let conversation = store.active_conversation().unwrap();
    assert_eq!(conversation.messages[1].content, "Hi there");
}

#[test]
fn streaming_into_one_conversation_leaves_others_untouched() {
    let mut store = memory_store();

    store.post_user_message("second thread opener").unwrap();
    let second_id = store.active_id().unwrap();

    let first_id = store.create_conversation().unwrap();
    assert!(store.select_conversation(first_id));

    let (mut turn, tx) = begin_turn(&mut store, "Hello");
    tx.try_send(StreamEvent::Delta("Hi there".to_string())).unwrap();
    tx.try_send(StreamEvent::Done).unwrap();
    assert_eq!(turn.poll(&mut store).unwrap(), TurnStatus::Finished);

    let second = store.conversation(second_id).unwrap();
    assert_eq!(second.messages.len(), 1);
    assert_eq!(second.messages[0].content, "second thread opener");
    assert_eq!(second.title, "second thread opener");
}

#[test]
fn session_survives_a_restart() {
    let backend = MemoryBackend::new();

    {
        let mut store = SessionStore::load(Box::new(backend.clone()));
        let (mut turn, tx) = begin_turn(&mut store, "Hello");
        tx.try_send(StreamEvent::Delta("Hi there".to_string())).unwrap();
        tx.try_send(StreamEvent::Done).unwrap();
        turn.poll(&mut store).unwrap();
    }

    let reloaded = SessionStore::load(Box::new(backend));
    let conversation = reloaded.active_conversation().unwrap();
    assert_eq!(conversation.title, "Hello");
    assert_eq!(conversation.messages.len(), 2);
    assert_eq!(conversation.messages[1].content, "Hi there");
}
