//! Posting, notification fan-out, summary format, and retrieval gating.

mod common;

use common::{start_server, TestClient};

/// Split a `NEW_MESSAGE <gid> <id>|<sender>|<ts>|<subject>` push into its
/// summary fields, returning (group, id, sender, timestamp, subject).
fn parse_new_message(line: &str) -> (String, String, String, String, String) {
    let rest = line
        .strip_prefix("NEW_MESSAGE ")
        .unwrap_or_else(|| panic!("not a NEW_MESSAGE push: {line}"));
    let (group, summary) = rest.split_once(' ').expect("missing summary");
    let parts: Vec<&str> = summary.splitn(4, '|').collect();
    assert_eq!(parts.len(), 4, "malformed summary: {summary}");
    (
        group.to_string(),
        parts[0].to_string(),
        parts[1].to_string(),
        parts[2].to_string(),
        parts[3].to_string(),
    )
}

async fn join_pair(addr: std::net::SocketAddr) -> (TestClient, TestClient) {
    let mut alice = TestClient::connect(addr).await;
    let mut bob = TestClient::connect(addr).await;
    alice.login("alice").await;
    bob.login("bob").await;
    alice.request("JOIN 1").await;
    alice.recv().await;
    bob.request("JOIN 1").await;
    bob.recv().await;
    alice.recv().await; // USER_JOINED 1 bob
    (alice, bob)
}

#[tokio::test]
async fn post_broadcasts_summary_and_content_is_retrievable() {
    let addr = start_server().await;
    let (mut alice, mut bob) = join_pair(addr).await;

    assert_eq!(alice.request("MESSAGE 1 Hello|World").await, "OK MESSAGE");

    let push = bob.recv().await;
    let (group, id, sender, timestamp, subject) = parse_new_message(&push);
    assert_eq!(group, "1");
    assert_eq!(sender, "alice");
    assert_eq!(subject, "Hello");
    // yyyy-MM-dd HH:mm:ss
    assert_eq!(timestamp.len(), 19);
    assert_eq!(&timestamp[4..5], "-");
    assert_eq!(&timestamp[10..11], " ");
    assert_eq!(&timestamp[13..14], ":");

    assert_eq!(bob.request(&format!("GET_MESSAGE {id}")).await, "World");
    assert_eq!(alice.request(&format!("GET_MESSAGE {id}")).await, "World");
}

#[tokio::test]
async fn post_without_pipe_defaults_the_subject() {
    let addr = start_server().await;
    let (mut alice, mut bob) = join_pair(addr).await;

    assert_eq!(alice.request("MESSAGE 1 just some text").await, "OK MESSAGE");

    let (_, id, _, _, subject) = parse_new_message(&bob.recv().await);
    assert_eq!(subject, "(no subject)");
    assert_eq!(
        bob.request(&format!("GET_MESSAGE {id}")).await,
        "just some text"
    );
}

#[tokio::test]
async fn empty_subject_before_pipe_defaults_too() {
    let addr = start_server().await;
    let (mut alice, mut bob) = join_pair(addr).await;

    assert_eq!(alice.request("MESSAGE 1 |body only").await, "OK MESSAGE");
    let (_, _, _, _, subject) = parse_new_message(&bob.recv().await);
    assert_eq!(subject, "(no subject)");
}

#[tokio::test]
async fn members_observe_posts_in_append_order() {
    let addr = start_server().await;
    let (mut alice, mut bob) = join_pair(addr).await;

    assert_eq!(alice.request("MESSAGE 1 first|body one").await, "OK MESSAGE");
    assert_eq!(alice.request("MESSAGE 1 second|body two").await, "OK MESSAGE");

    let (_, first_id, _, _, first_subject) = parse_new_message(&bob.recv().await);
    let (_, second_id, _, _, second_subject) = parse_new_message(&bob.recv().await);
    assert_eq!(first_subject, "first");
    assert_eq!(second_subject, "second");
    assert!(second_id.parse::<u64>().unwrap() > first_id.parse::<u64>().unwrap());

    // Retrieval never swaps content between the two.
    assert_eq!(bob.request(&format!("GET_MESSAGE {first_id}")).await, "body one");
    assert_eq!(bob.request(&format!("GET_MESSAGE {second_id}")).await, "body two");
}

#[tokio::test]
async fn retrieval_is_gated_by_group_membership() {
    let addr = start_server().await;
    let (mut alice, mut bob) = join_pair(addr).await;

    alice.request("MESSAGE 1 Hello|World").await;
    let (_, id, _, _, _) = parse_new_message(&bob.recv().await);

    // Carol is logged in but never joined group 1.
    let mut carol = TestClient::connect(addr).await;
    carol.login("carol").await;
    assert_eq!(
        carol.request(&format!("GET_MESSAGE {id}")).await,
        "ERR MESSAGE_NOT_FOUND"
    );

    // Membership in a different group does not help.
    carol.request("JOIN 2").await;
    carol.recv().await;
    assert_eq!(
        carol.request(&format!("GET_MESSAGE {id}")).await,
        "ERR MESSAGE_NOT_FOUND"
    );
}

#[tokio::test]
async fn post_and_retrieval_argument_errors() {
    let addr = start_server().await;
    let (mut alice, _bob) = join_pair(addr).await;

    assert_eq!(alice.request("MESSAGE 1").await, "ERR INVALID_FORMAT");
    assert_eq!(alice.request("MESSAGE 9 hi").await, "ERR GROUP_NOT_FOUND");
    assert_eq!(alice.request("MESSAGE 2 hi").await, "ERR NOT_MEMBER");
    assert_eq!(alice.request("GET_MESSAGE abc").await, "ERR INVALID_MESSAGE_ID");
    assert_eq!(alice.request("GET_MESSAGE 999").await, "ERR MESSAGE_NOT_FOUND");
}
