use crate::*;

async fn set_hobby(client: &mut Client, hobby: Option<&str>) -> Result<()> {
    client
        .send(json!({ "type": "set-hobby-preference", "data": hobby }))
        .await
}

#[tokio::test]
async fn shared_hobby_peers_are_matched() -> Result<()> {
    let server = spawn_server().await?;
    let mut a = Client::connect_located(&server, "198.51.100.1").await?;
    let mut b = Client::connect_located(&server, "198.51.100.2").await?;

    set_hobby(&mut a, Some("music")).await?;
    set_hobby(&mut b, Some("music")).await?;
    a.send_type("find-match").await?;
    a.expect("waiting-for-match").await?;
    b.send_type("find-match").await?;

    let found_b = b.expect("match-found").await?;
    let found_a = a.expect("match-found").await?;
    assert_eq!(found_a["data"]["sessionId"], found_b["data"]["sessionId"]);

    let partner = &found_a["data"]["partner"];
    assert_eq!(partner["hobby"], "music");
    assert_eq!(partner["country"], "Germany");
    assert_eq!(partner["countryCode"], "DE");
    assert_eq!(partner["city"], "Berlin");
    assert_eq!(partner["locationFlag"], "🇩🇪");
    assert!(partner.get("ip").is_none());

    let stats = get_json(&server, "/chat/stats").await?;
    assert_eq!(stats["activeUsers"], 2);
    assert_eq!(stats["waitingUsers"], 0);
    assert_eq!(stats["activeSessions"], 1);
    Ok(())
}

#[tokio::test]
async fn unset_hobby_matches_anyone() -> Result<()> {
    let server = spawn_server().await?;
    let mut a = Client::connect(&server, "198.51.100.1").await?;
    let mut b = Client::connect(&server, "198.51.100.2").await?;

    set_hobby(&mut b, Some("music")).await?;
    a.send_type("find-match").await?;
    a.expect("waiting-for-match").await?;
    b.send_type("find-match").await?;

    let found_b = b.expect("match-found").await?;
    let found_a = a.expect("match-found").await?;
    assert_eq!(found_a["data"]["partner"]["hobby"], "music");
    assert!(found_b["data"]["partner"]["hobby"].is_null());
    Ok(())
}

#[tokio::test]
async fn different_hobbies_both_wait() -> Result<()> {
    let server = spawn_server().await?;
    let mut a = Client::connect(&server, "198.51.100.1").await?;
    let mut b = Client::connect(&server, "198.51.100.2").await?;
    let mut c = Client::connect(&server, "198.51.100.3").await?;

    set_hobby(&mut a, Some("music")).await?;
    set_hobby(&mut b, Some("chess")).await?;
    a.send_type("find-match").await?;
    a.expect("waiting-for-match").await?;
    b.send_type("find-match").await?;
    b.expect("waiting-for-match").await?;

    // No preference: first compatible waiter in queue order wins.
    c.send_type("find-match").await?;
    c.expect("match-found").await?;
    let found_a = a.expect("match-found").await?;
    assert!(found_a["data"]["partner"]["hobby"].is_null());
    b.expect_silence(200).await?;

    let stats = get_json(&server, "/chat/stats").await?;
    assert_eq!(stats["waitingUsers"], 1);
    Ok(())
}

#[tokio::test]
async fn peers_behind_one_address_are_never_paired() -> Result<()> {
    let server = spawn_server().await?;
    let mut a = Client::connect(&server, "203.0.113.7").await?;
    let mut b = Client::connect(&server, "203.0.113.7").await?;

    a.send_type("find-match").await?;
    a.expect("waiting-for-match").await?;
    b.send_type("find-match").await?;
    b.expect("waiting-for-match").await?;

    let mut c = Client::connect(&server, "203.0.113.8").await?;
    c.send_type("find-match").await?;
    c.expect("match-found").await?;
    a.expect("match-found").await?;
    b.expect_silence(200).await?;
    Ok(())
}

#[tokio::test]
async fn next_stranger_while_waiting_keeps_one_queue_slot() -> Result<()> {
    let server = spawn_server().await?;
    let mut a = Client::connect(&server, "198.51.100.1").await?;

    a.send_type("find-match").await?;
    a.expect("waiting-for-match").await?;
    a.send_type("next-stranger").await?;
    a.expect("waiting-for-match").await?;

    let stats = get_json(&server, "/chat/stats").await?;
    assert_eq!(stats["waitingUsers"], 1);
    assert_eq!(stats["activeSessions"], 0);
    Ok(())
}

#[tokio::test]
async fn next_stranger_in_session_releases_partner() -> Result<()> {
    let server = spawn_server().await?;
    let (mut a, mut b, _) = matched_pair(&server).await?;

    a.send_type("next-stranger").await?;
    b.expect("partner-disconnected").await?;
    a.expect("waiting-for-match").await?;

    // The old partner is free to search again and nothing blocks them.
    b.send_type("find-match").await?;
    b.expect("match-found").await?;
    a.expect("match-found").await?;
    Ok(())
}

#[tokio::test]
async fn find_match_inside_session_is_rejected() -> Result<()> {
    let server = spawn_server().await?;
    let (mut a, mut b, _) = matched_pair(&server).await?;

    a.send_type("find-match").await?;
    let error = a.expect("error").await?;
    assert!(error["data"]["message"].as_str().is_some());
    b.expect_silence(200).await?;

    let stats = get_json(&server, "/chat/stats").await?;
    assert_eq!(stats["activeSessions"], 1);
    assert_eq!(stats["waitingUsers"], 0);
    Ok(())
}

#[tokio::test]
async fn disconnect_notifies_partner_and_cleans_up() -> Result<()> {
    let server = spawn_server().await?;
    let (a, mut b, _) = matched_pair(&server).await?;

    a.close().await?;
    b.expect("partner-disconnected").await?;
    eventually(&server, |s| s.active_users == 1 && s.active_sessions == 0).await?;
    Ok(())
}

#[tokio::test]
async fn disconnect_while_waiting_leaves_queue() -> Result<()> {
    let server = spawn_server().await?;
    let mut a = Client::connect(&server, "198.51.100.1").await?;
    a.send_type("find-match").await?;
    a.expect("waiting-for-match").await?;

    a.close().await?;
    eventually(&server, |s| s.active_users == 0 && s.waiting_users == 0).await?;

    let mut b = Client::connect(&server, "198.51.100.2").await?;
    b.send_type("find-match").await?;
    b.expect("waiting-for-match").await?;
    Ok(())
}

#[tokio::test]
async fn invalid_hobby_is_reported_back() -> Result<()> {
    let server = spawn_server().await?;
    let mut a = Client::connect(&server, "198.51.100.1").await?;

    set_hobby(&mut a, Some("music!!")).await?;
    a.expect("error").await?;

    // Connection survives the rejected command.
    a.send_type("find-match").await?;
    a.expect("waiting-for-match").await?;
    Ok(())
}

#[tokio::test]
async fn unparseable_frames_get_an_error() -> Result<()> {
    let server = spawn_server().await?;
    let mut a = Client::connect(&server, "198.51.100.1").await?;

    a.send_raw("not json").await?;
    let error = a.expect("error").await?;
    assert_eq!(error["data"]["message"], "invalid message");

    a.send(json!({ "type": "teleport" })).await?;
    a.expect("error").await?;

    a.send_type("find-match").await?;
    a.expect("waiting-for-match").await?;
    Ok(())
}
