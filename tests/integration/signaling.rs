use crate::*;

#[tokio::test]
async fn offer_answer_and_candidates_reach_the_partner() -> Result<()> {
    let server = spawn_server().await?;
    let (mut a, mut b, _) = matched_pair(&server).await?;

    let sdp = json!({ "type": "offer", "sdp": "v=0\r\no=- 1 2 IN IP4 127.0.0.1" });
    a.send(json!({ "type": "offer", "data": sdp })).await?;
    let offer = b.expect("offer").await?;
    assert_eq!(offer["data"]["sdp"], sdp["sdp"]);
    let a_id = offer["data"]["from"].as_str().context("offer without sender")?.to_string();

    b.send(json!({ "type": "answer", "data": { "type": "answer", "sdp": "v=0" } }))
        .await?;
    let answer = a.expect("answer").await?;
    assert_eq!(answer["data"]["sdp"], "v=0");
    let b_id = answer["data"]["from"].as_str().context("answer without sender")?;
    assert_ne!(a_id, b_id);

    a.send(json!({
        "type": "ice-candidate",
        "data": { "candidate": "candidate:1 1 udp 2122260223 10.0.0.1 54321 typ host", "sdpMid": "0" }
    }))
    .await?;
    let candidate = b.expect("ice-candidate").await?;
    assert_eq!(candidate["data"]["sdpMid"], "0");
    assert_eq!(candidate["data"]["from"], a_id.as_str());
    Ok(())
}

#[tokio::test]
async fn forged_sender_is_overwritten() -> Result<()> {
    let server = spawn_server().await?;
    let (mut a, mut b, _) = matched_pair(&server).await?;

    a.send(json!({ "type": "offer", "data": { "sdp": "x" } })).await?;
    let genuine = b.expect("offer").await?["data"]["from"].clone();

    a.send(json!({ "type": "offer", "data": { "sdp": "y", "from": "someone-else" } }))
        .await?;
    let forged = b.expect("offer").await?;
    assert_eq!(forged["data"]["from"], genuine);
    assert_eq!(forged["data"]["sdp"], "y");
    Ok(())
}

#[tokio::test]
async fn signals_outside_a_session_are_dropped() -> Result<()> {
    let server = spawn_server().await?;
    let mut a = Client::connect(&server, "198.51.100.1").await?;
    let mut b = Client::connect(&server, "198.51.100.2").await?;

    a.send(json!({ "type": "offer", "data": { "sdp": "x" } })).await?;
    a.expect_silence(200).await?;
    b.expect_silence(200).await?;
    Ok(())
}

#[tokio::test]
async fn signals_after_partner_left_are_dropped() -> Result<()> {
    let server = spawn_server().await?;
    let (mut a, b, _) = matched_pair(&server).await?;

    b.close().await?;
    a.expect("partner-disconnected").await?;
    a.send(json!({ "type": "ice-candidate", "data": { "candidate": "c" } }))
        .await?;
    a.expect_silence(200).await?;
    Ok(())
}
