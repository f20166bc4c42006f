use crate::*;

#[tokio::test]
async fn health_is_served_outside_the_api_prefix() -> Result<()> {
    let server = spawn_server().await?;
    let health: Value = reqwest::get(format!("http://{}/health", server.addr))
        .await?
        .error_for_status()?
        .json()
        .await?;
    assert_eq!(health["status"], "OK");
    assert_eq!(health["environment"], "test");
    assert!(health["timestamp"].as_u64().is_some_and(|t| t > 0));
    Ok(())
}

#[tokio::test]
async fn location_lookup_uses_client_address() -> Result<()> {
    let server = spawn_server().await?;
    let location = get_json(&server, "/chat/location").await?;
    assert_eq!(location["country"], "Germany");
    assert_eq!(location["countryCode"], "DE");
    Ok(())
}

#[tokio::test]
async fn connection_test_reports_server_time() -> Result<()> {
    let server = spawn_server().await?;
    let probe = get_json(&server, "/chat/test-connection").await?;
    assert_eq!(probe["webRtcSupported"], true);
    assert!(probe["serverTime"].as_u64().is_some());
    Ok(())
}

#[tokio::test]
async fn status_sessions_and_blocks_reflect_the_coordinator() -> Result<()> {
    let server = spawn_server().await?;
    let (_a, _b, session) = matched_pair(&server).await?;

    let status = get_json(&server, "/status").await?;
    assert_eq!(status["activeUsers"], 2);
    assert_eq!(status["activeSessions"], 1);
    assert_eq!(status["blockTtlSecs"], 600);
    assert_eq!(status["geolocationEnabled"], true);

    let sessions = get_json(&server, "/sessions").await?;
    let sessions = sessions["sessions"].as_array().context("sessions list")?;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["id"], session);

    let blocks = get_json(&server, "/blocks").await?;
    assert_eq!(blocks["blocks"], json!([]));
    Ok(())
}

#[tokio::test]
async fn report_submission_is_validated() -> Result<()> {
    let server = spawn_server().await?;
    let ip = "192.0.2.10";

    let (status, body) = post_json(
        &server,
        "/report",
        ip,
        json!({ "reportedUserId": "peer-42", "reason": "spam", "description": "link farm" }),
    )
    .await?;
    assert_eq!(status, 201);
    let body: Value = serde_json::from_str(&body)?;
    assert_eq!(body["message"], "Report submitted successfully");
    assert!(body["reportId"].as_str().is_some_and(|id| !id.is_empty()));

    let (status, _) = post_json(&server, "/report", ip, json!({ "reportedUserId": "peer-42", "reason": "rudeness" })).await?;
    assert_eq!(status, 400);

    let (status, _) = post_json(&server, "/report", ip, json!({ "reason": "spam" })).await?;
    assert_eq!(status, 400);

    let long = "x".repeat(501);
    let (status, _) = post_json(
        &server,
        "/report",
        ip,
        json!({ "reportedUserId": "peer-42", "reason": "other", "description": long }),
    )
    .await?;
    assert_eq!(status, 400);

    // Out-of-session reports are counted but never block anyone.
    let stats = get_json(&server, "/report/stats").await?;
    assert_eq!(stats["totalReports"], 1);
    assert_eq!(stats["byReason"]["spam"], 1);
    assert_eq!(get_json(&server, "/blocks").await?["blocks"], json!([]));
    Ok(())
}

#[tokio::test]
async fn malformed_report_bodies_are_bad_requests() -> Result<()> {
    let server = spawn_server_with(|c| c.limits.reports_per_minute = 3).await?;
    let ip = "192.0.2.15";

    let (status, body) = post_json(&server, "/report", ip, json!({ "reportedUserId": "peer-42" })).await?;
    assert_eq!(status, 400);
    assert!(body.starts_with("Invalid report data"));

    let (status, body) = post_json(&server, "/report", ip, json!({ "reportedUserId": "peer-42", "reason": 7 })).await?;
    assert_eq!(status, 400);
    assert!(body.starts_with("Invalid report data"));

    // Rejected submissions still spend the per-minute budget.
    let (status, _) = post_json(&server, "/report", ip, json!({ "reportedUserId": "peer-42", "reason": "spam" })).await?;
    assert_eq!(status, 201);
    let (status, _) = post_json(&server, "/report", ip, json!({ "reportedUserId": "peer-42", "reason": "spam" })).await?;
    assert_eq!(status, 429);

    let stats = get_json(&server, "/report/stats").await?;
    assert_eq!(stats["totalReports"], 1);
    Ok(())
}

#[tokio::test]
async fn report_submission_is_rate_limited_per_address() -> Result<()> {
    let server = spawn_server_with(|c| c.limits.reports_per_minute = 2).await?;
    let body = json!({ "reportedUserId": "peer-42", "reason": "spam" });

    for _ in 0..2 {
        let (status, _) = post_json(&server, "/report", "192.0.2.20", body.clone()).await?;
        assert_eq!(status, 201);
    }
    let (status, _) = post_json(&server, "/report", "192.0.2.20", body.clone()).await?;
    assert_eq!(status, 429);

    // Another address still has its own budget.
    let (status, _) = post_json(&server, "/report", "192.0.2.21", body.clone()).await?;
    assert_eq!(status, 201);

    // The window refills with time.
    server.clock.advance(Duration::from_secs(60));
    let (status, _) = post_json(&server, "/report", "192.0.2.20", body).await?;
    assert_eq!(status, 201);
    Ok(())
}

#[tokio::test]
async fn websocket_connections_are_rate_limited_per_address() -> Result<()> {
    let server = spawn_server_with(|c| c.limits.connections_per_minute = 2).await?;

    let _first = Client::connect(&server, "192.0.2.30").await?;
    let _second = Client::connect(&server, "192.0.2.30").await?;
    assert!(Client::connect(&server, "192.0.2.30").await.is_err());
    assert!(Client::connect(&server, "192.0.2.31").await.is_ok());
    Ok(())
}

#[tokio::test]
async fn api_requests_are_rate_limited() -> Result<()> {
    let server = spawn_server_with(|c| c.limits.api_requests_per_window = 3).await?;
    let client = reqwest::Client::new();

    let mut statuses = Vec::new();
    for _ in 0..4 {
        let response = client
            .get(server.api_url("/chat/stats"))
            .header("x-forwarded-for", "192.0.2.40")
            .send()
            .await?;
        statuses.push(response.status().as_u16());
    }
    assert_eq!(statuses, vec![200, 200, 200, 429]);

    // /health sits outside the limited prefix.
    let health = client
        .get(format!("http://{}/health", server.addr))
        .header("x-forwarded-for", "192.0.2.40")
        .send()
        .await?;
    assert_eq!(health.status().as_u16(), 200);
    Ok(())
}
