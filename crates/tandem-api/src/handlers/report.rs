//! /report handlers: out-of-session abuse reports.
//!
//! These only reach the report sink. Blocking is reserved for the
//! in-session `report-user` message, where the reported peer is known.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use tandem_core::report::{validate_description, ReportSource, ReportValidationError};
use tandem_core::{ReportReason, ReportRecord};
use tandem_services::ReportSink;

use super::{client_ip, rate_limited, ApiState};

// ── /report (POST) ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSubmitRequest {
    #[serde(default)]
    pub reported_user_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSubmitResponse {
    pub message: &'static str,
    pub report_id: String,
}

impl ReportSubmitRequest {
    fn validate(self) -> Result<(String, ReportReason, String), ReportValidationError> {
        let reported = self
            .reported_user_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(ReportValidationError::MissingReportedUser)?;
        let reason: ReportReason = self
            .reason
            .ok_or(ReportValidationError::MissingReason)?
            .parse()?;
        let description = self.description.unwrap_or_default();
        validate_description(&description)?;
        Ok((reported, reason, description))
    }
}

pub async fn handle_report_submit(
    State(state): State<ApiState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Json<ReportSubmitRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ReportSubmitResponse>), Response> {
    let addr = client_ip(&state, &headers, remote);
    if !state.limits.reports.check(addr) {
        return Err(rate_limited("Too many reports from this IP, please slow down."));
    }

    // Malformed bodies count against the limit too.
    let Json(req) = body.map_err(|e| invalid_report(e.body_text()))?;
    let (reported, reason, description) = req.validate().map_err(invalid_report)?;

    let mut record = ReportRecord::new(ReportSource::Http, reported, reason, description);
    record.reporter_addr = Some(addr);
    let report_id = record.id.clone();
    state.reports.submit(record);

    Ok((
        StatusCode::CREATED,
        Json(ReportSubmitResponse {
            message: "Report submitted successfully",
            report_id,
        }),
    ))
}

fn invalid_report(reason: impl std::fmt::Display) -> Response {
    (StatusCode::BAD_REQUEST, format!("Invalid report data: {reason}")).into_response()
}

// ── /report/stats (GET) ───────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStatsResponse {
    pub total_reports: u64,
    pub by_reason: BTreeMap<&'static str, u64>,
}

pub async fn handle_report_stats(State(state): State<ApiState>) -> Json<ReportStatsResponse> {
    Json(ReportStatsResponse {
        total_reports: state.reports.total(),
        by_reason: state.reports.counts(),
    })
}
