//! `GET /time` endpoint handler.
//!
//! Returns the server's local wall-clock time as an ISO-8601 date-time
//! without offset, e.g. `{"time": "2026-10-16T09:30:12.345678"}`.

use axum::Json;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct TimeResponse {
    pub time: NaiveDateTime,
}

pub async fn time_handler() -> Json<TimeResponse> {
    Json(TimeResponse {
        time: Local::now().naive_local(),
    })
}
