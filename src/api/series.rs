use axum::{extract::State, Json};

use crate::serving::ServingContext;
use crate::series::Series;

/// GET /series - actual vs. predicted output for charting
pub async fn series(State(ctx): State<ServingContext>) -> Json<Series> {
    Json(ctx.series())
}
