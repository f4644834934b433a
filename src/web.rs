//! JSON serving boundary: pure projections over the rows the pipeline wrote.

use std::net::IpAddr;
use std::str::FromStr;

use mongodb::Database;
use poem::listener::TcpListener;
use poem::middleware::{CatchPanic, Tracing};
use poem::web::{Data, Json, Query};
use poem::{handler, post, EndpointExt, Route, Server};
use serde::{Deserialize, Serialize};

use crate::database::models::{AccoId, Accommodation, Rating, Recommendation, UserId};
use crate::opts::ServeOpts;
use crate::prelude::*;

pub async fn run(opts: ServeOpts) -> Result {
    let database = crate::database::mongodb::open(&opts.connections.database_uri).await?;

    info!(host = opts.host.as_str(), port = opts.port, "listening…");
    let app = Route::new()
        .at("/api/get_rated", post(get_rated))
        .at("/api/get_recommendations", post(get_recommendations))
        .data(database)
        .with(Tracing)
        .with(CatchPanic::new());
    Server::new(TcpListener::bind((IpAddr::from_str(&opts.host)?, opts.port)))
        .run(app)
        .await?;
    Ok(())
}

#[derive(Deserialize)]
struct UserQuery {
    user_id: UserId,
}

#[derive(Serialize)]
struct RatedResponse {
    rated: Vec<RatedRow>,
}

#[derive(Serialize)]
struct RatedRow {
    id: AccoId,
    title: String,
    #[serde(rename = "type")]
    kind: String,
    rating: f64,
}

#[derive(Serialize)]
struct RecommendationsResponse {
    recommendations: Vec<RecommendedRow>,
}

#[derive(Serialize)]
struct RecommendedRow {
    id: AccoId,
    title: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Accommodations the user has already rated.
#[handler]
#[instrument(skip_all, fields(user_id = query.user_id))]
async fn get_rated(
    Query(query): Query<UserQuery>,
    Data(database): Data<&Database>,
) -> Result<Json<RatedResponse>> {
    let titles = title_index(database).await?;
    let rated = Rating::fetch_by_user(database, query.user_id)
        .await?
        .into_iter()
        // Inner join: a rating of an unlisted accommodation yields no row.
        .filter_map(|rating| {
            titles.get(&rating.acco_id).map(|accommodation| RatedRow {
                id: accommodation.id,
                title: accommodation.title.clone(),
                kind: accommodation.kind.clone(),
                rating: rating.rating,
            })
        })
        .collect();
    Ok(Json(RatedResponse { rated }))
}

/// Precomputed recommendations for the user, best first.
#[handler]
#[instrument(skip_all, fields(user_id = query.user_id))]
async fn get_recommendations(
    Query(query): Query<UserQuery>,
    Data(database): Data<&Database>,
) -> Result<Json<RecommendationsResponse>> {
    let titles = title_index(database).await?;
    let recommendations = Recommendation::fetch_by_user(database, query.user_id)
        .await?
        .into_iter()
        .filter_map(|recommendation| {
            titles
                .get(&recommendation.acco_id)
                .map(|accommodation| RecommendedRow {
                    id: accommodation.id,
                    title: accommodation.title.clone(),
                    kind: accommodation.kind.clone(),
                })
        })
        .collect();
    Ok(Json(RecommendationsResponse { recommendations }))
}

async fn title_index(database: &Database) -> Result<AHashMap<AccoId, Accommodation>> {
    let index = Accommodation::fetch_all(database)
        .await?
        .into_iter()
        .map(|accommodation| (accommodation.id, accommodation))
        .collect();
    Ok(index)
}
