use actix_web::{web, Either, HttpResponse};
use tracing::info;

use super::requests::{parse_id, CityBody, SortQuery};
use super::{reply, reply_insert};
use crate::db::{cities, City};
use crate::{AppState, Result};

type Body = Either<web::Json<CityBody>, web::Form<CityBody>>;

fn into_body(body: Body) -> CityBody {
    match body {
        Either::Left(json) => json.into_inner(),
        Either::Right(form) => form.into_inner(),
    }
}

pub async fn get_cities(state: web::Data<AppState>, query: web::Query<SortQuery>) -> HttpResponse {
    let sort = query.direction();
    info!("Listing cities ({})", sort.as_sql());

    let outcome: Result<Vec<City>> = async {
        let mut conn = state.db_pool.acquire().await?;
        cities::display_cities(&mut conn, sort).await
    }
    .await;

    reply("GET /api/city", outcome, "Success", "Failed to display cities")
}

pub async fn get_city(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let outcome: Result<Vec<City>> = async {
        let id = parse_id(&path)?;
        info!("Fetching city {}", id);

        let mut conn = state.db_pool.acquire().await?;
        cities::display_city(&mut conn, id).await
    }
    .await;

    reply("GET /api/city/{id}", outcome, "Success", "Failed to display cities")
}

pub async fn create_city(state: web::Data<AppState>, body: Body) -> HttpResponse {
    let outcome: Result<Vec<City>> = async {
        let name = into_body(body).into_name()?;
        info!("Adding city {}", name);

        let mut conn = state.db_pool.acquire().await?;
        cities::add_city(&mut conn, &name).await
    }
    .await;

    reply_insert("POST /api/city", outcome, "City added successfully")
}

pub async fn update_city(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: Body,
) -> HttpResponse {
    let outcome: Result<Vec<City>> = async {
        let id = parse_id(&path)?;
        let name = into_body(body).into_name()?;
        info!("Renaming city {} to {}", id, name);

        let mut conn = state.db_pool.acquire().await?;
        cities::update_city(&mut conn, id, &name).await
    }
    .await;

    reply("PUT /api/city/{id}", outcome, "City updated successfully", "Failed to update city")
}

pub async fn delete_city(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let outcome: Result<Vec<City>> = async {
        let id = parse_id(&path)?;
        info!("Deleting city {}", id);

        let mut conn = state.db_pool.acquire().await?;
        cities::delete_city(&mut conn, id).await
    }
    .await;

    reply("DELETE /api/city/{id}", outcome, "City deleted successfully", "Error deleting city")
}
