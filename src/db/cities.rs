use sqlx::PgConnection;
use tracing::debug;

use crate::db::models::{City, SortDirection};
use crate::Result;

pub async fn add_city(conn: &mut PgConnection, name: &str) -> Result<Vec<City>> {
    let rows = sqlx::query_as::<_, City>("insert into cities(name) values($1) returning *")
        .bind(name)
        .fetch_all(conn)
        .await?;

    debug!("Added city rows: {:?}", rows);
    Ok(rows)
}

pub async fn delete_city(conn: &mut PgConnection, id: i32) -> Result<Vec<City>> {
    let rows = sqlx::query_as::<_, City>("delete from cities where id = $1 returning *")
        .bind(id)
        .fetch_all(conn)
        .await?;

    debug!("Deleted city rows: {:?}", rows);
    Ok(rows)
}

pub async fn update_city(conn: &mut PgConnection, id: i32, name: &str) -> Result<Vec<City>> {
    let rows = sqlx::query_as::<_, City>("update cities set name = $2 where id = $1 returning *")
        .bind(id)
        .bind(name)
        .fetch_all(conn)
        .await?;

    debug!("Updated city rows: {:?}", rows);
    Ok(rows)
}

pub async fn display_cities(conn: &mut PgConnection, sort: SortDirection) -> Result<Vec<City>> {
    // The direction comes from a closed enum, never from request text.
    let sql = format!("select * from cities order by name {}", sort.as_sql());
    let rows = sqlx::query_as::<_, City>(&sql).fetch_all(conn).await?;

    debug!("Listed {} cities", rows.len());
    Ok(rows)
}

pub async fn display_city(conn: &mut PgConnection, id: i32) -> Result<Vec<City>> {
    let rows = sqlx::query_as::<_, City>("select * from cities where id = $1")
        .bind(id)
        .fetch_all(conn)
        .await?;

    Ok(rows)
}
