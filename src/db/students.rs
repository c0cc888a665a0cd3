use sqlx::PgConnection;
use tracing::debug;

use crate::db::models::{NewStudent, SortDirection, Student, StudentDetails, StudentUpdate};
use crate::Result;

const STUDENT_DETAILS: &str = r#"
    select
        s.student_id,
        s.first_name,
        s.last_name,
        s.first_name || ' ' || s.last_name as full_name,
        s.date_of_birth,
        s.city_of_birth_id,
        c.name as city_of_birth,
        s.img
    from students s
    inner join cities c on s.city_of_birth_id = c.id
"#;

pub async fn add_student(conn: &mut PgConnection, student: &NewStudent) -> Result<Vec<Student>> {
    let rows = sqlx::query_as::<_, Student>(
        r#"
        insert into students(first_name, last_name, date_of_birth, city_of_birth_id)
        values ($1, $2, $3, $4)
        returning *
        "#,
    )
    .bind(&student.first_name)
    .bind(&student.last_name)
    .bind(student.date_of_birth)
    .bind(student.city_of_birth_id)
    .fetch_all(conn)
    .await?;

    debug!("Added student rows: {:?}", rows);
    Ok(rows)
}

/// Records where a student's image was stored.
pub async fn set_student_image(
    conn: &mut PgConnection,
    id: i32,
    img_url: &str,
) -> Result<Vec<Student>> {
    let rows = sqlx::query_as::<_, Student>(
        "update students set img = $2 where student_id = $1 returning *",
    )
    .bind(id)
    .bind(img_url)
    .fetch_all(conn)
    .await?;

    Ok(rows)
}

pub async fn delete_student(conn: &mut PgConnection, id: i32) -> Result<Vec<Student>> {
    let rows = sqlx::query_as::<_, Student>("delete from students where student_id = $1 returning *")
        .bind(id)
        .fetch_all(conn)
        .await?;

    debug!("Deleted student rows: {:?}", rows);
    Ok(rows)
}

pub async fn update_student(
    conn: &mut PgConnection,
    id: i32,
    update: &StudentUpdate,
) -> Result<Vec<Student>> {
    let rows = sqlx::query_as::<_, Student>(
        r#"
        update students set
            first_name = $2,
            last_name = $3,
            date_of_birth = $4,
            city_of_birth_id = $5
        where student_id = $1
        returning *
        "#,
    )
    .bind(id)
    .bind(&update.first_name)
    .bind(&update.last_name)
    .bind(update.date_of_birth)
    .bind(update.city_of_birth_id)
    .fetch_all(conn)
    .await?;

    debug!("Updated student rows: {:?}", rows);
    Ok(rows)
}

pub async fn display_student(conn: &mut PgConnection, id: i32) -> Result<Vec<StudentDetails>> {
    let sql = format!("{} where s.student_id = $1", STUDENT_DETAILS);
    let rows = sqlx::query_as::<_, StudentDetails>(&sql)
        .bind(id)
        .fetch_all(conn)
        .await?;

    Ok(rows)
}

pub async fn display_students(
    conn: &mut PgConnection,
    sort: SortDirection,
) -> Result<Vec<StudentDetails>> {
    let sql = format!("{} order by s.first_name {}", STUDENT_DETAILS, sort.as_sql());
    let rows = sqlx::query_as::<_, StudentDetails>(&sql)
        .fetch_all(conn)
        .await?;

    debug!("Listed {} students", rows.len());
    Ok(rows)
}
