use actix_multipart::{Field, Multipart};
use actix_web::{web, Either, HttpResponse};
use futures::StreamExt;
use sqlx::PgConnection;
use tracing::{debug, error, info, warn};

use super::requests::{parse_id, IdValue, SortQuery, StudentBody};
use super::{reply, reply_insert};
use crate::db::{students, NewStudent, Student, StudentDetails};
use crate::error::AppError;
use crate::storage::ImageUpload;
use crate::{AppState, Result};

/// Upper bound for any non-image multipart field.
const MAX_TEXT_FIELD_BYTES: usize = 4 * 1024;

type Body = Either<web::Json<StudentBody>, web::Form<StudentBody>>;

pub async fn get_students(state: web::Data<AppState>, query: web::Query<SortQuery>) -> HttpResponse {
    let sort = query.direction();
    info!("Listing students ({})", sort.as_sql());

    let outcome: Result<Vec<StudentDetails>> = async {
        let mut conn = state.db_pool.acquire().await?;
        students::display_students(&mut conn, sort).await
    }
    .await;

    reply("GET /api/student", outcome, "Success", "Failed displaying students")
}

pub async fn get_student(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let outcome: Result<Vec<StudentDetails>> = async {
        let id = parse_id(&path)?;
        info!("Fetching student {}", id);

        let mut conn = state.db_pool.acquire().await?;
        students::display_student(&mut conn, id).await
    }
    .await;

    reply("GET /api/student/{id}", outcome, "Success", "Failed displaying students")
}

/// `multipart/form-data` variant of `POST /api/student`; `img` may be a file
/// part or base64 text.
pub async fn create_student(state: web::Data<AppState>, payload: Multipart) -> HttpResponse {
    let outcome: Result<Vec<Student>> = async {
        let max_image_bytes = state.config.uploads.max_image_bytes;
        let (student, image) = read_student_form(payload, max_image_bytes).await?;
        insert_student(&state, student, image).await
    }
    .await;

    reply_insert("POST /api/student", outcome, "Student added successfully")
}

/// JSON or url-encoded variant of `POST /api/student`; `img` is base64 text.
pub async fn create_student_from_body(state: web::Data<AppState>, body: Body) -> HttpResponse {
    let outcome: Result<Vec<Student>> = async {
        let mut body = match body {
            Either::Left(json) => json.into_inner(),
            Either::Right(form) => form.into_inner(),
        };
        let image = match body.img.take() {
            Some(text) => ImageUpload::from_base64(&text, state.config.uploads.max_image_bytes)?,
            None => None,
        };
        insert_student(&state, body.into_new_student()?, image).await
    }
    .await;

    reply_insert("POST /api/student", outcome, "Student added successfully")
}

/// Inserts the student row, then stores the optional image under the new id.
///
/// A failed image write is logged and the student is returned without an
/// image; the inserted row is kept.
async fn insert_student(
    state: &AppState,
    student: NewStudent,
    image: Option<ImageUpload>,
) -> Result<Vec<Student>> {
    info!(
        "Adding student {} {} (image: {})",
        student.first_name,
        student.last_name,
        image.is_some()
    );

    let mut conn = state.db_pool.acquire().await?;
    let mut rows = students::add_student(&mut conn, &student).await?;

    if let Some(image) = image {
        if let Some(row) = rows.pop() {
            rows.push(attach_image(state, &mut conn, row, &image).await);
        }
    }
    Ok(rows)
}

pub async fn update_student(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: Body,
) -> HttpResponse {
    let outcome: Result<Vec<Student>> = async {
        let id = parse_id(&path)?;
        let body = match body {
            Either::Left(json) => json.into_inner(),
            Either::Right(form) => form.into_inner(),
        };
        let update = body.into_update()?;
        info!("Updating student {}", id);

        let mut conn = state.db_pool.acquire().await?;
        students::update_student(&mut conn, id, &update).await
    }
    .await;

    reply("PUT /api/student/{id}", outcome, "Update Success!", "Error Updating Student Record")
}

pub async fn delete_student(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let outcome: Result<Vec<Student>> = async {
        let id = parse_id(&path)?;
        info!("Deleting student {}", id);

        let mut conn = state.db_pool.acquire().await?;
        students::delete_student(&mut conn, id).await
    }
    .await;

    if let Ok(rows) = &outcome {
        for url in rows.iter().filter_map(|row| row.img.as_deref()) {
            if let Err(e) = state.images.remove(url).await {
                warn!("Failed to remove image {}: {}", url, e);
            }
        }
    }

    reply("DELETE /api/student/{id}", outcome, "Student Record Deleted", "Error Deleting Record")
}

async fn attach_image(
    state: &AppState,
    conn: &mut PgConnection,
    student: Student,
    image: &ImageUpload,
) -> Student {
    let id = student.student_id;

    let url = match state.images.save(id, image).await {
        Ok(url) => url,
        Err(e) => {
            error!("Student {} saved without image: {}", id, e);
            return student;
        }
    };

    match students::set_student_image(conn, id, &url).await {
        Ok(mut rows) => rows.pop().unwrap_or(student),
        Err(e) => {
            error!("Failed to record image {} for student {}: {}", url, id, e);
            student
        }
    }
}

async fn read_student_form(
    mut payload: Multipart,
    max_image_bytes: usize,
) -> Result<(NewStudent, Option<ImageUpload>)> {
    let mut body = StudentBody::default();
    let mut image = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(invalid_multipart)?;
        let name = field.name().to_string();
        let filename = field.content_disposition().get_filename().map(str::to_string);
        let content_type = field.content_type().map(|mime| mime.essence_str().to_string());

        let limit = match (name.as_str(), &filename) {
            ("img", Some(_)) => max_image_bytes,
            // Base64 text grows by a third, plus room for a data URI prefix.
            ("img", None) => max_image_bytes / 3 * 4 + 256,
            _ => MAX_TEXT_FIELD_BYTES,
        };
        let bytes = read_field(&mut field, &name, limit).await?;

        match name.as_str() {
            "img" if filename.is_some() => {
                image = ImageUpload::from_bytes(
                    bytes,
                    content_type.as_deref(),
                    filename.as_deref(),
                    max_image_bytes,
                )?;
            }
            "img" => image = ImageUpload::from_base64(&text_field(&name, bytes)?, max_image_bytes)?,
            "first_name" => body.first_name = Some(text_field(&name, bytes)?),
            "last_name" => body.last_name = Some(text_field(&name, bytes)?),
            "date_of_birth" => body.date_of_birth = Some(text_field(&name, bytes)?),
            "city_of_birth_id" => {
                body.city_of_birth_id = Some(IdValue::Text(text_field(&name, bytes)?))
            }
            other => debug!("Ignoring multipart field {}", other),
        }
    }

    Ok((body.into_new_student()?, image))
}

async fn read_field(field: &mut Field, name: &str, limit: usize) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();

    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(invalid_multipart)?;
        if bytes.len() + chunk.len() > limit {
            return Err(AppError::ValidationError(format!(
                "{} exceeds the {} byte limit",
                name, limit
            )));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

fn text_field(name: &str, bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes)
        .map_err(|_| AppError::ValidationError(format!("{} must be UTF-8 text", name)))
}

fn invalid_multipart(err: actix_multipart::MultipartError) -> AppError {
    AppError::ValidationError(format!("Invalid multipart body: {}", err))
}
