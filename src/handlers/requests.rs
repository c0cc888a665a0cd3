//! Typed request bodies and the checks that turn them into data-access input.

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;

use crate::db::{NewStudent, SortDirection, StudentUpdate};
use crate::error::AppError;
use crate::Result;

const MAX_NAME_CHARS: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct SortQuery {
    pub sort: Option<String>,
}

impl SortQuery {
    pub fn direction(&self) -> SortDirection {
        SortDirection::parse_lenient(self.sort.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CityBody {
    pub name: Option<String>,
}

impl CityBody {
    pub fn into_name(self) -> Result<String> {
        name_field("name", self.name)
    }
}

/// Form fields arrive as text, JSON clients may send a number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    Number(i64),
    Text(String),
}

#[derive(Debug, Default, Deserialize)]
pub struct StudentBody {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub city_of_birth_id: Option<IdValue>,
    /// Base64 image, optionally a `data:` URI. Only read when creating.
    pub img: Option<String>,
}

impl StudentBody {
    pub fn into_new_student(self) -> Result<NewStudent> {
        let StudentUpdate {
            first_name,
            last_name,
            date_of_birth,
            city_of_birth_id,
        } = self.into_update()?;

        Ok(NewStudent {
            first_name,
            last_name,
            date_of_birth,
            city_of_birth_id,
        })
    }

    pub fn into_update(self) -> Result<StudentUpdate> {
        Ok(StudentUpdate {
            first_name: name_field("first_name", self.first_name)?,
            last_name: name_field("last_name", self.last_name)?,
            date_of_birth: date_field("date_of_birth", self.date_of_birth.as_deref())?,
            city_of_birth_id: match self.city_of_birth_id {
                Some(IdValue::Number(n)) => positive_id("city_of_birth_id", n)?,
                Some(IdValue::Text(text)) => parse_id_field("city_of_birth_id", &text)?,
                None => return Err(missing("city_of_birth_id")),
            },
        })
    }
}

pub fn parse_id(raw: &str) -> Result<i32> {
    parse_id_field("id", raw)
}

fn parse_id_field(field: &str, raw: &str) -> Result<i32> {
    let value = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| AppError::ValidationError(format!("{} must be a positive integer", field)))?;
    positive_id(field, value)
}

fn positive_id(field: &str, value: i64) -> Result<i32> {
    i32::try_from(value)
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::ValidationError(format!("{} must be a positive integer", field)))
}

fn name_field(field: &str, value: Option<String>) -> Result<String> {
    let value = value.ok_or_else(|| missing(field))?;
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(AppError::ValidationError(format!("{} must not be empty", field)));
    }
    if trimmed.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::ValidationError(format!(
            "{} must be at most {} characters",
            field, MAX_NAME_CHARS
        )));
    }
    Ok(trimmed.to_string())
}

/// Accepts `YYYY-MM-DD`, or an RFC 3339 timestamp whose date part is used.
fn date_field(field: &str, value: Option<&str>) -> Result<NaiveDate> {
    let value = value.map(str::trim).ok_or_else(|| missing(field))?;

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|ts| ts.date_naive()))
        .map_err(|_| AppError::ValidationError(format!("{} must be a date formatted YYYY-MM-DD", field)))
}

fn missing(field: &str) -> AppError {
    AppError::ValidationError(format!("{} is required", field))
}
