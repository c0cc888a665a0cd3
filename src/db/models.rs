use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct City {
    pub id: i32,
    pub name: String,
}

/// A row of the `students` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub student_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub city_of_birth_id: i32,
    /// Public URL of the stored image, if one was uploaded.
    pub img: Option<String>,
}

/// A student joined with the name of their city of birth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct StudentDetails {
    pub student_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub city_of_birth_id: i32,
    pub city_of_birth: String,
    pub img: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudent {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub city_of_birth_id: i32,
}

/// Fields `update_student` rewrites. The image is not part of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentUpdate {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub city_of_birth_id: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Case-insensitive; anything other than `desc` sorts ascending.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw {
            Some(value) if value.eq_ignore_ascii_case("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}
