use actix_web::HttpResponse;
use serde_json::{json, Map, Value};

/// OpenAPI description of the `/api` routes.
pub async fn openapi() -> HttpResponse {
    HttpResponse::Ok().json(document())
}

pub fn document() -> Value {
    let sort = json!({
        "in": "query",
        "name": "sort",
        "description": "Sort direction; anything other than desc sorts ascending",
        "schema": { "type": "string", "enum": ["asc", "desc"], "default": "asc" }
    });
    let id = |what: &str| {
        json!({
            "in": "path",
            "name": "id",
            "required": true,
            "description": format!("ID of the {}", what),
            "schema": { "type": "integer", "minimum": 1 }
        })
    };
    let envelope = |rows: &str| {
        json!({
            "200": {
                "description": "Envelope; the outcome is in statusCode",
                "content": {
                    "application/json": {
                        "schema": {
                            "allOf": [
                                { "$ref": "#/components/schemas/Envelope" },
                                {
                                    "properties": {
                                        "result": {
                                            "type": "array",
                                            "nullable": true,
                                            "items": { "$ref": format!("#/components/schemas/{}", rows) }
                                        }
                                    }
                                }
                            ]
                        }
                    }
                }
            }
        })
    };
    let body = |schema: &str| {
        json!({
            "required": true,
            "content": {
                "application/json": { "schema": { "$ref": format!("#/components/schemas/{}", schema) } },
                "application/x-www-form-urlencoded": { "schema": { "$ref": format!("#/components/schemas/{}", schema) } }
            }
        })
    };

    let mut paths = Map::new();
    paths.insert(
        "/api/city".to_string(),
        json!({
            "get": {
                "summary": "List all cities ordered by name",
                "parameters": [sort.clone()],
                "responses": envelope("City")
            },
            "post": {
                "summary": "Create a new city",
                "requestBody": body("CityInput"),
                "responses": envelope("City")
            }
        }),
    );
    paths.insert(
        "/api/city/{id}".to_string(),
        json!({
            "get": {
                "summary": "Get city details by ID",
                "parameters": [id("city")],
                "responses": envelope("City")
            },
            "put": {
                "summary": "Rename a city by ID",
                "parameters": [id("city")],
                "requestBody": body("CityInput"),
                "responses": envelope("City")
            },
            "delete": {
                "summary": "Delete a city by ID",
                "parameters": [id("city")],
                "responses": envelope("City")
            }
        }),
    );
    paths.insert(
        "/api/student".to_string(),
        json!({
            "get": {
                "summary": "List all students with their city of birth, ordered by first name",
                "parameters": [sort],
                "responses": envelope("StudentDetails")
            },
            "post": {
                "summary": "Add a new student, optionally with an image",
                "requestBody": student_upload(),
                "responses": envelope("Student")
            }
        }),
    );
    paths.insert(
        "/api/student/{id}".to_string(),
        json!({
            "get": {
                "summary": "Get student details by ID",
                "parameters": [id("student")],
                "responses": envelope("StudentDetails")
            },
            "put": {
                "summary": "Update student details by ID; the image is left unchanged",
                "parameters": [id("student")],
                "requestBody": body("StudentInput"),
                "responses": envelope("Student")
            },
            "delete": {
                "summary": "Delete a student by ID together with its stored image",
                "parameters": [id("student")],
                "responses": envelope("Student")
            }
        }),
    );

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Campus registry API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": env!("CARGO_PKG_DESCRIPTION")
        },
        "paths": paths,
        "components": { "schemas": schemas() }
    })
}

fn student_upload() -> Value {
    let with_img = |format: &str, description: &str| {
        json!({
            "schema": {
                "allOf": [
                    { "$ref": "#/components/schemas/StudentInput" },
                    {
                        "properties": {
                            "img": { "type": "string", "format": format, "description": description }
                        }
                    }
                ]
            }
        })
    };

    json!({
        "required": true,
        "content": {
            "multipart/form-data": with_img("binary", "Image file, or base64 text"),
            "application/json": with_img("byte", "Base64 image, optionally a data URI"),
            "application/x-www-form-urlencoded": with_img("byte", "Base64 image, optionally a data URI")
        }
    })
}

fn schemas() -> Map<String, Value> {
    let mut schemas = Map::new();
    schemas.insert(
        "Envelope".to_string(),
        json!({
            "type": "object",
            "required": ["statusCode", "message"],
            "properties": {
                "statusCode": { "type": "integer", "example": 200 },
                "message": { "type": "string" },
                "exception": { "type": "string", "nullable": true }
            }
        }),
    );
    schemas.insert(
        "City".to_string(),
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "integer" },
                "name": { "type": "string" }
            }
        }),
    );
    schemas.insert(
        "CityInput".to_string(),
        json!({
            "type": "object",
            "required": ["name"],
            "properties": { "name": { "type": "string", "maxLength": 100 } }
        }),
    );
    schemas.insert(
        "Student".to_string(),
        json!({
            "type": "object",
            "properties": {
                "student_id": { "type": "integer" },
                "first_name": { "type": "string" },
                "last_name": { "type": "string" },
                "date_of_birth": { "type": "string", "format": "date" },
                "city_of_birth_id": { "type": "integer" },
                "img": { "type": "string", "nullable": true }
            }
        }),
    );
    schemas.insert(
        "StudentDetails".to_string(),
        json!({
            "allOf": [
                { "$ref": "#/components/schemas/Student" },
                {
                    "properties": {
                        "full_name": { "type": "string" },
                        "city_of_birth": { "type": "string" }
                    }
                }
            ]
        }),
    );
    schemas.insert(
        "StudentInput".to_string(),
        json!({
            "type": "object",
            "required": ["first_name", "last_name", "date_of_birth", "city_of_birth_id"],
            "properties": {
                "first_name": { "type": "string", "maxLength": 100 },
                "last_name": { "type": "string", "maxLength": 100 },
                "date_of_birth": { "type": "string", "format": "date" },
                "city_of_birth_id": { "type": "integer", "minimum": 1 }
            }
        }),
    );
    schemas
}
