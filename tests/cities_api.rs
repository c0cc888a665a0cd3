mod common;

use actix_web::{test, App};
use campus_registry::handlers;
use serde_json::{json, Value};

fn names(body: &Value) -> Vec<String> {
    body["result"]
        .as_array()
        .unwrap()
        .iter()
        .map(|city| city["name"].as_str().unwrap().to_string())
        .collect()
}

#[actix_web::test]
async fn added_city_can_be_fetched_by_id() {
    let Some(db) = common::setup_test_db().await else { return };
    let app = test::init_service(App::new().app_data(db.state.clone()).configure(handlers::configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/city")
        .set_json(json!({ "name": "Lagos" }))
        .to_request();
    let created = common::envelope(test::call_service(&app, req).await).await;

    assert_eq!(created["statusCode"], 200);
    assert_eq!(created["message"], "City added successfully");
    assert_eq!(created["result"][0]["name"], "Lagos");
    let id = created["result"][0]["id"].as_i64().unwrap();

    let req = test::TestRequest::get().uri(&format!("/api/city/{}", id)).to_request();
    let fetched = common::envelope(test::call_service(&app, req).await).await;

    assert_eq!(fetched["statusCode"], 200);
    assert_eq!(fetched["result"], json!([{ "id": id, "name": "Lagos" }]));

    db.cleanup().await;
}

#[actix_web::test]
async fn duplicate_city_reports_constraint_detail() {
    let Some(db) = common::setup_test_db().await else { return };
    let app = test::init_service(App::new().app_data(db.state.clone()).configure(handlers::configure)).await;

    for expected in [200, 500] {
        let req = test::TestRequest::post()
            .uri("/api/city")
            .set_json(json!({ "name": "Kano" }))
            .to_request();
        let body = common::envelope(test::call_service(&app, req).await).await;
        assert_eq!(body["statusCode"], expected);

        if expected == 500 {
            assert!(body["result"].is_null());
            assert!(body["message"].as_str().unwrap().contains("unique"));
            assert!(body["exception"].as_str().unwrap().contains("already exists"));
        }
    }

    db.cleanup().await;
}

#[actix_web::test]
async fn deleting_twice_returns_empty_result() {
    let Some(db) = common::setup_test_db().await else { return };
    let app = test::init_service(App::new().app_data(db.state.clone()).configure(handlers::configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/city")
        .set_json(json!({ "name": "Ibadan" }))
        .to_request();
    let created = common::envelope(test::call_service(&app, req).await).await;
    let id = created["result"][0]["id"].as_i64().unwrap();

    let req = test::TestRequest::delete().uri(&format!("/api/city/{}", id)).to_request();
    let first = common::envelope(test::call_service(&app, req).await).await;
    assert_eq!(first["statusCode"], 200);
    assert_eq!(first["result"][0]["name"], "Ibadan");

    let req = test::TestRequest::delete().uri(&format!("/api/city/{}", id)).to_request();
    let second = common::envelope(test::call_service(&app, req).await).await;
    assert_eq!(second["statusCode"], 200);
    assert_eq!(second["message"], "City deleted successfully");
    assert_eq!(second["result"], json!([]));

    db.cleanup().await;
}

#[actix_web::test]
async fn update_renames_and_ignores_missing_ids() {
    let Some(db) = common::setup_test_db().await else { return };
    let app = test::init_service(App::new().app_data(db.state.clone()).configure(handlers::configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/city")
        .set_json(json!({ "name": "Enugu" }))
        .to_request();
    let created = common::envelope(test::call_service(&app, req).await).await;
    let id = created["result"][0]["id"].as_i64().unwrap();

    let req = test::TestRequest::put()
        .uri(&format!("/api/city/{}", id))
        .set_json(json!({ "name": "Enugu City" }))
        .to_request();
    let updated = common::envelope(test::call_service(&app, req).await).await;
    assert_eq!(updated["message"], "City updated successfully");
    assert_eq!(updated["result"], json!([{ "id": id, "name": "Enugu City" }]));

    let req = test::TestRequest::put()
        .uri(&format!("/api/city/{}", id + 1000))
        .set_json(json!({ "name": "Nowhere" }))
        .to_request();
    let missing = common::envelope(test::call_service(&app, req).await).await;
    assert_eq!(missing["statusCode"], 200);
    assert_eq!(missing["result"], json!([]));

    db.cleanup().await;
}

#[actix_web::test]
async fn cities_are_listed_in_requested_order() {
    let Some(db) = common::setup_test_db().await else { return };
    let app = test::init_service(App::new().app_data(db.state.clone()).configure(handlers::configure)).await;

    for name in ["Kano", "Abuja", "Lagos", "Jos"] {
        let req = test::TestRequest::post()
            .uri("/api/city")
            .set_json(json!({ "name": name }))
            .to_request();
        test::call_service(&app, req).await;
    }

    let req = test::TestRequest::get().uri("/api/city?sort=desc").to_request();
    let desc = names(&common::envelope(test::call_service(&app, req).await).await);
    assert_eq!(desc, vec!["Lagos", "Kano", "Jos", "Abuja"]);
    assert!(desc.windows(2).all(|pair| pair[0] >= pair[1]));

    let req = test::TestRequest::get().uri("/api/city?sort=ASC").to_request();
    let asc = names(&common::envelope(test::call_service(&app, req).await).await);
    assert_eq!(asc, vec!["Abuja", "Jos", "Kano", "Lagos"]);

    let req = test::TestRequest::get().uri("/api/city?sort=bogus").to_request();
    let bogus = names(&common::envelope(test::call_service(&app, req).await).await);
    assert_eq!(bogus, asc);

    let req = test::TestRequest::get().uri("/api/city").to_request();
    let default = names(&common::envelope(test::call_service(&app, req).await).await);
    assert_eq!(default, asc);

    db.cleanup().await;
}
