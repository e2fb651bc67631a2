use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use prescription_cell::router::prescription_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn test_app(mock_server: &MockServer) -> (Router, AppConfig) {
    let config = TestConfig::with_gateway_url(&mock_server.uri()).to_app_config();
    (prescription_routes(Arc::new(config.clone())), config)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn prescription_insert_response(id: i64, patient_id: i64, doctor_id: i64) -> Value {
    json!([{
        "id": id,
        "patient_id": patient_id,
        "doctor_id": doctor_id,
        "appointment_id": 101,
        "drug_id": 3,
        "dosage": "20mg",
        "instructions": "Once daily at night",
        "date_issued": "2025-07-01",
        "follow_up_date": null
    }])
}

#[tokio::test]
async fn create_prescription_resolves_ids_from_appointment() {
    let mock_server = MockServer::start().await;
    let (app, config) = test_app(&mock_server);

    let doctor = TestUser::with_id(5, "doctor@example.com", "doctor");
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.101"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "patient_id": 42,
            "doctor_id": 5,
            "status": "Completed"
        }])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/drugs"))
        .and(query_param("id", "eq.3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 3,
            "name": "Atorvastatin",
            "rx_otc": "Rx"
        }])))
        .mount(&mock_server)
        .await;

    // One earlier prescription for the same drug feeds the statistics block
    Mock::given(method("GET"))
        .and(path("/rest/v1/prescriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 6, "drug_id": 3 }
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/prescriptions"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(prescription_insert_response(7, 42, 5)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/prescriptions")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "appointmentId": 101,
                "drugId": 3,
                "dosage": "20mg",
                "instructions": "Once daily at night"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["prescription"]["id"], 7);
    assert_eq!(body["prescription"]["patient_id"], 42);
    assert_eq!(body["statistics"]["drugName"], "Atorvastatin");
    assert_eq!(body["statistics"]["sameDrugPrescriptions"], 1);
    assert_eq!(body["statistics"]["totalPrescriptionsForPatient"], 1);
}

#[tokio::test]
async fn create_prescription_rejects_mismatched_doctor() {
    let mock_server = MockServer::start().await;
    let (app, config) = test_app(&mock_server);

    let doctor = TestUser::with_id(5, "doctor@example.com", "doctor");
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "patient_id": 42,
            "doctor_id": 5,
            "status": "Scheduled"
        }])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/prescriptions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/prescriptions")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "appointmentId": 101,
                "doctorId": 9,
                "drugId": 3
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "DoctorID does not match the appointment.");
}

#[tokio::test]
async fn create_prescription_rejects_cancelled_appointment() {
    let mock_server = MockServer::start().await;
    let (app, config) = test_app(&mock_server);

    let doctor = TestUser::with_id(5, "doctor@example.com", "doctor");
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "patient_id": 42,
            "doctor_id": 5,
            "status": "Cancelled"
        }])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/prescriptions")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "appointmentId": 101, "drugId": 3 }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(
        body["error"],
        "Cannot create prescription for appointment with status: Cancelled"
    );
}

#[tokio::test]
async fn create_prescription_resolves_drug_by_name() {
    let mock_server = MockServer::start().await;
    let (app, config) = test_app(&mock_server);

    let doctor = TestUser::with_id(5, "doctor@example.com", "doctor");
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/drugs"))
        .and(query_param("name", "eq.Atorvastatin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 3,
            "name": "Atorvastatin",
            "rx_otc": "Rx"
        }])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/prescriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/prescriptions"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(prescription_insert_response(8, 42, 5)),
        )
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/prescriptions")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "patientId": 42,
                "doctorId": 5,
                "drugName": "Atorvastatin",
                "dosage": "20mg"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn create_prescription_unknown_drug_name_returns_404() {
    let mock_server = MockServer::start().await;
    let (app, config) = test_app(&mock_server);

    let doctor = TestUser::with_id(5, "doctor@example.com", "doctor");
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/drugs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/prescriptions")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "patientId": 42,
                "doctorId": 5,
                "drugName": "Nonexistol"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Drug not found with name: Nonexistol");
}

#[tokio::test]
async fn create_prescription_without_patient_or_appointment_returns_400() {
    let mock_server = MockServer::start().await;
    let (app, config) = test_app(&mock_server);

    let doctor = TestUser::with_id(5, "doctor@example.com", "doctor");
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, Some(24));

    let request = Request::builder()
        .method("POST")
        .uri("/prescriptions")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "doctorId": 5, "drugId": 3 }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(
        body["error"],
        "PatientID is required. Provide either AppointmentID or PatientID."
    );
}

#[tokio::test]
async fn patient_cannot_create_prescriptions() {
    let mock_server = MockServer::start().await;
    let (app, config) = test_app(&mock_server);

    let user = TestUser::with_id(42, "patient@example.com", "patient");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let request = Request::builder()
        .method("POST")
        .uri("/prescriptions")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "patientId": 42, "doctorId": 5, "drugId": 3 }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn patient_prescriptions_empty_list_is_200() {
    let mock_server = MockServer::start().await;
    let (app, config) = test_app(&mock_server);

    let user = TestUser::with_id(42, "patient@example.com", "patient");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/prescriptions"))
        .and(query_param("patient_id", "eq.42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri("/patients/42/prescriptions")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["prescriptions"], json!([]));
}

#[tokio::test]
async fn patient_prescriptions_include_joined_context() {
    let mock_server = MockServer::start().await;
    let (app, config) = test_app(&mock_server);

    let user = TestUser::with_id(42, "patient@example.com", "patient");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/prescriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 7,
            "patient_id": 42,
            "doctor_id": 5,
            "appointment_id": 101,
            "drug_id": 3,
            "dosage": "20mg",
            "instructions": "Once daily at night",
            "date_issued": "2025-07-01",
            "follow_up_date": "2025-08-01",
            "drug": { "id": 3, "name": "Atorvastatin", "rx_otc": "Rx" },
            "doctor": {
                "first_name": "Maria",
                "last_name": "Lopez",
                "specialization": "Cardiology",
                "email": "m.lopez@clinic.test",
                "phone": "555-0100"
            },
            "appointment": { "date": "2025-07-01", "time": "09:00:00", "reason": "Chest pain" }
        }])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri("/patients/42/prescriptions")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["prescriptions"][0]["drug"]["name"], "Atorvastatin");
    assert_eq!(body["prescriptions"][0]["doctor"]["last_name"], "Lopez");
}

#[tokio::test]
async fn trends_default_to_monthly_and_label_buckets() {
    let mock_server = MockServer::start().await;
    let (app, config) = test_app(&mock_server);

    let user = TestUser::with_id(42, "patient@example.com", "patient");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/prescriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "date_issued": "2025-03-05", "drug_id": 3, "doctor_id": 5,
              "drug": { "id": 3, "name": "Atorvastatin", "rx_otc": "Rx" } },
            { "date_issued": "2025-04-02", "drug_id": 3, "doctor_id": 5,
              "drug": { "id": 3, "name": "Atorvastatin", "rx_otc": "Rx" } },
            { "date_issued": "2025-04-10", "drug_id": 4, "doctor_id": 6,
              "drug": { "id": 4, "name": "Ibuprofen", "rx_otc": "OTC" } }
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri("/patients/42/prescription-trends")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["period"], "monthly");
    assert_eq!(body["patientId"], 42);

    let trends = body["trends"].as_array().unwrap();
    assert_eq!(trends.len(), 2);
    assert_eq!(trends[0]["period"], "2025-03");
    assert_eq!(trends[0]["trend"], "stable");
    // 1 -> 2 prescriptions is a +100% jump
    assert_eq!(trends[1]["trend"], "increasing");
    assert_eq!(trends[1]["uniqueDrugs"], 2);
    assert_eq!(trends[1]["uniqueDoctors"], 2);
    assert_eq!(trends[1]["prescriptionDrugs"], 1);
    assert_eq!(trends[1]["overTheCounterDrugs"], 1);

    assert_eq!(body["summary"]["totalPeriods"], 2);
    assert_eq!(body["summary"]["totalPrescriptions"], 3);
    assert_eq!(body["summary"]["maxPrescriptions"], 2);
    assert_eq!(body["summary"]["minPrescriptions"], 1);
}

#[tokio::test]
async fn trends_reject_unknown_period() {
    let mock_server = MockServer::start().await;
    let (app, config) = test_app(&mock_server);

    let user = TestUser::with_id(42, "patient@example.com", "patient");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let request = Request::builder()
        .method("GET")
        .uri("/patients/42/prescription-trends?period=daily")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(
        body["error"],
        "Invalid period. Only 'weekly' and 'monthly' are supported."
    );
}

#[tokio::test]
async fn unauthorized_requests_are_rejected() {
    let config = TestConfig::default().to_app_config();

    let protected_endpoints = vec![
        ("POST", "/prescriptions"),
        ("GET", "/patients/1/prescriptions"),
        ("GET", "/patients/1/prescription-trends"),
    ];

    for (method, uri) in protected_endpoints {
        let app = prescription_routes(Arc::new(config.clone()));

        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "Failed for {} {}",
            method,
            uri
        );
    }
}
