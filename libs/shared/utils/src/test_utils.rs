use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub gateway_url: String,
    pub gateway_api_key: String,
    pub clinic_utc_offset: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            gateway_url: "http://localhost:54321".to_string(),
            gateway_api_key: "test-api-key".to_string(),
            clinic_utc_offset: "-05:00".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_gateway_url(url: &str) -> Self {
        Self {
            gateway_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            gateway_url: self.gateway_url.clone(),
            gateway_api_key: self.gateway_api_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            clinic_utc_offset: self.clinic_utc_offset.clone(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

static NEXT_TEST_ID: AtomicI64 = AtomicI64::new(1000);

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: NEXT_TEST_ID.fetch_add(1, Ordering::Relaxed).to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: NEXT_TEST_ID.fetch_add(1, Ordering::Relaxed).to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn with_id(id: i64, email: &str, role: &str) -> Self {
        Self {
            id: id.to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

pub struct MockGatewayResponses;

impl MockGatewayResponses {
    pub fn appointment_row(
        id: i64,
        patient_id: i64,
        doctor_id: i64,
        date: &str,
        time: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "date": date,
            "time": time,
            "reason": "Routine check-up",
            "status": status
        })
    }

    pub fn prescription_row(
        id: i64,
        patient_id: i64,
        doctor_id: i64,
        drug_id: i64,
        date_issued: &str,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "appointment_id": null,
            "drug_id": drug_id,
            "dosage": "500mg",
            "instructions": "Twice daily after meals",
            "date_issued": date_issued,
            "follow_up_date": null
        })
    }

    pub fn audit_row(
        id: i64,
        appointment_id: i64,
        new_status: &str,
        notes: &str,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "appointment_id": appointment_id,
            "doctor_id": 5,
            "patient_id": 42,
            "old_status": "Scheduled",
            "new_status": new_status,
            "changed_at": "2025-01-15T10:30:00Z",
            "notes": notes
        })
    }

    pub fn vaccine_check_row(id: i64, age: i32, gender: &str) -> serde_json::Value {
        json!({
            "id": id,
            "patient_id": null,
            "age": age,
            "gender": gender,
            "received_vaccines": ["MMR"],
            "mandatory_vaccines": ["Influenza", "Tdap"],
            "optional_vaccines": ["HPV"],
            "checked_at": "2025-01-15T10:30:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "error": {
                "message": message,
                "code": code
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.gateway_url, "http://localhost:54321");
        assert_eq!(app_config.gateway_api_key, "test-api-key");
        assert!(!app_config.jwt_secret.is_empty());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::doctor("doc@example.com");
        assert_eq!(user.email, "doc@example.com");
        assert_eq!(user.role, "doctor");

        let user_model = user.to_user();
        assert_eq!(user_model.email, Some(user.email.clone()));
        assert_eq!(user_model.role, Some(user.role.clone()));
        assert_eq!(user_model.id, user.id);
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::default();
        let secret = "test-secret";
        let token = JwtTestUtils::create_test_token(&user, secret, Some(1));

        assert!(token.contains('.'));
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn validate_token_round_trip() {
        let user = TestUser::with_id(42, "roundtrip@example.com", "doctor");
        let secret = "round-trip-secret";
        let token = JwtTestUtils::create_test_token(&user, secret, Some(1));

        let validated = crate::jwt::validate_token(&token, secret).unwrap();
        assert_eq!(validated.id, "42");
        assert_eq!(validated.role, Some("doctor".to_string()));
    }

    #[test]
    fn validate_token_rejects_expired() {
        let user = TestUser::default();
        let secret = "expiry-secret";
        let token = JwtTestUtils::create_expired_token(&user, secret);

        assert!(crate::jwt::validate_token(&token, secret).is_err());
    }
}
