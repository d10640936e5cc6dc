use careid_server::auth::AuthenticatedPrincipal;
use careid_server::clients::ProfileLookupClient;
use careid_server::config::ProfileLookupConfig;
use careid_server::db::Role;
use careid_server::error::ClientError;
use careid_server::AppError;
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn client(server: &MockServer) -> ProfileLookupClient {
    ProfileLookupClient::new(&ProfileLookupConfig {
        base_url: server.uri(),
        timeout_secs: 1,
    })
    .unwrap()
}

fn caller() -> AuthenticatedPrincipal {
    AuthenticatedPrincipal {
        user_id: Uuid::now_v7(),
        role: Role::Patient,
        token: "caller-token".to_string(),
    }
}

fn doctor_json(id: Uuid) -> serde_json::Value {
    json!({
        "id": id,
        "role": "doctor",
        "first_name": "Anan",
        "last_name": "Chai",
        "gender": "male",
        "phone_number": "0830000000",
        "username": "dr.anan",
        "specialty": "Orthopedics",
        "bio": null,
        "years_experience": 8,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-02T00:00:00Z"
    })
}

#[tokio::test]
async fn test_lookup_forwards_caller_token() {
    let server = MockServer::start().await;
    let id = Uuid::now_v7();
    Mock::given(method("GET"))
        .and(path(format!("/v1/doctor/{}", id)))
        .and(header("cookie", "access_token=caller-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(doctor_json(id)))
        .expect(1)
        .mount(&server)
        .await;

    let doctor = client(&server).get_doctor_by_id(&caller(), id).await.unwrap();
    assert_eq!(doctor.id, id);
    assert_eq!(doctor.username, "dr.anan");
    assert_eq!(doctor.years_experience, Some(8));
}

#[tokio::test]
async fn test_non_success_status_is_unexpected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = client(&server).get_doctor_by_id(&caller(), Uuid::now_v7()).await;
    assert!(matches!(result, Err(AppError::ClientError(ClientError::UnexpectedStatus(_)))));
}

#[tokio::test]
async fn test_timeout_is_unexpected_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let result = client(&server).get_patient_by_id(&caller(), Uuid::now_v7()).await;
    assert!(matches!(result, Err(AppError::ClientError(ClientError::UnexpectedStatus(_)))));
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let result = client(&server).get_doctor_by_id(&caller(), Uuid::now_v7()).await;
    assert!(matches!(result, Err(AppError::ClientError(ClientError::InvalidResponse(_)))));
}
