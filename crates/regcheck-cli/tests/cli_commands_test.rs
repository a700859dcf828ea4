//! Subcommand tests against simulated bridge and ViaCEP services.

use regcheck_cli::cep::{validate_codes, CepArgs};
use regcheck_cli::check::{check_numbers, CheckArgs};
use regcheck_cli::BatchArgs;
use regcheck_core::LookupOutcome;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn batch_args() -> BatchArgs {
    BatchArgs {
        max_batch_size: 20,
        sub_batch_size: Some(2),
        timeout_ms: 2_000,
    }
}

fn check_args(server: &MockServer, numbers: &[&str]) -> CheckArgs {
    CheckArgs {
        numbers: numbers.iter().map(|n| n.to_string()).collect(),
        bridge_url: server.uri().parse().unwrap(),
        country_code: "55".into(),
        strict: false,
        batch: batch_args(),
    }
}

async fn mount_session(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn check_refuses_when_bridge_is_pairing() {
    let server = MockServer::start().await;
    mount_session(&server, serde_json::json!({"state": "PAIRING", "qr": "2@abc"})).await;
    Mock::given(method("POST"))
        .and(path("/contacts/lookup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"registered": true})))
        .expect(0)
        .mount(&server)
        .await;

    let err = check_numbers(&check_args(&server, &["11987654321"]))
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("not ready"));
}

#[tokio::test]
async fn check_reports_each_number_when_connected() {
    let server = MockServer::start().await;
    mount_session(&server, serde_json::json!({"state": "CONNECTED"})).await;
    Mock::given(method("POST"))
        .and(path("/contacts/lookup"))
        .and(body_json(serde_json::json!({"id": "5511987654321@c.us"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"registered": true})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/contacts/lookup"))
        .and(body_json(serde_json::json!({"id": "5511900000000@c.us"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"registered": false})))
        .mount(&server)
        .await;

    let result = check_numbers(&check_args(&server, &["11987654321", "11900000000", "+5511987654321"]))
        .await
        .unwrap();
    let outcomes: Vec<&LookupOutcome> = result.items().iter().map(|i| &i.outcome).collect();
    assert_eq!(
        outcomes,
        [
            &LookupOutcome::Registered,
            &LookupOutcome::NotRegistered,
            &LookupOutcome::Registered
        ]
    );
    assert_eq!(result.error_count(), 0);
}

#[tokio::test]
async fn check_rejects_oversized_batch() {
    let server = MockServer::start().await;
    mount_session(&server, serde_json::json!({"state": "CONNECTED"})).await;

    let mut args = check_args(&server, &["1", "2", "3"]);
    args.batch.max_batch_size = 2;
    let err = check_numbers(&args).await.unwrap_err();
    assert!(format!("{err:#}").contains("maximum limit of 2"));
}

#[tokio::test]
async fn cep_validates_against_postal_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/01001000/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "cep": "01001-000",
            "logradouro": "Praça da Sé",
            "localidade": "São Paulo",
            "uf": "SP"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/00000000/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"erro": "true"})))
        .mount(&server)
        .await;

    let args = CepArgs {
        codes: vec!["01001-000".into(), "00000000".into(), "123".into()],
        api_url: server.uri().parse().unwrap(),
        batch: batch_args(),
    };
    let result = validate_codes(&args).await.unwrap();
    let items = result.items();
    assert_eq!(items[0].outcome, LookupOutcome::Registered);
    assert_eq!(items[0].data.as_ref().map(|a| a.state.as_str()), Some("SP"));
    assert_eq!(items[1].outcome, LookupOutcome::NotRegistered);
    assert_eq!(items[2].outcome, LookupOutcome::Invalid("must have 8 digits".into()));
    assert_eq!(result.error_count(), 1);
}
