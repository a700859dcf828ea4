//! Contract tests for ViaCepClient against a simulated ViaCEP service.
//!
//! ViaCEP answers unknown codes with `200 {"erro": true}`, so "not found" is
//! a body-level signal rather than a status code.

use regcheck_client::{ClientError, PostalConfig, ViaCepClient};
use regcheck_core::{
    check_batch, BatchConfig, LookupCollaborator, LookupError, LookupOutcome, PostalNormalizer,
    RawIdentifier,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(mock_server: &MockServer) -> ViaCepClient {
    let config = PostalConfig::new(mock_server.uri().parse().unwrap());
    ViaCepClient::new(&config).unwrap()
}

fn se_square() -> serde_json::Value {
    serde_json::json!({
        "cep": "01001-000",
        "logradouro": "Praça da Sé",
        "complemento": "lado ímpar",
        "bairro": "Sé",
        "localidade": "São Paulo",
        "uf": "SP",
        "ibge": "3550308",
        "gia": "1004",
        "ddd": "11",
        "siafi": "7107"
    })
}

#[tokio::test]
async fn known_code_returns_address() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/01001000/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(se_square()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let address = client.lookup_address("01001000").await.unwrap().unwrap();
    assert_eq!(address.cep, "01001-000");
    assert_eq!(address.street, "Praça da Sé");
    assert_eq!(address.city, "São Paulo");
    assert_eq!(address.state, "SP");
    assert_eq!(address.ddd, "11");
}

#[tokio::test]
async fn erro_body_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/00000000/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"erro": true})))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    assert_eq!(client.lookup("00000000").await, Ok(None));
}

#[tokio::test]
async fn bad_request_maps_to_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/99999999/json/"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Bad Request"))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client.lookup_address("99999999").await.unwrap_err();
    assert!(matches!(err, ClientError::ApiError { status: 400, .. }));
}

#[tokio::test]
async fn slow_service_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/01001000/json/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(se_square())
                .set_delay(std::time::Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let mut config = PostalConfig::new(mock_server.uri().parse().unwrap());
    config.timeout_ms = 50;
    let client = ViaCepClient::new(&config).unwrap();
    assert_eq!(client.lookup("01001000").await, Err(LookupError::Timeout));
}

#[tokio::test]
async fn batch_validates_codes_and_skips_malformed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/01001000/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(se_square()))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/00000000/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"erro": true})))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let raw: Vec<RawIdentifier> = vec!["01001-000".into(), "00000000".into(), "123".into()];
    let result = check_batch(&raw, &PostalNormalizer, &client, &BatchConfig::default())
        .await
        .unwrap();

    let items = result.items();
    assert_eq!(items[0].outcome, LookupOutcome::Registered);
    assert_eq!(items[0].data.as_ref().map(|a| a.city.as_str()), Some("São Paulo"));
    assert_eq!(items[1].outcome, LookupOutcome::NotRegistered);
    assert_eq!(
        items[2].outcome,
        LookupOutcome::Invalid("must have 8 digits".into())
    );
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
}
