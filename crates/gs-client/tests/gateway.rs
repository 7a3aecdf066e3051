use gs_client::{EndpointCatalog, GeoStatClient};
use gs_core::{Config, Error, Gateway, ParamKind};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> GeoStatClient {
  let config = Config { rate_limit: 6000, ..Config::default_with_base_url(server.uri()) };
  GeoStatClient::new(config).expect("client")
}

#[tokio::test]
async fn test_fetch_sends_param_as_query_string() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/demografia/poblacion-sexo"))
    .and(query_param("ubigeo", "150101"))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_json(json!({"hombres": 2, "mujeres": 3, "poblacion_total": 5})),
    )
    .expect(1)
    .mount(&server)
    .await;

  let client = client_for(&server);
  let raw = assert_ok!(client.fetch("poblacion_sexo", ParamKind::LocationCode, "150101").await);
  assert_eq!(raw["poblacion_total"], json!(5));
}

#[tokio::test]
async fn test_fetch_batch_posts_code_list() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/territorio/centros-poblados"))
    .and(body_json(json!({"codigos": ["0101", "0102"]})))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{"id": "A1"}]})))
    .expect(1)
    .mount(&server)
    .await;

  let client = client_for(&server);
  let codes = vec!["0101".to_string(), "0102".to_string()];
  let raw = client.fetch_batch("centros_poblados", &codes).await.unwrap();
  assert_eq!(raw, json!({"data": [{"id": "A1"}]}));
}

#[tokio::test]
async fn test_server_error_is_http_error() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/salud/seguro"))
    .respond_with(ResponseTemplate::new(500))
    .mount(&server)
    .await;

  let client = client_for(&server);
  let err = assert_err!(client.fetch("seguro_salud", ParamKind::District, "0101").await);
  assert!(matches!(err, Error::Http(_)), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_rate_limited_response() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .respond_with(ResponseTemplate::new(429))
    .mount(&server)
    .await;

  let client = client_for(&server);
  let err = client.fetch("religion", ParamKind::LocationCode, "1").await.unwrap_err();
  assert!(matches!(err, Error::RateLimit(_)));
}

#[tokio::test]
async fn test_error_envelope_is_api_error() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/cultura/idioma"))
    .respond_with(
      ResponseTemplate::new(200).set_body_json(json!({"success": false, "message": "sin datos"})),
    )
    .mount(&server)
    .await;

  let client = client_for(&server);
  let err = client.fetch("idioma", ParamKind::LocationCode, "1").await.unwrap_err();
  assert_eq!(err.to_string(), "API error: sin datos");
}

#[tokio::test]
async fn test_invalid_json_is_parse_error() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
    .mount(&server)
    .await;

  let client = client_for(&server);
  let err = client.fetch("religion", ParamKind::LocationCode, "1").await.unwrap_err();
  assert!(matches!(err, Error::Parse(_)));
}

#[tokio::test]
async fn test_api_key_sent_as_bearer_token() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(header("authorization", "Bearer secret"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
    .expect(1)
    .mount(&server)
    .await;

  let config = Config {
    api_key: Some("secret".to_string()),
    rate_limit: 6000,
    ..Config::default_with_base_url(server.uri())
  };
  let client = GeoStatClient::new(config).unwrap();
  let raw = client.fetch("religion", ParamKind::LocationCode, "1").await.unwrap();
  assert_eq!(raw, json!([]));
}

#[tokio::test]
async fn test_custom_catalog_entry() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/transporte/vias"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"via": "Panamericana"}])))
    .mount(&server)
    .await;

  let client = client_for(&server)
    .with_endpoints(EndpointCatalog::with_defaults().with_endpoint("vias", "transporte/vias"));
  assert!(client.supports("vias"));
  let raw = client.fetch("vias", ParamKind::Province, "0101").await.unwrap();
  assert_eq!(raw[0]["via"], json!("Panamericana"));
}
