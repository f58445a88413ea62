//! Mexican postal-code lookup backed by the Copomex service.
//!
//! The wire call lives behind [`PostalTransport`]; this module owns input
//! validation, error translation and the normalization of the two response
//! shapes the service is known to produce. Anything the decoders do not
//! recognize is treated as "not found" rather than guessed at.

use crate::constants::POSTAL_TIMEOUT_SECS;
use crate::error::{PostalError, PostalResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// Normalized postal-code information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostalInfo {
    #[serde(rename = "colonias")]
    pub neighborhoods: Vec<String>,
    #[serde(rename = "municipio")]
    pub municipality: String,
    #[serde(rename = "estado")]
    pub state: String,
}

/// Outbound transport for postal lookups.
///
/// Implementations perform one bounded request for an already-validated code
/// and translate every wire failure into [`PostalError::LookupTimeout`] or
/// [`PostalError::LookupTransportError`]. Shape interpretation stays in
/// [`PostalService`].
pub trait PostalTransport: Send + Sync {
    /// Fetches the raw JSON document for a postal code.
    fn fetch(&self, postal_code: &str) -> impl Future<Output = PostalResult<Value>> + Send;
}

/// Copomex-backed transport with the service's 5-second deadline.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpTransport {
    /// Creates a transport against `base_url` using `token` for access.
    ///
    /// # Errors
    ///
    /// Returns [`PostalError::LookupTransportError`] when the HTTP client
    /// cannot be constructed.
    pub fn new(base_url: &str, token: &str) -> PostalResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(POSTAL_TIMEOUT_SECS))
            .build()
            .map_err(|e| PostalError::LookupTransportError(e.to_string()))?;
        Ok(HttpTransport {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }
}

impl PostalTransport for HttpTransport {
    async fn fetch(&self, postal_code: &str) -> PostalResult<Value> {
        let url = format!("{}/{}?token={}", self.base_url, postal_code, self.token);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(classify_reqwest_error)?;
        let response = response
            .error_for_status()
            .map_err(classify_reqwest_error)?;
        response
            .json::<Value>()
            .await
            .map_err(classify_reqwest_error)
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> PostalError {
    if e.is_timeout() {
        PostalError::LookupTimeout(POSTAL_TIMEOUT_SECS)
    } else {
        PostalError::LookupTransportError(e.to_string())
    }
}

/// Checks a candidate postal code: exactly five ASCII digits.
///
/// # Errors
///
/// Returns [`PostalError::InvalidPostalCode`] otherwise.
pub fn validate_postal_code(postal_code: &str) -> PostalResult<()> {
    if postal_code.len() != 5 || !postal_code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PostalError::InvalidPostalCode(postal_code.to_string()));
    }
    Ok(())
}

/// Entry of the list-shaped response: `[{"response": {...}}, ...]`.
#[derive(Debug, Deserialize)]
struct EntryEnvelope {
    #[serde(default)]
    response: EntryFields,
}

#[derive(Debug, Default, Deserialize)]
struct EntryFields {
    #[serde(default)]
    municipio: String,
    #[serde(default)]
    estado: String,
    #[serde(default)]
    asentamiento: String,
}

/// Object-shaped response: `{"response": {"colonia": [...]}}`.
#[derive(Debug, Deserialize)]
struct WrappedEnvelope {
    response: ColoniaSection,
}

#[derive(Debug, Default, Deserialize)]
struct ColoniaSection {
    #[serde(default)]
    colonia: Vec<Colonia>,
}

/// Colonia entries mix detailed objects and bare names. `Detailed` must be
/// tried first: a bare string can never match it, while an object (however
/// sparse) always does.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Colonia {
    Detailed {
        #[serde(default)]
        nombre: String,
        #[serde(default)]
        municipio: String,
        #[serde(default)]
        estado: String,
    },
    Bare(String),
}

/// Truthiness the way the upstream's original consumers judged it: empty
/// strings, empty containers, zero and null all count as "no data".
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

/// Normalizes a raw Copomex document into [`PostalInfo`].
///
/// Unrecognized shapes fail closed as [`PostalError::LookupNotFound`]
/// instead of producing partially-decoded data.
fn decode_response(postal_code: &str, data: Value) -> PostalResult<PostalInfo> {
    let not_found = || PostalError::LookupNotFound(postal_code.to_string());

    match &data {
        Value::Array(entries) if entries.is_empty() => Err(not_found()),
        Value::Array(_) => {
            let entries: Vec<EntryEnvelope> =
                serde_json::from_value(data).map_err(|_| not_found())?;
            let first = &entries[0].response;
            Ok(PostalInfo {
                municipality: first.municipio.clone(),
                state: first.estado.clone(),
                neighborhoods: entries
                    .iter()
                    .map(|entry| entry.response.asentamiento.clone())
                    .collect(),
            })
        }
        Value::Object(fields) => {
            let upstream_error = fields.get("error").is_some_and(is_truthy);
            let usable_response = fields.get("response").is_some_and(is_truthy);
            if upstream_error || !usable_response {
                return Err(not_found());
            }

            let wrapped: WrappedEnvelope =
                serde_json::from_value(data).map_err(|_| not_found())?;
            let colonias = wrapped.response.colonia;
            let (municipality, state) = match colonias.first() {
                Some(Colonia::Detailed {
                    municipio, estado, ..
                }) => (municipio.clone(), estado.clone()),
                _ => (String::new(), String::new()),
            };
            Ok(PostalInfo {
                neighborhoods: colonias
                    .into_iter()
                    .map(|colonia| match colonia {
                        Colonia::Detailed { nombre, .. } => nombre,
                        Colonia::Bare(name) => name,
                    })
                    .collect(),
                municipality,
                state,
            })
        }
        _ => Err(not_found()),
    }
}

/// Postal lookup front door: validate, fetch, normalize.
#[derive(Debug, Clone)]
pub struct PostalService<T: PostalTransport> {
    transport: T,
}

impl<T: PostalTransport> PostalService<T> {
    /// Creates a service over the given transport.
    pub fn new(transport: T) -> Self {
        PostalService { transport }
    }

    /// Looks up a five-digit Mexican postal code.
    ///
    /// # Errors
    ///
    /// * [`PostalError::InvalidPostalCode`] before any network traffic
    /// * [`PostalError::LookupTimeout`] when the deadline passes
    /// * [`PostalError::LookupTransportError`] for every other wire failure
    /// * [`PostalError::LookupNotFound`] for upstream error replies, empty
    ///   result sets and shapes the decoders do not recognize
    pub async fn lookup(&self, postal_code: &str) -> PostalResult<PostalInfo> {
        validate_postal_code(postal_code)?;
        let raw = self.transport.fetch(postal_code).await?;
        decode_response(postal_code, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixtureTransport {
        payload: Value,
        calls: AtomicUsize,
    }

    impl FixtureTransport {
        fn new(payload: Value) -> Self {
            FixtureTransport {
                payload,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl PostalTransport for FixtureTransport {
        async fn fetch(&self, _postal_code: &str) -> PostalResult<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.payload.clone())
        }
    }

    struct TimeoutTransport;

    impl PostalTransport for TimeoutTransport {
        async fn fetch(&self, _postal_code: &str) -> PostalResult<Value> {
            Err(PostalError::LookupTimeout(POSTAL_TIMEOUT_SECS))
        }
    }

    #[test]
    fn validation_requires_exactly_five_ascii_digits() {
        assert!(validate_postal_code("22000").is_ok());
        assert!(validate_postal_code("06000").is_ok());

        for bad in ["", "2200", "220000", "22a00", "2200 ", "２２０００"] {
            let err = validate_postal_code(bad).expect_err("must reject");
            match err {
                PostalError::InvalidPostalCode(code) => assert_eq!(code, bad),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn invalid_codes_never_reach_the_transport() {
        let transport = FixtureTransport::new(json!([]));
        let service = PostalService::new(transport);

        for bad in ["abc12", "1234", "123456"] {
            let err = service.lookup(bad).await.expect_err("invalid code");
            assert!(matches!(err, PostalError::InvalidPostalCode(_)));
        }
        assert_eq!(service.transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn decodes_the_list_shape() {
        // Municipality and state come from the first entry only.
        let payload = json!([
            {"response": {"asentamiento": "Centro", "municipio": "Tijuana", "estado": "Baja California"}},
            {"response": {"asentamiento": "Zona Norte"}}
        ]);
        let service = PostalService::new(FixtureTransport::new(payload));

        let info = service.lookup("22000").await.expect("lookup succeeds");
        assert_eq!(info.neighborhoods, vec!["Centro", "Zona Norte"]);
        assert_eq!(info.municipality, "Tijuana");
        assert_eq!(info.state, "Baja California");
    }

    #[tokio::test]
    async fn list_entries_missing_fields_become_empty_strings() {
        let payload = json!([
            {"response": {"asentamiento": "Centro"}},
            {"response": {}},
            {}
        ]);
        let service = PostalService::new(FixtureTransport::new(payload));

        let info = service.lookup("22000").await.expect("lookup succeeds");
        assert_eq!(info.neighborhoods, vec!["Centro", "", ""]);
        assert_eq!(info.municipality, "");
        assert_eq!(info.state, "");
    }

    #[tokio::test]
    async fn decodes_the_wrapped_shape_with_detailed_colonias() {
        let payload = json!({
            "error": false,
            "response": {
                "colonia": [
                    {"nombre": "Centro", "municipio": "Monterrey", "estado": "Nuevo León"},
                    {"nombre": "Obispado", "municipio": "Monterrey", "estado": "Nuevo León"}
                ]
            }
        });
        let service = PostalService::new(FixtureTransport::new(payload));

        let info = service.lookup("64000").await.expect("lookup succeeds");
        assert_eq!(info.neighborhoods, vec!["Centro", "Obispado"]);
        assert_eq!(info.municipality, "Monterrey");
        assert_eq!(info.state, "Nuevo León");
    }

    #[tokio::test]
    async fn decodes_the_wrapped_shape_with_mixed_elements() {
        let payload = json!({
            "response": {
                "colonia": [
                    {"nombre": "Centro", "municipio": "X", "estado": "Y"},
                    "Hidalgo"
                ]
            }
        });
        let service = PostalService::new(FixtureTransport::new(payload));

        let info = service.lookup("64000").await.expect("lookup succeeds");
        assert_eq!(info.neighborhoods, vec!["Centro", "Hidalgo"]);
        assert_eq!(info.municipality, "X");
        assert_eq!(info.state, "Y");
    }

    #[tokio::test]
    async fn decodes_the_wrapped_shape_with_bare_names() {
        let payload = json!({
            "response": {"colonia": ["Centro", "Americana"]}
        });
        let service = PostalService::new(FixtureTransport::new(payload));

        let info = service.lookup("44100").await.expect("lookup succeeds");
        assert_eq!(info.neighborhoods, vec!["Centro", "Americana"]);
        assert_eq!(info.municipality, "");
        assert_eq!(info.state, "");
    }

    #[tokio::test]
    async fn wrapped_shape_without_colonias_is_empty_success() {
        let payload = json!({"response": {"cp": "44100"}});
        let service = PostalService::new(FixtureTransport::new(payload));

        let info = service.lookup("44100").await.expect("lookup succeeds");
        assert!(info.neighborhoods.is_empty());
        assert_eq!(info.municipality, "");
    }

    #[tokio::test]
    async fn empty_list_is_not_found() {
        let service = PostalService::new(FixtureTransport::new(json!([])));
        let err = service.lookup("99999").await.expect_err("must fail");
        assert!(matches!(err, PostalError::LookupNotFound(code) if code == "99999"));
    }

    #[tokio::test]
    async fn upstream_error_flags_are_not_found() {
        for payload in [
            json!({"error": true, "response": {"colonia": ["Centro"]}}),
            json!({"error": "CP no existe", "response": {"colonia": ["Centro"]}}),
            json!({"error": false, "response": {}}),
            json!({"error": false, "response": null}),
            json!({"code": 404}),
        ] {
            let service = PostalService::new(FixtureTransport::new(payload));
            let err = service.lookup("12345").await.expect_err("must fail");
            assert!(matches!(err, PostalError::LookupNotFound(_)));
        }
    }

    #[tokio::test]
    async fn unrecognized_shapes_fail_closed() {
        for payload in [
            json!("unexpected"),
            json!(42),
            json!([1, 2, 3]),
            json!(["Centro", "Zona Norte"]),
            json!({"response": "truthy but not a document"}),
            json!({"response": {"colonia": [{"nombre": "Centro"}, 7]}}),
        ] {
            let service = PostalService::new(FixtureTransport::new(payload));
            let err = service.lookup("22000").await.expect_err("must fail");
            assert!(
                matches!(err, PostalError::LookupNotFound(_)),
                "shape should fail closed as not-found"
            );
        }
    }

    #[tokio::test]
    async fn transport_failures_pass_through() {
        let service = PostalService::new(TimeoutTransport);
        let err = service.lookup("22000").await.expect_err("must fail");
        assert!(matches!(err, PostalError::LookupTimeout(5)));
    }

    #[test]
    fn http_transport_builds_and_trims_the_base_url() {
        let transport = HttpTransport::new("https://api.copomex.com/query/info_cp/", "pruebas")
            .expect("client builds");
        assert_eq!(transport.base_url, "https://api.copomex.com/query/info_cp");
    }
}
