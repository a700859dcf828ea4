//! Typed client for the ViaCEP postal code service.
//!
//! Base URL: `viacep.com.br/ws`. A lookup is `GET {base}/{cep}/json/`.
//! Unknown codes come back as `200 {"erro": true}` rather than a 404.

use std::time::Duration;

use async_trait::async_trait;
use regcheck_core::{LookupCollaborator, LookupError};
use serde::{Deserialize, Serialize};

use crate::config::PostalConfig;
use crate::error::ClientError;

// -- Types matching the ViaCEP schema -----------------------------------------

/// Raw ViaCEP response. Field names are the service's own.
///
/// Every field defaults so that both the match body and the `{"erro": true}`
/// body deserialize.
#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    erro: Option<serde_json::Value>,
    #[serde(default)]
    cep: String,
    #[serde(default)]
    logradouro: String,
    #[serde(default)]
    complemento: String,
    #[serde(default)]
    bairro: String,
    #[serde(default)]
    localidade: String,
    #[serde(default)]
    uf: String,
    #[serde(default)]
    ibge: String,
    #[serde(default)]
    gia: String,
    #[serde(default)]
    ddd: String,
    #[serde(default)]
    siafi: String,
}

impl ViaCepResponse {
    fn not_found(&self) -> bool {
        match &self.erro {
            Some(serde_json::Value::Bool(flag)) => *flag,
            Some(serde_json::Value::String(s)) => s == "true",
            _ => false,
        }
    }
}

/// Address resolved from a postal code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalAddress {
    pub cep: String,
    pub street: String,
    pub complement: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub ibge: String,
    pub gia: String,
    pub ddd: String,
    pub siafi: String,
}

impl From<ViaCepResponse> for PostalAddress {
    fn from(r: ViaCepResponse) -> Self {
        Self {
            cep: r.cep,
            street: r.logradouro,
            complement: r.complemento,
            neighborhood: r.bairro,
            city: r.localidade,
            state: r.uf,
            ibge: r.ibge,
            gia: r.gia,
            ddd: r.ddd,
            siafi: r.siafi,
        }
    }
}

// -- Client -------------------------------------------------------------------

/// Client for the ViaCEP API.
#[derive(Debug, Clone)]
pub struct ViaCepClient {
    http: reqwest::Client,
    base_url: url::Url,
}

impl ViaCepClient {
    /// Create a postal client from configuration.
    pub fn new(config: &PostalConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ClientError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    /// Resolve an 8-digit postal code.
    ///
    /// Calls `GET {base_url}/{cep}/json/`. Returns `Ok(None)` when the
    /// service reports the code as unknown.
    pub async fn lookup_address(&self, cep: &str) -> Result<Option<PostalAddress>, ClientError> {
        let endpoint = format!("GET /{cep}/json/");
        let url = crate::join_url(&self.base_url, &format!("{cep}/json/"));

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        let body: ViaCepResponse = crate::read_json(&endpoint, resp).await?;
        if body.not_found() {
            tracing::debug!(cep, "postal code not found");
            return Ok(None);
        }
        Ok(Some(body.into()))
    }
}

#[async_trait]
impl LookupCollaborator for ViaCepClient {
    type Record = PostalAddress;

    async fn lookup(&self, canonical: &str) -> Result<Option<PostalAddress>, LookupError> {
        Ok(self.lookup_address(canonical).await?)
    }
}
