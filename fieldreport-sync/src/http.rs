//! HTTP implementation of the remote client.
//!
//! Talks to the occurrences backend (`/occurrences` family of endpoints).
//! The wire structs mirror the backend's JSON keys exactly; everything else
//! in the workspace uses the domain types and never sees these names.

use crate::remote::{BatchOutcome, RemoteClient, RemoteError, RemoteRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fieldreport_types::{GeoPoint, LocalId, OccurrencePatch, OccurrencePayload, RemoteId};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Configuration for the backend API client.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the backend, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nino-backend-ts-mongo.onrender.com".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP client for the occurrences backend.
///
/// The bearer credential is supplied by the auth layer at runtime via
/// [`set_token`](HttpRemoteClient::set_token); its absence is not enforced
/// here — requests simply go out without an `Authorization` header.
pub struct HttpRemoteClient {
    config: ApiConfig,
    client: Client,
    token: RwLock<Option<String>>,
}

impl HttpRemoteClient {
    /// Creates a client for the given backend.
    pub fn new(config: ApiConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("failed to create HTTP client");
        Self {
            config,
            client,
            token: RwLock::new(None),
        }
    }

    /// Sets the bearer credential attached to subsequent requests.
    pub async fn set_token(&self, token: impl Into<String>) {
        *self.token.write().await = Some(token.into());
    }

    /// Clears the bearer credential.
    pub async fn clear_token(&self) {
        *self.token.write().await = None;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token.read().await.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Sends a request and maps the response into the transport/rejected
    /// classification: network errors and 5xx are `Transport`, 4xx are
    /// `Rejected` with the backend's message.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RemoteError> {
        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| RemoteError::Transport(format!("invalid response body: {e}")));
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_message(&body);
        debug!(%status, "backend returned error: {message}");

        if status.is_server_error() {
            Err(RemoteError::Transport(format!("HTTP {status}: {message}")))
        } else {
            Err(RemoteError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn create(&self, payload: &OccurrencePayload) -> Result<RemoteRecord, RemoteError> {
        let body = ApiOccurrenceBody::from_payload(payload);
        let request = self
            .authorize(self.client.post(self.url("/occurrences")))
            .await
            .json(&body);
        let occurrence: ApiOccurrence = self.execute(request).await?;
        Ok(occurrence.into_remote_record())
    }

    async fn update(
        &self,
        id: &RemoteId,
        patch: &OccurrencePatch,
    ) -> Result<RemoteRecord, RemoteError> {
        let body = ApiPatchBody::from_patch(patch);
        let request = self
            .authorize(self.client.patch(self.url(&format!("/occurrences/{id}"))))
            .await
            .json(&body);
        let occurrence: ApiOccurrence = self.execute(request).await?;
        Ok(occurrence.into_remote_record())
    }

    async fn delete(&self, id: &RemoteId) -> Result<(), RemoteError> {
        let request = self
            .authorize(self.client.delete(self.url(&format!("/occurrences/{id}"))))
            .await;
        // The backend answers with a status message body; only a clean
        // decode matters here, not its contents.
        let _body: serde_json::Value = self.execute(request).await?;
        Ok(())
    }

    async fn get(&self, id: &RemoteId) -> Result<RemoteRecord, RemoteError> {
        let request = self
            .authorize(self.client.get(self.url(&format!("/occurrences/{id}"))))
            .await;
        let occurrence: ApiOccurrence = self.execute(request).await?;
        Ok(occurrence.into_remote_record())
    }

    async fn list(&self) -> Result<Vec<RemoteRecord>, RemoteError> {
        let request = self.authorize(self.client.get(self.url("/occurrences"))).await;
        let occurrences: Vec<ApiOccurrence> = self.execute(request).await?;
        Ok(occurrences
            .into_iter()
            .map(ApiOccurrence::into_remote_record)
            .collect())
    }

    async fn list_pending(&self) -> Result<Vec<RemoteRecord>, RemoteError> {
        let request = self
            .authorize(self.client.get(self.url("/occurrences/pending")))
            .await;
        let occurrences: Vec<ApiOccurrence> = self.execute(request).await?;
        Ok(occurrences
            .into_iter()
            .map(ApiOccurrence::into_remote_record)
            .collect())
    }

    async fn batch_create(
        &self,
        items: Vec<(LocalId, OccurrencePayload)>,
    ) -> Result<BatchOutcome, RemoteError> {
        let body: Vec<ApiBatchItem> = items
            .iter()
            .map(|(local_id, payload)| ApiBatchItem {
                local_id: local_id.to_string(),
                body: ApiOccurrenceBody::from_payload(payload),
            })
            .collect();
        let request = self
            .authorize(self.client.post(self.url("/occurrences/sync")))
            .await
            .json(&body);
        let response: ApiBatchResponse = self.execute(request).await?;
        response.into_outcome()
    }
}

fn extract_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.message,
        Err(_) => body.to_string(),
    }
}

fn parse_local_id(raw: Option<String>) -> Option<LocalId> {
    raw.and_then(|s| LocalId::parse(&s).ok())
}

// ── Wire types ───────────────────────────────────────────────────
//
// Field names follow the backend schema and must stay bit-compatible
// with it, not with the domain model.

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiLocation {
    latitude: f64,
    longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    accuracy: Option<f64>,
    #[serde(rename = "capturedAt", skip_serializing_if = "Option::is_none")]
    captured_at: Option<DateTime<Utc>>,
}

impl ApiLocation {
    fn from_domain(location: &GeoPoint) -> Self {
        Self {
            latitude: location.latitude,
            longitude: location.longitude,
            accuracy: location.accuracy,
            captured_at: location.captured_at,
        }
    }

    fn into_domain(self) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy: self.accuracy,
            captured_at: self.captured_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ApiOccurrenceBody {
    tipo: String,
    #[serde(rename = "dataHora")]
    data_hora: DateTime<Utc>,
    viatura: String,
    equipe: String,
    descricao: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fotos: Vec<String>,
    #[serde(rename = "localizacao", skip_serializing_if = "Option::is_none")]
    localizacao: Option<ApiLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assinatura: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notas: Option<String>,
}

impl ApiOccurrenceBody {
    fn from_payload(payload: &OccurrencePayload) -> Self {
        Self {
            tipo: payload.kind.clone(),
            data_hora: payload.occurred_at,
            viatura: payload.vehicle.clone(),
            equipe: payload.team.clone(),
            descricao: payload.description.clone(),
            fotos: payload.photos.clone(),
            localizacao: payload.location.as_ref().map(ApiLocation::from_domain),
            assinatura: payload.signature.clone(),
            notas: payload.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
struct ApiPatchBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    tipo: Option<String>,
    #[serde(rename = "dataHora", skip_serializing_if = "Option::is_none")]
    data_hora: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    viatura: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    equipe: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    descricao: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fotos: Option<Vec<String>>,
    #[serde(rename = "localizacao", skip_serializing_if = "Option::is_none")]
    localizacao: Option<ApiLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assinatura: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notas: Option<String>,
}

impl ApiPatchBody {
    fn from_patch(patch: &OccurrencePatch) -> Self {
        Self {
            tipo: patch.kind.clone(),
            data_hora: patch.occurred_at,
            viatura: patch.vehicle.clone(),
            equipe: patch.team.clone(),
            descricao: patch.description.clone(),
            fotos: patch.photos.clone(),
            localizacao: patch.location.as_ref().map(ApiLocation::from_domain),
            assinatura: patch.signature.clone(),
            notas: patch.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ApiOccurrence {
    #[serde(rename = "_id")]
    id: String,
    tipo: String,
    #[serde(rename = "dataHora")]
    data_hora: DateTime<Utc>,
    viatura: String,
    equipe: String,
    descricao: String,
    #[serde(default)]
    fotos: Vec<String>,
    #[serde(rename = "localizacao")]
    localizacao: Option<ApiLocation>,
    // The backend stores the capture signature under `assinaturaVitimado`;
    // older deployments echo the request's `assinatura` key instead.
    #[serde(default, rename = "assinaturaVitimado", alias = "assinatura")]
    assinatura: Option<String>,
    notas: Option<String>,
    #[serde(rename = "localId")]
    local_id: Option<String>,
    #[serde(rename = "createdAt")]
    created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    updated_at: DateTime<Utc>,
}

impl ApiOccurrence {
    fn into_remote_record(self) -> RemoteRecord {
        RemoteRecord {
            id: RemoteId::new(self.id),
            payload: OccurrencePayload {
                kind: self.tipo,
                occurred_at: self.data_hora,
                vehicle: self.viatura,
                team: self.equipe,
                description: self.descricao,
                photos: self.fotos,
                location: self.localizacao.map(ApiLocation::into_domain),
                signature: self.assinatura,
                notes: self.notas,
            },
            local_id: parse_local_id(self.local_id),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiBatchItem {
    #[serde(rename = "localId")]
    local_id: String,
    #[serde(flatten)]
    body: ApiOccurrenceBody,
}

#[derive(Debug, Deserialize)]
struct ApiBatchAccepted {
    #[serde(rename = "localId")]
    local_id: String,
    #[serde(rename = "_id")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiBatchRejected {
    #[serde(rename = "localId")]
    local_id: String,
    reason: String,
}

#[derive(Debug, Deserialize)]
struct ApiBatchResponse {
    accepted: Vec<ApiBatchAccepted>,
    rejected: Vec<ApiBatchRejected>,
}

impl ApiBatchResponse {
    fn into_outcome(self) -> Result<BatchOutcome, RemoteError> {
        let mut outcome = BatchOutcome::default();
        for item in self.accepted {
            let local_id = LocalId::parse(&item.local_id).map_err(|e| {
                RemoteError::Transport(format!("invalid localId in batch response: {e}"))
            })?;
            outcome.accepted.push((local_id, RemoteId::new(item.id)));
        }
        for item in self.rejected {
            let local_id = LocalId::parse(&item.local_id).map_err(|e| {
                RemoteError::Transport(format!("invalid localId in batch response: {e}"))
            })?;
            outcome.rejected.push((local_id, item.reason));
        }
        Ok(outcome)
    }
}
