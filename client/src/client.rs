//! Ticketr backend REST client

use crate::{
    error::ApiError,
    types::{
        Created, CreatedEvent, CreatedTicket, Event, EventDraft, EventId, NewOrganization,
        NewPayment, NewTicket, NewUser, Organization, OrganizationId, PaymentReceipt,
        PaymentRecord, Ticket, TicketId, TicketStatus, User, UserId,
    },
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Base URL used when none is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Ticketr backend client.
///
/// One method per REST call. Every call is a single attempt: no retries, no
/// backoff. Non-2xx answers become [`ApiError::Api`] carrying the backend's
/// message.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for the backend at `base_url` (e.g. `http://localhost:5000/api`)
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Create a client from `TICKETR_API_URL` and `TICKETR_API_TOKEN`
    #[must_use]
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("TICKETR_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let client = Self::new(base_url);
        match std::env::var("TICKETR_API_TOKEN") {
            Ok(token) if !token.trim().is_empty() => client.with_token(token),
            _ => client,
        }
    }

    /// Send `Authorization: Bearer <token>` with every request
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Apply a whole-request timeout
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidConfig`] if the HTTP client cannot be built.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ApiError> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::InvalidConfig(e.to_string()))?;
        Ok(self)
    }

    /// Base URL without trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute(&self, request: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            let err = ApiError::from_response(status.as_u16(), &body);
            tracing::debug!(status = status.as_u16(), error = %err, "Backend rejected request");
            Err(err)
        }
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        self.execute(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ApiError::ResponseParseFailed(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        tracing::debug!(path, "GET");
        self.json(self.client.get(self.url(path))).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::debug!(path, "POST");
        self.json(self.client.post(self.url(path)).json(body)).await
    }

    async fn put<B>(&self, path: &str, body: &B) -> Result<(), ApiError>
    where
        B: serde::Serialize + ?Sized,
    {
        tracing::debug!(path, "PUT");
        self.execute(self.client.put(self.url(path)).json(body))
            .await
            .map(|_| ())
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        tracing::debug!(path, "DELETE");
        self.execute(self.client.delete(self.url(path)))
            .await
            .map(|_| ())
    }

    // ========================================================================
    // Tickets
    // ========================================================================

    /// `POST /tickets`
    ///
    /// # Errors
    ///
    /// Transport, backend and decode failures as [`ApiError`].
    #[tracing::instrument(skip(self, ticket), fields(event_id = %ticket.event_id, user_id = %ticket.user_id))]
    pub async fn create_ticket(&self, ticket: &NewTicket) -> Result<CreatedTicket, ApiError> {
        self.post("tickets", ticket).await
    }

    /// `GET /tickets/{id}`
    ///
    /// # Errors
    ///
    /// [`ApiError::Api`] with status 404 when the ticket does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn ticket(&self, ticket_id: TicketId) -> Result<Ticket, ApiError> {
        self.get(&format!("tickets/{ticket_id}")).await
    }

    /// `GET /tickets/by_user/{id}`
    ///
    /// # Errors
    ///
    /// Transport, backend and decode failures as [`ApiError`].
    #[tracing::instrument(skip(self))]
    pub async fn user_tickets(&self, user_id: UserId) -> Result<Vec<Ticket>, ApiError> {
        self.get(&format!("tickets/by_user/{user_id}")).await
    }

    /// `GET /tickets/event/{id}`
    ///
    /// # Errors
    ///
    /// Transport, backend and decode failures as [`ApiError`].
    #[tracing::instrument(skip(self))]
    pub async fn event_tickets(&self, event_id: EventId) -> Result<Vec<Ticket>, ApiError> {
        self.get(&format!("tickets/event/{event_id}")).await
    }

    /// `PUT /tickets/{id}` with `{"ticket_status": ...}`
    ///
    /// # Errors
    ///
    /// Transport and backend failures as [`ApiError`].
    #[tracing::instrument(skip(self))]
    pub async fn update_ticket_status(
        &self,
        ticket_id: TicketId,
        status: TicketStatus,
    ) -> Result<(), ApiError> {
        self.put(
            &format!("tickets/{ticket_id}"),
            &serde_json::json!({ "ticket_status": status }),
        )
        .await
    }

    // ========================================================================
    // Payments
    // ========================================================================

    /// `POST /payments`
    ///
    /// # Errors
    ///
    /// Transport, backend and decode failures as [`ApiError`].
    #[tracing::instrument(skip(self, payment), fields(user_id = %payment.user_id, amount = %payment.amount))]
    pub async fn create_payment(&self, payment: &NewPayment) -> Result<PaymentReceipt, ApiError> {
        self.post("payments", payment).await
    }

    /// `GET /payments/by_user/{id}`
    ///
    /// # Errors
    ///
    /// Transport, backend and decode failures as [`ApiError`].
    #[tracing::instrument(skip(self))]
    pub async fn user_payments(&self, user_id: UserId) -> Result<Vec<PaymentRecord>, ApiError> {
        self.get(&format!("payments/by_user/{user_id}")).await
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// `GET /events`
    ///
    /// # Errors
    ///
    /// Transport, backend and decode failures as [`ApiError`].
    pub async fn events(&self) -> Result<Vec<Event>, ApiError> {
        self.get("events").await
    }

    /// `GET /events/{id}`
    ///
    /// # Errors
    ///
    /// [`ApiError::Api`] with status 404 when the event does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn event(&self, event_id: EventId) -> Result<Event, ApiError> {
        self.get(&format!("events/{event_id}")).await
    }

    /// `POST /events`
    ///
    /// # Errors
    ///
    /// Transport, backend and decode failures as [`ApiError`].
    pub async fn create_event(&self, draft: &EventDraft) -> Result<CreatedEvent, ApiError> {
        self.post("events", draft).await
    }

    /// `PUT /events/{id}`
    ///
    /// # Errors
    ///
    /// Transport and backend failures as [`ApiError`].
    pub async fn update_event(&self, event_id: EventId, draft: &EventDraft) -> Result<(), ApiError> {
        self.put(&format!("events/{event_id}"), draft).await
    }

    /// `DELETE /events/{id}`
    ///
    /// # Errors
    ///
    /// [`ApiError::Api`] with status 404 when the event does not exist.
    pub async fn delete_event(&self, event_id: EventId) -> Result<(), ApiError> {
        self.delete(&format!("events/{event_id}")).await
    }

    // ========================================================================
    // Organizations & users
    // ========================================================================

    /// `GET /organizations`
    ///
    /// # Errors
    ///
    /// Transport, backend and decode failures as [`ApiError`].
    pub async fn organizations(&self) -> Result<Vec<Organization>, ApiError> {
        self.get("organizations").await
    }

    /// `GET /organizations/{id}`
    ///
    /// # Errors
    ///
    /// [`ApiError::Api`] with status 404 when the organization does not exist.
    pub async fn organization(&self, org_id: OrganizationId) -> Result<Organization, ApiError> {
        self.get(&format!("organizations/{org_id}")).await
    }

    /// `POST /organizations`
    ///
    /// # Errors
    ///
    /// Transport, backend and decode failures as [`ApiError`].
    pub async fn create_organization(
        &self,
        org: &NewOrganization,
    ) -> Result<Created<OrganizationId>, ApiError> {
        self.post("organizations", org).await
    }

    /// `GET /users/{id}`
    ///
    /// # Errors
    ///
    /// [`ApiError::Api`] with status 404 when the user does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn user(&self, user_id: UserId) -> Result<User, ApiError> {
        self.get(&format!("users/{user_id}")).await
    }

    /// `POST /users`
    ///
    /// # Errors
    ///
    /// Transport, backend and decode failures as [`ApiError`].
    pub async fn create_user(&self, user: &NewUser) -> Result<Created<UserId>, ApiError> {
        self.post("users", user).await
    }
}
