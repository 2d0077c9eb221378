use crate::domain::model::{
    Attendance, AttendanceId, Enrollment, EnrollmentId, NewSubstitutionRequest, OfferingId,
    Session, SessionDetail, SessionId, StudentId, SubstitutionRequest,
};
use crate::domain::ports::{
    AttendanceStore, ConfigProvider, EnrollmentStore, SessionStore, SubstitutionStore,
};
use crate::utils::error::{LedgerError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// REST client for the school backend. Implements every store port.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl HttpBackend {
    pub fn new<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds()))
            .build()?;
        Self::with_client(client, config.api_base_url(), config.auth_token())
    }

    pub fn with_client(client: Client, base_url: &str, auth_token: Option<&str>) -> Result<Self> {
        // Url::join drops the last path segment unless the base ends in '/'.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized).map_err(|e| LedgerError::InvalidConfigValueError {
            field: "api_base_url".to_string(),
            value: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            auth_token: auth_token.map(str::to_string),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| LedgerError::ConfigError {
                message: format!("cannot build endpoint '{}': {}", path, e),
            })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        entity: &'static str,
        id: Option<String>,
    ) -> Result<T> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        tracing::debug!("Backend answered {} for {}", status, entity);

        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => LedgerError::NotFoundError {
                entity,
                id: id.unwrap_or_default(),
            },
            StatusCode::CONFLICT => LedgerError::conflict(body),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                LedgerError::validation(body)
            }
            other => LedgerError::BackendError {
                status: other.as_u16(),
                message: body,
            },
        })
    }
}

#[async_trait]
impl SessionStore for HttpBackend {
    async fn sessions_on_date(&self, date: NaiveDate) -> Result<Vec<Session>> {
        let url = self.endpoint("sessions")?;
        let request = self
            .client
            .get(url)
            .query(&[("date", date.to_string())]);
        self.send(request, "sessions", None).await
    }

    async fn sessions_for_offering(
        &self,
        offering_id: OfferingId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<Session>> {
        let url = self.endpoint("sessions")?;
        let mut query = vec![("offering_id", offering_id.to_string())];
        if let Some(from) = from {
            query.push(("from", from.to_string()));
        }
        if let Some(to) = to {
            query.push(("to", to.to_string()));
        }
        let request = self.client.get(url).query(&query);
        self.send(request, "offering", Some(offering_id.to_string()))
            .await
    }

    async fn session_detail(&self, session_id: SessionId) -> Result<SessionDetail> {
        let url = self.endpoint(&format!("sessions/{}", session_id))?;
        self.send(self.client.get(url), "session", Some(session_id.to_string()))
            .await
    }
}

#[async_trait]
impl EnrollmentStore for HttpBackend {
    async fn enrollment(&self, enrollment_id: EnrollmentId) -> Result<Enrollment> {
        let url = self.endpoint(&format!("enrollments/{}", enrollment_id))?;
        self.send(
            self.client.get(url),
            "enrollment",
            Some(enrollment_id.to_string()),
        )
        .await
    }
}

#[async_trait]
impl AttendanceStore for HttpBackend {
    async fn attendances_for_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Vec<Attendance>> {
        let url = self.endpoint("attendances")?;
        let request = self
            .client
            .get(url)
            .query(&[("enrollment_id", enrollment_id.to_string())]);
        self.send(request, "enrollment", Some(enrollment_id.to_string()))
            .await
    }

    async fn attendance(&self, attendance_id: AttendanceId) -> Result<Attendance> {
        let url = self.endpoint(&format!("attendances/{}", attendance_id))?;
        self.send(
            self.client.get(url),
            "attendance",
            Some(attendance_id.to_string()),
        )
        .await
    }

    async fn mark_present(&self, attendance_id: AttendanceId) -> Result<Attendance> {
        let url = self.endpoint(&format!("attendances/{}/present", attendance_id))?;
        self.send(
            self.client.put(url),
            "attendance",
            Some(attendance_id.to_string()),
        )
        .await
    }

    async fn mark_absent(&self, attendance_id: AttendanceId) -> Result<Attendance> {
        let url = self.endpoint(&format!("attendances/{}/absent", attendance_id))?;
        self.send(
            self.client.put(url),
            "attendance",
            Some(attendance_id.to_string()),
        )
        .await
    }
}

#[async_trait]
impl SubstitutionStore for HttpBackend {
    async fn create_request(&self, request: NewSubstitutionRequest) -> Result<SubstitutionRequest> {
        let url = self.endpoint("substitution-requests")?;
        tracing::debug!(
            "Posting substitution request for attendance {}",
            request.original_attendance_id
        );
        self.send(
            self.client.post(url).json(&request),
            "substitution request",
            None,
        )
        .await
    }

    async fn requests_for_student(&self, student_id: StudentId) -> Result<Vec<SubstitutionRequest>> {
        let url = self.endpoint("substitution-requests")?;
        let request = self
            .client
            .get(url)
            .query(&[("student_id", student_id.to_string())]);
        self.send(request, "student", Some(student_id.to_string()))
            .await
    }
}
