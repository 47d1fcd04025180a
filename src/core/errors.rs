use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::relay::service::RelayError;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<RelayError> for AppError {
    fn from(value: RelayError) -> Self {
        match value {
            RelayError::SlotBusy => Self::new(
                StatusCode::TOO_MANY_REQUESTS,
                "Stream already in use. Only one client allowed.",
            ),
            RelayError::UpstreamUnreachable(_) => {
                Self::new(StatusCode::BAD_GATEWAY, "failed to connect to camera stream")
            }
            RelayError::UpstreamBadStatus(status) => {
                let status = if status.is_client_error() || status.is_server_error() {
                    status
                } else {
                    StatusCode::BAD_GATEWAY
                };
                Self::new(status, format!("camera stream unavailable ({status})"))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::relay::service::RelayError;

    use super::AppError;

    fn status_of(err: RelayError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn relay_errors_map_to_http_statuses() {
        assert_eq!(status_of(RelayError::SlotBusy), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            status_of(RelayError::UpstreamUnreachable("refused".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(RelayError::UpstreamBadStatus(StatusCode::SERVICE_UNAVAILABLE)),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(RelayError::UpstreamBadStatus(StatusCode::NOT_FOUND)),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn non_error_upstream_status_becomes_bad_gateway() {
        assert_eq!(
            status_of(RelayError::UpstreamBadStatus(StatusCode::MOVED_PERMANENTLY)),
            StatusCode::BAD_GATEWAY
        );
    }
}
