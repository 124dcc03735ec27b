use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use jobcode_core::JobcodeError;

// ---------------------------------------------------------------------------
// AppError
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if let Some(e) = self.0.downcast_ref::<JobcodeError>() {
            match e {
                JobcodeError::UnstructuredName(_) => StatusCode::UNPROCESSABLE_ENTITY,
                JobcodeError::SequenceConflict { .. } | JobcodeError::TableExists => {
                    StatusCode::CONFLICT
                }
                JobcodeError::Http { .. } | JobcodeError::Transport(_) => StatusCode::BAD_GATEWAY,
                JobcodeError::Sequence(_)
                | JobcodeError::Config(_)
                | JobcodeError::Io(_)
                | JobcodeError::Yaml(_)
                | JobcodeError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        tracing::error!(%status, error = %format!("{:#}", self.0), "webhook processing failed");
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unstructured_name_maps_to_422() {
        let err = AppError(JobcodeError::UnstructuredName("Website".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn sequence_conflict_maps_to_409() {
        let err = AppError(
            JobcodeError::SequenceConflict {
                client: "ACM".into(),
                attempts: 5,
            }
            .into(),
        );
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn upstream_http_failure_maps_to_502() {
        let err = AppError(
            JobcodeError::Http {
                method: "PUT",
                url: "https://acme.teamwork.com/projects/1.json".into(),
                status: 500,
            }
            .into(),
        );
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn transport_failure_maps_to_502() {
        let err = AppError(JobcodeError::Transport("connection refused".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn sequence_store_failure_maps_to_500() {
        let err = AppError(JobcodeError::Sequence("disk I/O error".into()).into());
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn other_errors_map_to_500() {
        let err = AppError(anyhow::anyhow!("something unexpected"));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_body_is_json() {
        let response = AppError(JobcodeError::Config("bad".into()).into()).into_response();
        let ct = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .expect("should have content-type");
        assert!(ct.to_str().unwrap().contains("application/json"));
    }
}
