use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use vn_core::Error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

/// Handler error carrying its HTTP status and the message shown to users.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            Error::MissingInput | Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::Unsupported(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &'static str {
        match self.0 {
            Error::MissingInput => "Por favor, forneça texto, URL ou imagem para verificar",
            Error::InvalidRequest(_) => "Requisição inválida",
            Error::Configuration(_) => "Configuração da API não encontrada",
            Error::Upstream(_) | Error::Http(_) => {
                "Não foi possível analisar a informação no momento. Tente novamente mais tarde."
            }
            Error::Persistence(_) => "Erro ao salvar verificação",
            Error::Unsupported(_) => "Recurso não disponível",
            _ => "Erro interno do servidor",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.0.kind(), "Request failed: {}", self.0);
        } else {
            tracing::warn!(kind = self.0.kind(), "Request rejected: {}", self.0);
        }

        let body = ErrorResponse {
            success: false,
            error: self.message().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError(Error::MissingInput).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError(Error::Configuration("GOOGLE_API_KEY missing".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError(Error::Upstream("503".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError(Error::Persistence("insert".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages_hide_details() {
        let error = ApiError(Error::Configuration("GOOGLE_API_KEY missing".into()));
        assert!(!error.message().contains("GOOGLE_API_KEY"));
        let error = ApiError(Error::Upstream("quota exceeded for key abc".into()));
        assert!(!error.message().contains("abc"));
    }
}
