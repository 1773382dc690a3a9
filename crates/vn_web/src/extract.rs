//! Decoding of `/verify-news` bodies, either JSON or multipart form data.

use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use vn_core::{Error, ImageAttachment, Result, VerificationRequest};

/// Largest accepted request body, images included.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

const DEFAULT_IMAGE_TYPE: &str = "image/png";

pub async fn read_submission(request: Request) -> Result<VerificationRequest> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| Error::InvalidRequest(e.body_text()))?;
        read_form(multipart).await
    } else {
        let body = axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES)
            .await
            .map_err(|e| Error::InvalidRequest(format!("unreadable body: {}", e)))?;
        serde_json::from_slice(&body)
            .map_err(|e| Error::InvalidRequest(format!("invalid JSON body: {}", e)))
    }
}

async fn read_form(mut multipart: Multipart) -> Result<VerificationRequest> {
    let mut submission = VerificationRequest::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "content" | "url" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| Error::InvalidRequest(e.body_text()))?;
                if name == "content" {
                    submission.content = Some(value);
                } else {
                    submission.url = Some(value);
                }
            }
            "imageFile" => {
                let content_type = field
                    .content_type()
                    .filter(|ct| ct.starts_with("image/"))
                    .unwrap_or(DEFAULT_IMAGE_TYPE)
                    .to_string();
                let file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| Error::InvalidRequest(e.body_text()))?;
                submission.image = Some(ImageAttachment {
                    bytes: bytes.to_vec(),
                    content_type,
                    file_name,
                });
            }
            other => tracing::debug!("Ignoring form field {}", other),
        }
    }
    Ok(submission)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(content_type: &str, body: impl Into<Body>) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri("/verify-news")
            .header(CONTENT_TYPE, content_type)
            .body(body.into())
            .unwrap()
    }

    #[tokio::test]
    async fn test_reads_json() {
        let submission = read_submission(request(
            "application/json",
            r#"{"content": "Vacinas contêm microchips 5G", "url": null}"#,
        ))
        .await
        .unwrap();
        assert_eq!(submission.content(), Some("Vacinas contêm microchips 5G"));
        assert!(submission.url().is_none());
        assert!(submission.image.is_none());
    }

    #[tokio::test]
    async fn test_rejects_garbage_json() {
        let err = read_submission(request("application/json", "content=abc"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_reads_multipart_form() {
        let body = concat!(
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"content\"\r\n\r\n",
            "Foto de enchente\r\n",
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"url\"\r\n\r\n",
            "\r\n",
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"imageFile\"; filename=\"foto.jpg\"\r\n",
            "Content-Type: image/jpeg\r\n\r\n",
            "JPEGDATA\r\n",
            "--XBOUNDARY--\r\n",
        );
        let submission = read_submission(request("multipart/form-data; boundary=XBOUNDARY", body))
            .await
            .unwrap();

        assert_eq!(submission.content(), Some("Foto de enchente"));
        assert!(submission.url().is_none());
        let image = submission.image().unwrap();
        assert_eq!(image.bytes, b"JPEGDATA".to_vec());
        assert_eq!(image.content_type, "image/jpeg");
        assert_eq!(image.file_name.as_deref(), Some("foto.jpg"));
    }
}
