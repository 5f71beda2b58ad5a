//! Multipart form parsing for note uploads.

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;

use crate::service::{ServiceError, UploadRequest, UploadedFile};

fn malformed(e: &MultipartError) -> ServiceError {
    ServiceError::InvalidInput(format!("Malformed upload: {}", e.body_text()))
}

/// Parse the `price` field. Missing or blank means free.
pub fn parse_price(raw: Option<&str>) -> Result<i64, ServiceError> {
    match raw.map(str::trim).filter(|p| !p.is_empty()) {
        None => Ok(0),
        Some(p) => p.parse().map_err(|_| ServiceError::InvalidPrice),
    }
}

/// Collect the fields of an upload form.
///
/// Unknown fields are ignored; of repeated file fields the last one wins.
pub async fn read_upload(mut form: Multipart) -> Result<UploadRequest, ServiceError> {
    let mut req = UploadRequest::default();
    let mut price = None;

    while let Some(field) = form.next_field().await.map_err(|e| malformed(&e))? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" | "image" => {
                let file_name = field.file_name().unwrap_or(&name).to_string();
                let content_type = field.content_type().map(ToString::to_string);
                let bytes = field.bytes().await.map_err(|e| malformed(&e))?;
                if bytes.is_empty() {
                    continue;
                }
                let file = UploadedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                };
                if name == "file" {
                    req.file = Some(file);
                } else {
                    req.image = Some(file);
                }
            }
            "title" => req.title = field.text().await.map_err(|e| malformed(&e))?,
            "subject" => req.subject = field.text().await.map_err(|e| malformed(&e))?,
            "uploader" => {
                req.uploader_id = field.text().await.map_err(|e| malformed(&e))?.trim().to_string();
            }
            "price" => price = Some(field.text().await.map_err(|e| malformed(&e))?),
            _ => {}
        }
    }

    req.price = parse_price(price.as_deref())?;
    Ok(req)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_parsing() {
        assert_eq!(parse_price(None).ok(), Some(0));
        assert_eq!(parse_price(Some("  ")).ok(), Some(0));
        assert_eq!(parse_price(Some("10")).ok(), Some(10));
        assert_eq!(parse_price(Some("-3")).ok(), Some(-3));
        assert!(matches!(parse_price(Some("ten")), Err(ServiceError::InvalidPrice)));
    }
}
