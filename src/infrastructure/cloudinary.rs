//! Cloudinary signed upload/destroy over its REST API.

use chrono::Utc;
use reqwest::blocking::Client;
use serde::Deserialize;
use sha1::{Digest, Sha1};

use crate::domain::errors::DomainError;
use crate::domain::ports::{ImageStore, StoredImage};

const DEFAULT_BASE_URL: &str = "https://api.cloudinary.com";

#[derive(Debug, Clone)]
pub struct CloudinaryCredentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

pub struct CloudinaryStore {
    client: Client,
    credentials: CloudinaryCredentials,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl CloudinaryStore {
    pub fn new(credentials: CloudinaryCredentials) -> Self {
        Self {
            client: Client::new(),
            credentials,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/v1_1/{}/image/{}",
            self.base_url, self.credentials.cloud_name, action
        )
    }

    fn post<T: for<'de> Deserialize<'de>>(
        &self,
        action: &str,
        params: &[(&str, String)],
    ) -> Result<T, DomainError> {
        let timestamp = Utc::now().timestamp().to_string();
        let mut signed: Vec<(&str, String)> = params.to_vec();
        signed.push(("timestamp", timestamp));
        let signature = sign(&signed, &self.credentials.api_secret);
        signed.push(("api_key", self.credentials.api_key.clone()));
        signed.push(("signature", signature));

        let response = self.client.post(self.endpoint(action)).form(&signed).send()?;
        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<ErrorBody>()
                .map(|b| b.error.message)
                .unwrap_or_else(|_| status.to_string());
            return Err(DomainError::Upstream(format!("cloudinary {action}: {message}")));
        }
        Ok(response.json()?)
    }
}

/// Request signature: the parameters sorted by name, joined as a query
/// string, with the API secret appended, hashed with SHA-1.
///
/// `file`, `api_key` and `resource_type` are never part of the signature.
fn sign(params: &[(&str, String)], secret: &str) -> String {
    let mut pairs: Vec<&(&str, String)> = params
        .iter()
        .filter(|(k, _)| !matches!(*k, "file" | "api_key" | "resource_type"))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let joined = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!("{:x}", Sha1::digest(format!("{joined}{secret}").as_bytes()))
}

impl ImageStore for CloudinaryStore {
    fn upload(&self, folder: &str, data: &str) -> Result<StoredImage, DomainError> {
        let uploaded: UploadResponse = self.post(
            "upload",
            &[("file", data.to_string()), ("folder", folder.to_string())],
        )?;
        log::debug!("uploaded image {}", uploaded.public_id);
        Ok(StoredImage {
            public_id: uploaded.public_id,
            url: uploaded.secure_url,
        })
    }

    fn destroy(&self, public_id: &str) -> Result<(), DomainError> {
        let destroyed: DestroyResponse =
            self.post("destroy", &[("public_id", public_id.to_string())])?;
        match destroyed.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(DomainError::Upstream(format!(
                "cloudinary destroy {public_id}: {other}"
            ))),
        }
    }
}

/// Stand-in used when no Cloudinary credentials are configured.
pub struct DisabledImageStore;

impl ImageStore for DisabledImageStore {
    fn upload(&self, _folder: &str, _data: &str) -> Result<StoredImage, DomainError> {
        Err(DomainError::Upstream("image store is not configured".to_string()))
    }

    fn destroy(&self, _public_id: &str) -> Result<(), DomainError> {
        Err(DomainError::Upstream("image store is not configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_sorts_params_and_skips_unsigned_ones() {
        let params = [
            ("timestamp", "1315060510".to_string()),
            ("file", "data:image/png;base64,AAAA".to_string()),
            ("public_id", "sample_image".to_string()),
            ("api_key", "1234".to_string()),
        ];
        let expected = format!(
            "{:x}",
            Sha1::digest(b"public_id=sample_image&timestamp=1315060510abcd")
        );

        assert_eq!(sign(&params, "abcd"), expected);
    }

    #[test]
    fn signature_is_lowercase_hex_sha1() {
        let signature = sign(&[("folder", "products".to_string())], "s");
        assert_eq!(signature.len(), 40);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn endpoint_includes_cloud_name() {
        let store = CloudinaryStore::new(CloudinaryCredentials {
            cloud_name: "demo".to_string(),
            api_key: "k".to_string(),
            api_secret: "s".to_string(),
        });
        assert_eq!(
            store.endpoint("upload"),
            "https://api.cloudinary.com/v1_1/demo/image/upload"
        );
    }

    #[test]
    fn disabled_store_reports_upstream_error() {
        let err = DisabledImageStore.upload("products", "x").unwrap_err();
        assert!(matches!(err, DomainError::Upstream(_)));
    }
}
