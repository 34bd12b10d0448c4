//! Request payloads submitted by the site's HTML forms.

use axum::http::StatusCode;
use axum_extra::extract::Multipart;
use serde::Deserialize;
use tracing::warn;

use crate::application::{
    accounts::{PasswordChangeForm, SignupForm},
    error::HttpError,
    posts::{ImageUpload, PostForm},
};

const SOURCE: &str = "infra::http::forms";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PageQuery {
    pub page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommentPayload {
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginPayload {
    pub username: String,
    pub password: String,
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupPayload {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

impl From<SignupPayload> for SignupForm {
    fn from(payload: SignupPayload) -> Self {
        Self {
            first_name: payload.first_name,
            last_name: payload.last_name,
            username: payload.username,
            email: payload.email,
            password1: payload.password1,
            password2: payload.password2,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PasswordChangePayload {
    pub old_password: String,
    pub new_password1: String,
    pub new_password2: String,
}

impl From<PasswordChangePayload> for PasswordChangeForm {
    fn from(payload: PasswordChangePayload) -> Self {
        Self {
            old_password: payload.old_password,
            new_password1: payload.new_password1,
            new_password2: payload.new_password2,
        }
    }
}

/// Read the multipart post form (`text`, `group`, `image`, `image-clear`).
///
/// A file input left empty arrives as a part with no filename and no bytes;
/// it is treated as "no new image".
pub async fn read_post_form(multipart: &mut Multipart) -> Result<PostForm, HttpError> {
    let mut form = PostForm::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                let status = err.status();
                warn!(
                    target = SOURCE,
                    status = status.as_u16(),
                    error = %err,
                    "failed to read multipart payload"
                );
                let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
                    "Upload is too large"
                } else {
                    "Malformed form data"
                };
                return Err(HttpError::from_error(SOURCE, status, message, &err));
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "text" => form.text = read_text(field).await?,
            "group" => form.group = read_text(field).await?,
            "image-clear" => {
                let value = read_text(field).await?;
                form.clear_image = matches!(
                    value.trim().to_ascii_lowercase().as_str(),
                    "on" | "true" | "1" | "yes"
                );
            }
            "image" => {
                let filename = field
                    .file_name()
                    .map(|value| value.trim().to_string())
                    .unwrap_or_default();
                let content_type = field
                    .content_type()
                    .map(|mime| mime.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let bytes = field.bytes().await.map_err(|err| {
                    HttpError::from_error(SOURCE, err.status(), "Malformed form data", &err)
                })?;
                if !filename.is_empty() || !bytes.is_empty() {
                    form.image = Some(ImageUpload {
                        filename: if filename.is_empty() {
                            "upload".to_string()
                        } else {
                            filename
                        },
                        content_type,
                        bytes,
                    });
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn read_text(field: axum_extra::extract::multipart::Field) -> Result<String, HttpError> {
    field
        .text()
        .await
        .map_err(|err| HttpError::from_error(SOURCE, err.status(), "Malformed form data", &err))
}
