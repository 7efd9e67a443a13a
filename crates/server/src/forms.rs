//! Parsing of posted form values into engine types.

use std::collections::HashMap;

use axum::extract::Multipart;
use engine::{EngineError, MoneyCents};

use crate::{ServerError, upload::UploadedFile};

/// Text fields and at most one file of a `multipart/form-data` body.
#[derive(Debug, Default)]
pub(crate) struct MultipartForm {
    fields: HashMap<String, String>,
    pub(crate) file: Option<UploadedFile>,
}

impl MultipartForm {
    /// Reads every part. `file_field` names the part holding the image;
    /// an empty file input counts as no file.
    pub(crate) async fn read(
        mut multipart: Multipart,
        file_field: &str,
    ) -> Result<Self, ServerError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| ServerError::Generic(err.body_text()))?
        {
            let Some(name) = field.name().map(ToString::to_string) else {
                continue;
            };
            if name == file_field {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| ServerError::Generic(err.body_text()))?;
                if !file_name.is_empty() && !bytes.is_empty() {
                    form.file = Some(UploadedFile {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|err| ServerError::Generic(err.body_text()))?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    pub(crate) fn text(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or_default()
    }

    pub(crate) fn optional(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }
}

/// Parses a positive row id.
pub(crate) fn parse_id(raw: &str, label: &str) -> Result<i32, EngineError> {
    match raw.trim().parse::<i32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(EngineError::Validation(format!("invalid {label}"))),
    }
}

pub(crate) fn parse_amount(raw: &str) -> Result<MoneyCents, EngineError> {
    raw.parse::<MoneyCents>()
}

/// Empty or blank values count as absent.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_must_be_positive_integers() {
        assert_eq!(parse_id(" 42 ", "item id").unwrap(), 42);
        assert!(parse_id("0", "item id").is_err());
        assert!(parse_id("-3", "item id").is_err());
        assert!(parse_id("abc", "item id").is_err());
    }

    #[test]
    fn amounts_use_money_parsing() {
        assert_eq!(parse_amount("2500").unwrap(), MoneyCents::from_units(2_500));
        assert!(matches!(parse_amount("1.234"), Err(EngineError::InvalidAmount(_))));
    }
}
