use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter};

pub const TRY_ON_ENDPOINT: &str = "/api/try-on";
pub const SUCCESS_MESSAGE: &str = "Images processed successfully";
pub const MISSING_IMAGES_MESSAGE: &str = "Both person and garment images are required";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";
pub const GENERIC_UI_ERROR: &str =
    "An error occurred while processing the images. Please try again.";
pub const RESULT_FILE_NAME: &str = "result.png";

/// The two uploads a try-on needs. The string form is the multipart field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter)]
pub enum ImageRole {
    #[strum(serialize = "personImage")]
    Person,
    #[strum(serialize = "garmentImage")]
    Garment,
}

impl ImageRole {
    pub fn from_field_name(name: &str) -> Option<Self> {
        match name {
            "personImage" => Some(ImageRole::Person),
            "garmentImage" => Some(ImageRole::Garment),
            _ => None,
        }
    }

    /// Short lowercase label used in storage keys and file names.
    pub fn slug(&self) -> &'static str {
        match self {
            ImageRole::Person => "person",
            ImageRole::Garment => "garment",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TryOnResponse {
    pub message: String,
    pub result_image: String,
}

impl TryOnResponse {
    pub fn success(result_image: impl Into<String>) -> Self {
        Self {
            message: SUCCESS_MESSAGE.to_string(),
            result_image: result_image.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}
