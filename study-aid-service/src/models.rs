use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Deserialize;
use study_core::{AnalysisResult, ComprehensiveAnalysis, ImageInput, Language, QuizOptions};

fn default_mime_type() -> String {
    "image/png".to_string()
}

/// Base64 image as sent by the browser. `image` may be a bare base64 string or a data URL.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    pub image: String,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
}

impl ImagePayload {
    pub fn decode(&self) -> Result<ImageInput, String> {
        let (mime_type, encoded) = match self.image.strip_prefix("data:") {
            Some(data_url) => {
                let (header, encoded) = data_url
                    .split_once(',')
                    .ok_or_else(|| "Malformed data URL".to_string())?;
                let mime_type = header.strip_suffix(";base64").unwrap_or(header);
                (mime_type.to_string(), encoded)
            }
            None => (self.mime_type.clone(), self.image.as_str()),
        };

        let data = STANDARD
            .decode(encoded.trim())
            .map_err(|e| format!("Image is not valid base64: {e}"))?;
        if data.is_empty() {
            return Err("Image is empty".to_string());
        }
        Ok(ImageInput::new(mime_type, data))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeImageRequest {
    #[serde(flatten)]
    pub image: ImagePayload,
    #[serde(default)]
    pub language: Language,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeTextRequest {
    pub text: String,
    #[serde(default)]
    pub language: Language,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzePageRequest {
    pub text: String,
    pub page_number: u32,
    #[serde(default)]
    pub language: Language,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzePdfPageRequest {
    pub pdf_path: String,
    pub page_number: u32,
    #[serde(default)]
    pub language: Language,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRequest {
    pub analyses: Vec<AnalysisResult>,
    #[serde(flatten)]
    pub options: QuizOptions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuizRequest {
    pub document: ComprehensiveAnalysis,
    pub start_page: u32,
    pub end_page: u32,
    #[serde(flatten)]
    pub options: QuizOptions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageQuizRequest {
    pub images: Vec<ImagePayload>,
    #[serde(flatten)]
    pub options: QuizOptions,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use study_core::{Difficulty, QuestionStyle};

    #[test]
    fn test_decode_bare_base64() {
        let payload = ImagePayload {
            image: "AQID".to_string(),
            mime_type: "image/jpeg".to_string(),
        };
        let image = payload.decode().unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.data, vec![1, 2, 3]);
    }

    #[test]
    fn test_decode_data_url_takes_its_mime_type() {
        let payload = ImagePayload {
            image: "data:image/webp;base64,AQID".to_string(),
            mime_type: default_mime_type(),
        };
        assert_eq!(payload.decode().unwrap().mime_type, "image/webp");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        for image in ["!!!", "", "data:image/png;base64"] {
            let payload = ImagePayload {
                image: image.to_string(),
                mime_type: default_mime_type(),
            };
            assert!(payload.decode().is_err(), "{image:?} should not decode");
        }
    }

    #[test]
    fn test_quiz_request_flattens_options() {
        let request: QuizRequest = serde_json::from_value(json!({
            "analyses": [{"keyPoints": ["x"]}],
            "count": 15,
            "difficulty": "hard",
            "questionType": "assertion_reason",
            "language": "tamil"
        }))
        .unwrap();

        assert_eq!(request.options.count, 15);
        assert_eq!(request.options.difficulty, Difficulty::Hard);
        assert_eq!(request.options.style, QuestionStyle::AssertionReason);
        assert_eq!(request.options.language, Language::Tamil);
        assert_eq!(request.analyses[0].key_points, vec!["x"]);
    }

    #[test]
    fn test_quiz_request_option_defaults() {
        let request: QuizRequest = serde_json::from_value(json!({"analyses": []})).unwrap();
        assert_eq!(request.options, QuizOptions::default());
    }
}
