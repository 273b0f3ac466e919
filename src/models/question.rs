// src/models/question.rs

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// Cognitive level a question targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CognitiveLevel {
    #[serde(rename = "R")]
    Remembering,
    #[serde(rename = "U")]
    Understanding,
    #[serde(rename = "A")]
    Application,
}

impl CognitiveLevel {
    pub const ALL: [CognitiveLevel; 3] = [
        CognitiveLevel::Remembering,
        CognitiveLevel::Understanding,
        CognitiveLevel::Application,
    ];

    pub fn code(self) -> &'static str {
        match self {
            CognitiveLevel::Remembering => "R",
            CognitiveLevel::Understanding => "U",
            CognitiveLevel::Application => "A",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CognitiveLevel::Remembering => "Remembering",
            CognitiveLevel::Understanding => "Understanding",
            CognitiveLevel::Application => "Application",
        }
    }
}

impl TryFrom<String> for CognitiveLevel {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "R" => Ok(CognitiveLevel::Remembering),
            "U" => Ok(CognitiveLevel::Understanding),
            "A" => Ok(CognitiveLevel::Application),
            _ => Err(UnknownVariant(value)),
        }
    }
}

/// Where the question image sits relative to the question text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImagePosition {
    /// Text above the image.
    #[default]
    Top,
    /// Text above and below the image.
    Middle,
    /// Text below the image.
    Bottom,
}

impl ImagePosition {
    pub fn as_str(self) -> &'static str {
        match self {
            ImagePosition::Top => "top",
            ImagePosition::Middle => "middle",
            ImagePosition::Bottom => "bottom",
        }
    }

    /// Splits the stored text into (text above image, text below image).
    pub fn split<'a>(self, question: &'a str, below: Option<&'a str>) -> (&'a str, &'a str) {
        match self {
            ImagePosition::Top => (question, ""),
            ImagePosition::Middle => (question, below.unwrap_or("")),
            ImagePosition::Bottom => ("", question),
        }
    }
}

impl TryFrom<String> for ImagePosition {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "top" => Ok(ImagePosition::Top),
            "middle" => Ok(ImagePosition::Middle),
            "bottom" => Ok(ImagePosition::Bottom),
            _ => Err(UnknownVariant(value)),
        }
    }
}

/// Print size class of a question image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSize {
    Small,
    #[default]
    Medium,
    Large,
    Xlarge,
}

impl ImageSize {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageSize::Small => "small",
            ImageSize::Medium => "medium",
            ImageSize::Large => "large",
            ImageSize::Xlarge => "xlarge",
        }
    }

    /// Print box in PDF points (width, height).
    pub fn print_area(self) -> (f64, f64) {
        match self {
            ImageSize::Small => (90.0, 70.0),
            ImageSize::Medium => (160.0, 120.0),
            ImageSize::Large => (240.0, 180.0),
            ImageSize::Xlarge => (320.0, 240.0),
        }
    }
}

impl TryFrom<String> for ImageSize {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "small" => Ok(ImageSize::Small),
            "medium" => Ok(ImageSize::Medium),
            "large" => Ok(ImageSize::Large),
            "xlarge" => Ok(ImageSize::Xlarge),
            _ => Err(UnknownVariant(value)),
        }
    }
}

/// Raised when a stored enum column holds an unexpected value.
#[derive(Debug)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Question {
    pub id: i64,
    pub section_id: i64,

    /// Insertion order within the section.
    pub position: i64,

    pub module: i64,
    pub outcome: String,

    #[sqlx(try_from = "String")]
    pub level: CognitiveLevel,

    /// Main text. For `middle` images this is the part above the image.
    pub question: String,
    pub text_below_image: Option<String>,

    /// Path relative to the media root.
    pub image_path: Option<String>,
    #[sqlx(try_from = "String")]
    pub image_position: ImagePosition,
    #[sqlx(try_from = "String")]
    pub image_size: ImageSize,

    /// Same-section parent; set only for sub-questions.
    pub parent_id: Option<i64>,
    pub sub_question_letter: Option<String>,

    pub answer_text: String,
    pub answer_equation: Option<String>,
    pub answer_image_path: Option<String>,

    /// Part C only: both alternatives of a pair share this number.
    pub or_group: Option<i64>,
}

impl Question {
    pub fn is_sub_question(&self) -> bool {
        self.parent_id.is_some()
    }

    pub fn text_parts(&self) -> (&str, &str) {
        self.image_position
            .split(&self.question, self.text_below_image.as_deref())
    }
}

/// How a submitted question points at its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentRef {
    /// Index of an earlier top-level slot in the same submission.
    Slot(usize),
    /// Id of a stored top-level question of the same paper.
    Existing(i64),
}

/// One question slot of a section submission.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuestionInput {
    pub module: i64,
    pub outcome: String,
    pub level: CognitiveLevel,
    pub question: String,
    #[serde(default)]
    pub text_below_image: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub image_position: ImagePosition,
    #[serde(default)]
    pub image_size: ImageSize,
    #[serde(default)]
    pub parent: Option<ParentRef>,
    #[serde(default)]
    pub sub_question_letter: Option<String>,
    pub answer_text: String,
    #[serde(default)]
    pub answer_equation: Option<String>,
    #[serde(default)]
    pub answer_image_path: Option<String>,
}

/// Entry returned by the parent-question lookup API.
#[derive(Debug, Serialize)]
pub struct ParentOption {
    pub id: i64,
    pub text: String,
    pub display_number: usize,
}
