//! Educational tool request and result types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of interactive tool the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolType {
    Quiz,
    Flashcards,
    Chart,
    Worksheet,
    Timeline,
    Game,
    Lecture,
    Diagram,
    Custom,
    /// Let the model pick the best fit.
    Auto,
    /// A user-defined tool type label.
    Other(String),
}

impl ToolType {
    /// Parse a tool type label. Absent, blank and `auto` all mean [`ToolType::Auto`].
    pub fn parse(label: Option<&str>) -> Self {
        let label = match label.map(str::trim) {
            None => return ToolType::Auto,
            Some(l) if l.is_empty() => return ToolType::Auto,
            Some(l) => l,
        };

        match label.to_ascii_lowercase().as_str() {
            "auto" => ToolType::Auto,
            "quiz" => ToolType::Quiz,
            "flashcards" => ToolType::Flashcards,
            "chart" => ToolType::Chart,
            "worksheet" => ToolType::Worksheet,
            "timeline" => ToolType::Timeline,
            "game" => ToolType::Game,
            "lecture" => ToolType::Lecture,
            "diagram" => ToolType::Diagram,
            "custom" => ToolType::Custom,
            _ => ToolType::Other(label.to_string()),
        }
    }

    fn description(&self) -> Option<&'static str> {
        let text = match self {
            ToolType::Quiz => "Create an interactive quiz with multiple choice questions, immediate feedback, and a score counter.",
            ToolType::Flashcards => "Create interactive digital flashcards that users can flip through with click/tap interactions.",
            ToolType::Chart => "Create an interactive chart or graph with detailed data visualization.",
            ToolType::Worksheet => "Create an interactive worksheet with fillable fields and exercises.",
            ToolType::Timeline => "Create an interactive timeline with detailed clickable events and detailed information.",
            ToolType::Game => "Create an educational game with interactive elements and scoring.",
            ToolType::Lecture => "Create a interactive slideshow relating to the subject. Allow the user to move between slides, and include detailed information in each slide.",
            ToolType::Diagram => "Create an interactive diagram or infographic with detailed and clickable elements.",
            ToolType::Custom => "Create a highly customized, advanced educational tool with unique interactive features tailored specifically to the user's request. Use creative and innovative approaches that go beyond standard tool types.",
            ToolType::Auto | ToolType::Other(_) => return None,
        };
        Some(text)
    }

    /// The line telling the model which kind of tool to build.
    pub fn instruction(&self) -> String {
        match (self, self.description()) {
            (_, Some(description)) => format!("Specifically create: {}", description),
            (ToolType::Other(label), None) => format!(
                "Specifically create: {}. Create a highly customized, advanced educational tool with unique interactive features tailored specifically to this tool type and the user's request. Use creative and innovative approaches.",
                label
            ),
            _ => "Choose the most appropriate tool type for this request and create it."
                .to_string(),
        }
    }
}

impl fmt::Display for ToolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ToolType::Quiz => "quiz",
            ToolType::Flashcards => "flashcards",
            ToolType::Chart => "chart",
            ToolType::Worksheet => "worksheet",
            ToolType::Timeline => "timeline",
            ToolType::Game => "game",
            ToolType::Lecture => "lecture",
            ToolType::Diagram => "diagram",
            ToolType::Custom => "custom",
            ToolType::Auto => "auto",
            ToolType::Other(label) => label,
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Text,
    /// An image already described by image analysis.
    Image,
}

/// A user-supplied file, reduced to text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
    pub content: String,
    pub file_name: String,
}

#[derive(Debug, Clone)]
pub struct ToolRequest {
    pub prompt: String,
    pub tool_type: ToolType,
    pub category: Option<String>,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedTool {
    pub html: String,
    pub tool_description: String,
}
