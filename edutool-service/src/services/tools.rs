//! Educational tool generation on top of the resilient generator.
//!
//! Builds the prompts for prompt enhancement, interactive HTML tool generation
//! and image analysis, then cleans up what the model returns.

use crate::models::{Attachment, GeneratedTool, ToolRequest};
use crate::services::providers::{ContentPart, GenerationRequest};
use crate::services::resilient::{GenerationError, ResilientGenerator, RetryPolicy};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::time::Duration;
use thiserror::Error;

/// Retry policy for prompt enhancement: short prompts, fail fast.
pub const ENHANCE_RETRY_POLICY: RetryPolicy = RetryPolicy {
    max_retries: 2,
    base_delay: Duration::from_millis(500),
};

pub const IMAGE_ANALYSIS_FALLBACK: &str = "Unable to analyze image";

const IMAGE_ANALYSIS_PROMPT: &str = "Analyze this image in detail and describe its key elements, context, subject matter, and any text visible in the image. Focus on educational content that could be used to create learning tools.";

const TOOL_REQUIREMENTS: &str = "IMPORTANT REQUIREMENTS:
1. Generate ONLY valid HTML content that can be embedded in an iframe
2. Include all necessary CSS styles inline within <style> tags
3. Include all necessary JavaScript within <script> tags
4. Make the content fully self-contained and interactive
5. Use modern, responsive design with good UX
6. Ensure accessibility with proper ARIA labels and semantic HTML
7. Use vibrant colors and engaging visual elements
8. Make sure all functionality works without external dependencies
9. Create modern and appealing UI
10. Make sure the app is COMPLETE. DO NOT ADD ANY \"PLACEHOLDERS\"
11. The result will be used for commercial use.
12. Do your best, we want quality.
13. Try your best to fill in stuff such as APIs.
14. There should be no placeholders.";

/// User-facing failures of the tool endpoints. Messages are stable; the
/// underlying generation error is kept for logging.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Failed to enhance prompt")]
    Enhance(#[source] GenerationError),

    #[error("Failed to generate educational tool: {0}")]
    Generate(#[source] GenerationError),

    #[error("Failed to analyze image: {0}")]
    Analyze(#[source] GenerationError),
}

impl ToolError {
    pub fn generation_error(&self) -> &GenerationError {
        match self {
            ToolError::Enhance(e) | ToolError::Generate(e) | ToolError::Analyze(e) => e,
        }
    }
}

/// Render the `Category/Subject` line, skipping absent or `none` categories.
fn category_line(category: Option<&str>) -> Option<String> {
    category
        .map(str::trim)
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("none"))
        .map(|c| format!("Category/Subject: {}", c))
}

pub fn enhance_prompt_text(user_prompt: &str, category: Option<&str>) -> String {
    format!(
        "You are an educational tool prompt enhancer. Your job is to take a basic prompt and enhance it to create better, more detailed educational tools.

Take this prompt: \"{prompt}\"
{category}

Note: The prompt is from the App User. If the prompt doesn't make sense, or is too vague, you can make a reasonable assumption about what the user wants.

Enhance it by:
1. Adding specific learning objectives
2. Suggesting appropriate difficulty levels
3. Including interactive elements
4. Making it more engaging and educational
5. Adding context or real-world applications
6. Specifying the target audience if not clear
7. Making prompt more clear and concise
8. Make it less than 500 characters long

Return ONLY the enhanced prompt, nothing else. Keep it concise but much more detailed and educational than the original.",
        prompt = user_prompt,
        category = category_line(category).unwrap_or_default(),
    )
}

/// Render attachments as a context block appended to prompt and instruction.
pub fn file_context(attachments: &[Attachment]) -> String {
    if attachments.is_empty() {
        return String::new();
    }

    let mut context =
        String::from("\n\nThe user has also provided the following files for context:\n");
    for (index, file) in attachments.iter().enumerate() {
        context.push_str(&format!(
            "\nFile {} ({}):\n{}\n",
            index + 1,
            file.file_name,
            file.content
        ));
    }
    context.push_str(
        "\nUse this file content to create more relevant and personalized educational tools. Incorporate the information from these files into the educational tool you create.",
    );
    context
}

pub fn tool_system_instruction(request: &ToolRequest) -> String {
    let mut lines = vec![
        "You are an expert educational app creator. Generate complete, interactive HTML content for educational/study tools.".to_string(),
        String::new(),
        TOOL_REQUIREMENTS.to_string(),
        String::new(),
        format!("The user wants: {}", request.prompt),
        request.tool_type.instruction(),
    ];
    if let Some(category) = category_line(request.category.as_deref()) {
        lines.push(category);
    }

    let context = file_context(&request.attachments);
    if !context.is_empty() {
        lines.push(context);
    }

    lines.push(String::new());
    lines.push(
        "Generate complete HTML that will work immediately when loaded in an iframe.".to_string(),
    );
    lines.join("\n")
}

/// Remove one leading code fence (optionally tagged `html`) and one trailing fence.
pub fn strip_code_fences(text: &str) -> String {
    let mut cleaned = text.trim();

    if let Some(rest) = cleaned.strip_prefix("```") {
        let rest = match rest.get(..4) {
            Some(tag) if tag.eq_ignore_ascii_case("html") => &rest[4..],
            _ => rest,
        };
        cleaned = rest.strip_prefix('\n').unwrap_or(rest);
    }

    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest.strip_suffix('\n').unwrap_or(rest);
    }

    cleaned.trim().to_string()
}

/// Whether the text carries at least one recognizable HTML marker.
pub fn looks_like_html(text: &str) -> bool {
    text.contains("<html") || text.contains("<div")
}

/// Strip fences and validate the result is HTML.
pub fn clean_generated_html(text: &str) -> Result<String, GenerationError> {
    let cleaned = strip_code_fences(text);
    if looks_like_html(&cleaned) {
        Ok(cleaned)
    } else {
        Err(GenerationError::InvalidGeneratedContent)
    }
}

/// Educational tool operations backed by a [`ResilientGenerator`].
#[derive(Clone)]
pub struct ToolService {
    generator: ResilientGenerator,
    image_model: String,
}

impl ToolService {
    pub fn new(generator: ResilientGenerator, image_model: impl Into<String>) -> Self {
        Self {
            generator,
            image_model: image_model.into(),
        }
    }

    pub fn generator(&self) -> &ResilientGenerator {
        &self.generator
    }

    /// Rewrite a short user prompt into a detailed educational brief.
    #[tracing::instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    pub async fn enhance_prompt(
        &self,
        prompt: &str,
        category: Option<&str>,
    ) -> Result<String, ToolError> {
        if prompt.trim().is_empty() {
            return Err(ToolError::Enhance(GenerationError::InvalidRequest(
                "Prompt cannot be empty".to_string(),
            )));
        }

        let text = enhance_prompt_text(prompt, category);
        let enhanced = self
            .generator
            .generate_with(&text, None, ENHANCE_RETRY_POLICY)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Error enhancing prompt");
                ToolError::Enhance(e)
            })?;

        Ok(enhanced.trim().to_string())
    }

    /// Generate a self-contained interactive HTML tool.
    #[tracing::instrument(
        skip(self, request),
        fields(tool_type = %request.tool_type, attachments = request.attachments.len())
    )]
    pub async fn generate_tool(&self, request: &ToolRequest) -> Result<GeneratedTool, ToolError> {
        let system_instruction = tool_system_instruction(request);
        let contents = format!("{}{}", request.prompt, file_context(&request.attachments));

        let result = async {
            let generated = self
                .generator
                .generate(&contents, Some(&system_instruction))
                .await?;
            clean_generated_html(&generated)
        }
        .await;

        match result {
            Ok(html) => {
                tracing::info!(html_len = html.len(), "Educational tool generated");
                Ok(GeneratedTool {
                    html,
                    tool_description: String::new(),
                })
            }
            Err(e) => {
                tracing::error!(error = %e, kind = e.kind(), "Educational tool generation failed");
                Err(ToolError::Generate(e))
            }
        }
    }

    /// Describe an image with a single provider call; no retry or fallback.
    #[tracing::instrument(skip(self, image), fields(bytes = image.len(), model = %self.image_model))]
    pub async fn analyze_image(&self, image: &[u8], mime_type: &str) -> Result<String, ToolError> {
        if image.is_empty() {
            return Err(ToolError::Analyze(GenerationError::InvalidRequest(
                "Image is empty".to_string(),
            )));
        }
        if !mime_type.starts_with("image/") {
            return Err(ToolError::Analyze(GenerationError::InvalidRequest(format!(
                "Unsupported media type: {}",
                mime_type
            ))));
        }

        let request = GenerationRequest {
            model: self.image_model.clone(),
            system_instruction: None,
            contents: vec![
                ContentPart::InlineData {
                    mime_type: mime_type.to_string(),
                    data: STANDARD.encode(image),
                },
                ContentPart::Text(IMAGE_ANALYSIS_PROMPT.to_string()),
            ],
        };

        let response = self
            .generator
            .provider()
            .generate_content(&request)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Image analysis error");
                ToolError::Analyze(GenerationError::from_provider(e))
            })?;

        Ok(response
            .text
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| IMAGE_ANALYSIS_FALLBACK.to_string()))
    }
}
