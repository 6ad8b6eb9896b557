use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use validator::Validate;

use crate::models::{Attachment, GeneratedTool, SessionUser, ToolRequest, ToolType};
use crate::startup::AppState;

/// Largest accepted image upload.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

const IMAGE_FIELD: &str = "image";

#[derive(Debug, Deserialize, Validate)]
pub struct EnhancePromptRequest {
    #[validate(length(min = 1, max = 10000, message = "Prompt must be 1-10000 characters"))]
    pub prompt: String,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EnhancePromptResponse {
    pub enhanced_prompt: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateToolRequest {
    #[validate(length(min = 1, max = 20000, message = "Prompt must be 1-20000 characters"))]
    pub prompt: String,
    pub tool_type: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    #[validate(length(max = 10, message = "At most 10 attachments are allowed"))]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeImageResponse {
    pub analysis: String,
}

#[tracing::instrument(skip(state, request), fields(user_id = %user.user_id))]
pub async fn enhance_prompt(
    State(state): State<AppState>,
    user: SessionUser,
    Json(request): Json<EnhancePromptRequest>,
) -> Result<Json<EnhancePromptResponse>, AppError> {
    request.validate()?;

    let enhanced_prompt = state
        .tools
        .enhance_prompt(&request.prompt, request.category.as_deref())
        .await?;

    Ok(Json(EnhancePromptResponse { enhanced_prompt }))
}

#[tracing::instrument(skip(state, request), fields(user_id = %user.user_id))]
pub async fn generate_tool(
    State(state): State<AppState>,
    user: SessionUser,
    Json(request): Json<GenerateToolRequest>,
) -> Result<Json<GeneratedTool>, AppError> {
    request.validate()?;

    let tool_request = ToolRequest {
        tool_type: ToolType::parse(request.tool_type.as_deref()),
        prompt: request.prompt,
        category: request.category,
        attachments: request.attachments,
    };

    let tool = state.tools.generate_tool(&tool_request).await?;
    Ok(Json(tool))
}

#[tracing::instrument(skip(state, multipart), fields(user_id = %user.user_id))]
pub async fn analyze_image(
    State(state): State<AppState>,
    user: SessionUser,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeImageResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Failed to read image: {}", e)))?;

        tracing::info!(bytes = bytes.len(), mime_type = %mime_type, "Received image");

        let analysis = state.tools.analyze_image(&bytes, &mime_type).await?;
        return Ok(Json(AnalyzeImageResponse { analysis }));
    }

    Err(AppError::BadRequest(anyhow::anyhow!(
        "Missing multipart field '{}'",
        IMAGE_FIELD
    )))
}
