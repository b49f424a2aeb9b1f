use axum::{Json, extract::State, http::StatusCode};
use garde::Validate;
use serde::Deserialize;

use crate::error::AppError;
use crate::extract::{ValidatedJson, ValidatedPath};
use crate::models::Quote;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuoteRequest {
    #[garde(length(min = 1))]
    pub content: String,
    #[garde(length(min = 1))]
    pub author: String,
}

/// 部分更新（省略したフィールドは変更しない）
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuoteRequest {
    #[garde(length(min = 1))]
    pub content: Option<String>,
    #[garde(length(min = 1))]
    pub author: Option<String>,
}

/// POST /quotes
pub async fn create(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateQuoteRequest>,
) -> Result<(StatusCode, Json<Quote>), AppError> {
    let quote = state
        .quotes
        .create(&request.content, &request.author)
        .await?;

    tracing::info!(quote_id = quote.id, "名言を作成");

    Ok((StatusCode::CREATED, Json(quote)))
}

/// GET /quotes
pub async fn find_all(State(state): State<AppState>) -> Result<Json<Vec<Quote>>, AppError> {
    Ok(Json(state.quotes.find_all().await?))
}

/// GET /quotes/{id}
pub async fn find_one(
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<i32>,
) -> Result<Json<Quote>, AppError> {
    state
        .quotes
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Quote".to_string()))
}

/// PUT /quotes/{id}
pub async fn update(
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<i32>,
    ValidatedJson(request): ValidatedJson<UpdateQuoteRequest>,
) -> Result<Json<Quote>, AppError> {
    let quote = state
        .quotes
        .update(id, request.content.as_deref(), request.author.as_deref())
        .await?
        .ok_or_else(|| AppError::NotFound("Quote".to_string()))?;

    tracing::info!(quote_id = quote.id, "名言を更新");

    Ok(Json(quote))
}

/// DELETE /quotes/{id}
pub async fn remove(
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<i32>,
) -> Result<StatusCode, AppError> {
    if !state.quotes.delete(id).await? {
        return Err(AppError::NotFound("Quote".to_string()));
    }

    tracing::info!(quote_id = id, "名言を削除");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_create_empty_content() {
        let request = CreateQuoteRequest {
            content: String::new(),
            author: "Anonymous".to_string(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_validate_update_partial() {
        let request: UpdateQuoteRequest = serde_json::from_str(r#"{"author":"Seneca"}"#).unwrap();
        assert!(request.validate().is_ok());
        assert!(request.content.is_none());
    }

    #[test]
    fn test_validate_update_empty_author() {
        let request = UpdateQuoteRequest {
            content: None,
            author: Some(String::new()),
        };
        assert!(request.validate().is_err());
    }
}
