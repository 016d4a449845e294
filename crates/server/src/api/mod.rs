use shared::{
    domain::{CarouselImageId, ProjectId},
    error::{ApiError, ErrorCode},
    protocol::{CarouselImageDraft, CarouselImageRecord, MutationAck, ProjectDraft, ProjectRecord},
};
use storage::Storage;

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
}

pub async fn list_projects(ctx: &ApiContext) -> Result<Vec<ProjectRecord>, ApiError> {
    let projects = ctx.storage.list_projects().await.map_err(internal)?;
    Ok(projects
        .into_iter()
        .map(|project| ProjectRecord {
            id: project.id,
            name: project.name,
            description: project.description,
            cover: project.cover,
            url: project.url,
            created_at: project.created_at,
        })
        .collect())
}

pub async fn list_carousel_images(ctx: &ApiContext) -> Result<Vec<CarouselImageRecord>, ApiError> {
    let slides = ctx.storage.list_carousel_images().await.map_err(internal)?;
    Ok(slides
        .into_iter()
        .map(|slide| CarouselImageRecord {
            id: slide.id,
            path: slide.path,
            desc: slide.desc,
            position: slide.position,
            created_at: slide.created_at,
        })
        .collect())
}

pub async fn create_project(ctx: &ApiContext, draft: ProjectDraft) -> Result<MutationAck, ApiError> {
    validate_project_draft(&draft)?;
    ctx.storage.insert_project(&draft).await.map_err(internal)?;
    Ok(MutationAck { success: true })
}

pub async fn update_project(
    ctx: &ApiContext,
    id: ProjectId,
    draft: ProjectDraft,
) -> Result<MutationAck, ApiError> {
    validate_project_draft(&draft)?;
    let updated = ctx
        .storage
        .update_project(&id, &draft)
        .await
        .map_err(internal)?;
    if !updated {
        return Err(ApiError::new(ErrorCode::NotFound, "project not found"));
    }
    Ok(MutationAck { success: true })
}

pub async fn delete_project(ctx: &ApiContext, id: ProjectId) -> Result<MutationAck, ApiError> {
    let deleted = ctx.storage.delete_project(&id).await.map_err(internal)?;
    if !deleted {
        return Err(ApiError::new(ErrorCode::NotFound, "project not found"));
    }
    Ok(MutationAck { success: true })
}

pub async fn create_carousel_image(
    ctx: &ApiContext,
    draft: CarouselImageDraft,
) -> Result<MutationAck, ApiError> {
    validate_carousel_draft(&draft)?;
    ctx.storage
        .insert_carousel_image(&draft)
        .await
        .map_err(internal)?;
    Ok(MutationAck { success: true })
}

pub async fn update_carousel_image(
    ctx: &ApiContext,
    id: CarouselImageId,
    draft: CarouselImageDraft,
) -> Result<MutationAck, ApiError> {
    validate_carousel_draft(&draft)?;
    let updated = ctx
        .storage
        .update_carousel_image(&id, &draft)
        .await
        .map_err(internal)?;
    if !updated {
        return Err(ApiError::new(ErrorCode::NotFound, "carousel image not found"));
    }
    Ok(MutationAck { success: true })
}

pub async fn delete_carousel_image(
    ctx: &ApiContext,
    id: CarouselImageId,
) -> Result<MutationAck, ApiError> {
    let deleted = ctx
        .storage
        .delete_carousel_image(&id)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err(ApiError::new(ErrorCode::NotFound, "carousel image not found"));
    }
    Ok(MutationAck { success: true })
}

fn validate_project_draft(draft: &ProjectDraft) -> Result<(), ApiError> {
    if draft.name.trim().is_empty() {
        return Err(ApiError::new(
            ErrorCode::Validation,
            "project name must not be empty",
        ));
    }
    Ok(())
}

fn validate_carousel_draft(draft: &CarouselImageDraft) -> Result<(), ApiError> {
    if draft.path.trim().is_empty() {
        return Err(ApiError::new(
            ErrorCode::Validation,
            "carousel image path must not be empty",
        ));
    }
    Ok(())
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
