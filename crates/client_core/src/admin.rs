use anyhow::{anyhow, Context, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{CarouselImageId, ProjectId},
    error::{ApiError, ApiException},
    protocol::{CarouselImageDraft, CarouselImageRecord, MutationAck, ProjectDraft, ProjectRecord},
};

/// Write-side client for the admin endpoints. Mutations acknowledge with
/// `{ success: true }`; error responses are decoded into [`ApiException`]
/// so callers see the server's failure class, not just a status code.
pub struct AdminClient {
    http: Client,
    server_url: String,
}

impl AdminClient {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            server_url: server_url.into(),
        }
    }

    pub async fn list_projects(&self) -> Result<Vec<ProjectRecord>> {
        let response = self
            .http
            .get(format!("{}/projects", self.server_url))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn list_carousel_images(&self) -> Result<Vec<CarouselImageRecord>> {
        let response = self
            .http
            .get(format!("{}/carousel", self.server_url))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn create_project(&self, draft: &ProjectDraft) -> Result<MutationAck> {
        let response = self
            .http
            .post(format!("{}/admin/projects", self.server_url))
            .json(draft)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn update_project(&self, id: &ProjectId, draft: &ProjectDraft) -> Result<MutationAck> {
        let response = self
            .http
            .put(format!("{}/admin/projects/{id}", self.server_url))
            .json(draft)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn delete_project(&self, id: &ProjectId) -> Result<MutationAck> {
        let response = self
            .http
            .delete(format!("{}/admin/projects/{id}", self.server_url))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn create_carousel_image(&self, draft: &CarouselImageDraft) -> Result<MutationAck> {
        let response = self
            .http
            .post(format!("{}/admin/carousel", self.server_url))
            .json(draft)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn update_carousel_image(
        &self,
        id: &CarouselImageId,
        draft: &CarouselImageDraft,
    ) -> Result<MutationAck> {
        let response = self
            .http
            .put(format!("{}/admin/carousel/{id}", self.server_url))
            .json(draft)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn delete_carousel_image(&self, id: &CarouselImageId) -> Result<MutationAck> {
        let response = self
            .http
            .delete(format!("{}/admin/carousel/{id}", self.server_url))
            .send()
            .await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .context("failed to decode server response");
    }
    match response.json::<ApiError>().await {
        Ok(error) => Err(ApiException::from(error).into()),
        Err(_) => Err(anyhow!("server returned {status}")),
    }
}
