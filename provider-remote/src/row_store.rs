//! PostgREST-style row store client
//!
//! Implements the remote mix, tag and saved-view contracts over plain REST:
//!
//! - `GET    /rest/v1/<table>?select=*&order=...` lists a collection
//! - `POST   /rest/v1/<table>` with `Prefer: return=representation` inserts
//! - `PATCH  /rest/v1/<table>?id=eq.<id>` updates
//! - `DELETE /rest/v1/<table>?id=eq.<id>` deletes

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bridge_traits::remote::{
    Mix, MixRepository, MixTag, SavedView, SavedViewRepository, Tag, TagRepository,
};
use core_runtime::config::RemoteEndpoint;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::client::RestClient;
use crate::error::RemoteError;
use crate::types::{
    eq_filter, MixPayload, NewMixTag, NewTag, SavedViewPayload, MIXES, MIX_TAGS, SAVED_VIEWS,
    TAGS,
};

const RETURN_REPRESENTATION: &str = "return=representation";

/// REST client for the remote row store.
///
/// # Example
///
/// ```ignore
/// use provider_remote::RestRowStore;
/// use bridge_traits::remote::MixRepository;
///
/// let rows = RestRowStore::from_endpoint(http_client, &endpoint);
/// let mixes = rows.list_mixes().await?;
/// ```
#[derive(Clone)]
pub struct RestRowStore {
    client: RestClient,
}

impl RestRowStore {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }

    pub fn from_endpoint(http_client: Arc<dyn HttpClient>, endpoint: &RemoteEndpoint) -> Self {
        Self::new(RestClient::from_endpoint(http_client, endpoint))
    }

    fn table(table: &str, query: &str) -> String {
        if query.is_empty() {
            format!("rest/v1/{}", table)
        } else {
            format!("rest/v1/{}?{}", table, query)
        }
    }

    async fn list<T: DeserializeOwned>(&self, table: &str, query: &str) -> Result<Vec<T>> {
        let request = self
            .client
            .request(HttpMethod::Get, &Self::table(table, query));
        let rows: Vec<T> = self.client.send_json(request).await?;
        debug!(table, count = rows.len(), "Listed remote rows");
        Ok(rows)
    }

    async fn find_by_id<T: DeserializeOwned>(&self, table: &str, id: &str) -> Result<Option<T>> {
        let query = format!("select=*&id={}&limit=1", eq_filter(id));
        let mut rows: Vec<T> = self.list(table, &query).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    /// Send a write returning the affected rows and take the first.
    async fn write_one<T: DeserializeOwned>(
        &self,
        request: HttpRequest,
        table: &'static str,
        id: &str,
    ) -> Result<T> {
        let request = request.header("Prefer", RETURN_REPRESENTATION);
        let mut rows: Vec<T> = self.client.send_json(request).await?;
        if rows.is_empty() {
            return Err(RemoteError::NotFound {
                collection: table,
                id: id.to_string(),
            }
            .into());
        }
        Ok(rows.swap_remove(0))
    }

    async fn delete_where(&self, table: &str, query: &str) -> Result<()> {
        let request = self
            .client
            .request(HttpMethod::Delete, &Self::table(table, query));
        self.client.send(request).await?;
        Ok(())
    }

    fn by_id(id: &str) -> String {
        format!("id={}", eq_filter(id))
    }
}

#[async_trait]
impl MixRepository for RestRowStore {
    #[instrument(skip(self))]
    async fn list_mixes(&self) -> Result<Vec<Mix>> {
        let mixes: Vec<Mix> = self
            .list(MIXES, "select=*&order=created_at.desc")
            .await?;
        info!("Fetched {} remote mixes", mixes.len());
        Ok(mixes)
    }

    async fn get_mix(&self, id: &str) -> Result<Option<Mix>> {
        self.find_by_id(MIXES, id).await
    }

    #[instrument(skip(self, mix), fields(mix_id = %mix.id))]
    async fn create_mix(&self, mix: &Mix) -> Result<Mix> {
        let request = self.client.json_request(
            HttpMethod::Post,
            &Self::table(MIXES, ""),
            &MixPayload::create(mix),
        )?;
        self.write_one(request, MIXES, &mix.id).await
    }

    #[instrument(skip(self, mix), fields(mix_id = %mix.id))]
    async fn update_mix(&self, mix: &Mix) -> Result<Mix> {
        let request = self.client.json_request(
            HttpMethod::Patch,
            &Self::table(MIXES, &Self::by_id(&mix.id)),
            &MixPayload::patch(mix),
        )?;
        self.write_one(request, MIXES, &mix.id).await
    }

    #[instrument(skip(self))]
    async fn delete_mix(&self, id: &str) -> Result<()> {
        self.delete_where(MIXES, &Self::by_id(id)).await
    }
}

#[async_trait]
impl TagRepository for RestRowStore {
    #[instrument(skip(self))]
    async fn list_tags(&self) -> Result<Vec<Tag>> {
        self.list(TAGS, "select=*&order=name.asc").await
    }

    async fn create_tag(&self, name: &str) -> Result<Tag> {
        let request = self.client.json_request(
            HttpMethod::Post,
            &Self::table(TAGS, ""),
            &NewTag { name },
        )?;
        self.write_one(request, TAGS, name).await
    }

    async fn update_tag(&self, tag: &Tag) -> Result<Tag> {
        let request = self.client.json_request(
            HttpMethod::Patch,
            &Self::table(TAGS, &Self::by_id(&tag.id)),
            &NewTag { name: &tag.name },
        )?;
        self.write_one(request, TAGS, &tag.id).await
    }

    async fn delete_tag(&self, id: &str) -> Result<()> {
        self.delete_where(TAGS, &Self::by_id(id)).await
    }

    #[instrument(skip(self))]
    async fn list_mix_tags(&self) -> Result<Vec<MixTag>> {
        self.list(MIX_TAGS, "select=mix_id,tag_id").await
    }

    async fn add_tag_to_mix(&self, mix_id: &str, tag_id: &str) -> Result<()> {
        let request = self
            .client
            .json_request(
                HttpMethod::Post,
                &Self::table(MIX_TAGS, ""),
                &NewMixTag { mix_id, tag_id },
            )?
            .header("Prefer", "resolution=ignore-duplicates");
        self.client.send(request).await?;
        Ok(())
    }

    async fn remove_tag_from_mix(&self, mix_id: &str, tag_id: &str) -> Result<()> {
        let query = format!("mix_id={}&tag_id={}", eq_filter(mix_id), eq_filter(tag_id));
        self.delete_where(MIX_TAGS, &query).await
    }
}

#[async_trait]
impl SavedViewRepository for RestRowStore {
    #[instrument(skip(self))]
    async fn list_saved_views(&self) -> Result<Vec<SavedView>> {
        self.list(SAVED_VIEWS, "select=*&order=created_at.desc")
            .await
    }

    async fn create_saved_view(&self, name: &str, tag_ids: &[String]) -> Result<SavedView> {
        let request = self.client.json_request(
            HttpMethod::Post,
            &Self::table(SAVED_VIEWS, ""),
            &SavedViewPayload { name, tag_ids },
        )?;
        self.write_one(request, SAVED_VIEWS, name).await
    }

    async fn update_saved_view(&self, view: &SavedView) -> Result<SavedView> {
        let request = self.client.json_request(
            HttpMethod::Patch,
            &Self::table(SAVED_VIEWS, &Self::by_id(&view.id)),
            &SavedViewPayload {
                name: &view.name,
                tag_ids: &view.tag_ids,
            },
        )?;
        self.write_one(request, SAVED_VIEWS, &view.id).await
    }

    async fn delete_saved_view(&self, id: &str) -> Result<()> {
        self.delete_where(SAVED_VIEWS, &Self::by_id(id)).await
    }
}
