use std::sync::Arc;

use async_graphql::{Context, Object, Result, SimpleObject};

use crate::outbound::{self, JiraApi};

/// A `{label, value}` pair for the configuration UI's selectors.
#[derive(SimpleObject)]
pub(crate) struct CatalogEntry {
    pub(crate) label: String,
    pub(crate) value: String,
}

impl From<outbound::CatalogEntry> for CatalogEntry {
    fn from(entry: outbound::CatalogEntry) -> Self {
        CatalogEntry {
            label: entry.label,
            value: entry.value,
        }
    }
}

#[derive(Default)]
pub(super) struct CatalogQuery;

#[Object]
impl CatalogQuery {
    /// Projects a filter can be scoped to.
    async fn projects(&self, ctx: &Context<'_>) -> Result<Vec<CatalogEntry>> {
        let api = ctx.data::<Arc<dyn JiraApi>>()?;
        Ok(api.projects().await?.into_iter().map(Into::into).collect())
    }

    /// Issue fields a filter can compare.
    async fn fields(&self, ctx: &Context<'_>) -> Result<Vec<CatalogEntry>> {
        let api = ctx.data::<Arc<dyn JiraApi>>()?;
        Ok(api.fields().await?.into_iter().map(Into::into).collect())
    }
}
