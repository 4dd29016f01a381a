pub(crate) mod catalog;
pub(crate) mod matrix;

use std::sync::Arc;

use async_graphql::{EmptyMutation, EmptySubscription, MergedObject};

use crate::{comparison::MatrixOptions, outbound::JiraApi};

/// A set of queries defined in the schema.
///
/// This is exposed only for [`Schema`], and not used directly.
#[derive(Default, MergedObject)]
pub(crate) struct Query(matrix::MatrixQuery, catalog::CatalogQuery);

pub(crate) type Schema = async_graphql::Schema<Query, EmptyMutation, EmptySubscription>;

pub(crate) fn schema(api: Arc<dyn JiraApi>, options: MatrixOptions) -> Schema {
    Schema::build(Query::default(), EmptyMutation, EmptySubscription)
        .data(api)
        .data(options)
        .finish()
}

#[cfg(test)]
struct TestSchema {
    schema: Schema,
}

#[cfg(test)]
impl TestSchema {
    fn new(jira: crate::outbound::FakeJira) -> Self {
        let options = MatrixOptions {
            link_base: reqwest::Url::parse("https://jira.example.com").unwrap(),
            concurrency: 2,
        };
        let schema = schema(Arc::new(jira), options);
        Self { schema }
    }

    async fn execute(&self, query: &str) -> async_graphql::Response {
        let request: async_graphql::Request = query.into();
        self.schema.execute(request).await
    }
}
