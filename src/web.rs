use std::{convert::Infallible, net::SocketAddr, path::Path};

use async_graphql::http::{playground_source, GraphQLPlaygroundConfig};
use async_graphql_warp::{GraphQLBadRequest, GraphQLResponse};
use warp::{
    http::{Response as HttpResponse, StatusCode},
    Filter, Rejection,
};

use crate::api::Schema;

pub(crate) async fn serve(schema: Schema, addr: SocketAddr, cert: &Path, key: &Path) {
    let graphql = warp::path("graphql")
        .and(async_graphql_warp::graphql(schema))
        .and_then(
            |(schema, request): (Schema, async_graphql::Request)| async move {
                Ok::<_, Infallible>(GraphQLResponse::from(schema.execute(request).await))
            },
        );

    let playground = warp::path::end().and(warp::get()).map(|| {
        HttpResponse::builder()
            .header("content-type", "text/html")
            .body(playground_source(GraphQLPlaygroundConfig::new("/graphql")))
    });

    let routes = graphql.or(playground).recover(handle_rejection);

    warp::serve(routes)
        .tls()
        .cert_path(cert)
        .key_path(key)
        .run(addr)
        .await;
}

async fn handle_rejection(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    if let Some(GraphQLBadRequest(err)) = err.find() {
        return Ok(warp::reply::with_status(
            err.to_string(),
            StatusCode::BAD_REQUEST,
        ));
    }
    Ok(warp::reply::with_status(
        "NOT_FOUND".to_string(),
        StatusCode::NOT_FOUND,
    ))
}
