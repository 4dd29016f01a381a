mod api;
mod comparison;
mod jql;
mod outbound;
mod settings;
mod web;

use std::{process::exit, sync::Arc};

use clap::Parser;
use tracing::info;

use crate::{
    comparison::MatrixOptions,
    outbound::{JiraApi, JiraClient},
    settings::{Args, Settings},
};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    tracing_subscriber::fmt::init();

    let settings = match Settings::from_file(&args.config) {
        Ok(ret) => ret,
        Err(error) => {
            eprintln!("Problem while loading settings. {error}");
            exit(1);
        }
    };

    let client = match JiraClient::new(
        &settings.jira,
        settings.matrix.max_results,
        settings.matrix.search_retries,
    ) {
        Ok(ret) => ret,
        Err(error) => {
            eprintln!("Problem while creating the Jira client. {error}");
            exit(1);
        }
    };

    let options = MatrixOptions {
        link_base: client.base_url().clone(),
        concurrency: settings.matrix.concurrency,
    };
    let api: Arc<dyn JiraApi> = Arc::new(client);
    let schema = api::schema(api, options);

    info!("listening on {}", settings.web.address);
    web::serve(schema, settings.web.address, &args.cert, &args.key).await;
}
