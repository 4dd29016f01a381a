use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use reqwest::Url;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::info;

use crate::{
    jql::{self, FilterDefinition},
    outbound::{JiraApi, JiraError},
};

const LABEL_KEY: &str = "label";
const LABELS_HEADER: &str = "Labels";

#[derive(Debug, Error)]
pub(crate) enum MatrixError {
    #[error("invalid filter `{value}`: {reason}")]
    InvalidFilter { value: String, reason: &'static str },
    #[error("search failed: {0}")]
    Search(#[from] JiraError),
    #[error("a search task stopped before returning a result")]
    Aborted,
}

/// Engine knobs shared through the schema context.
#[derive(Clone)]
pub(crate) struct MatrixOptions {
    /// Site base URL the per-cell browse links point at.
    pub(crate) link_base: Url,
    /// Worker-pool size for the pairwise searches.
    pub(crate) concurrency: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CellContent {
    Label(String),
    Count(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) key: String,
    pub(crate) content: CellContent,
    pub(crate) link: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct Row {
    pub(crate) key: String,
    pub(crate) cells: Vec<Cell>,
    pub(crate) total: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct HeaderCell {
    pub(crate) key: String,
    pub(crate) label: String,
}

#[derive(Debug, Clone)]
pub(crate) struct Matrix {
    pub(crate) head: Vec<HeaderCell>,
    pub(crate) rows: Vec<Row>,
    pub(crate) highlighted_rows: Vec<usize>,
}

/// One pairwise search, slot-indexed into the result grid.
struct SearchJob {
    jql: String,
}

/// Cross-tabulates the submitted filters into a count matrix.
///
/// Row-only filters never become columns and column-only filters never
/// become rows; every surviving (row, column) pair is searched once. Any
/// failed search aborts the whole computation so an incomplete matrix is
/// never presented as complete.
pub(crate) async fn build_matrix(
    api: Arc<dyn JiraApi>,
    filters: &[FilterDefinition],
    options: &MatrixOptions,
) -> Result<Matrix, MatrixError> {
    validate(filters)?;

    let head = column_header(filters);
    let rows = evaluate_rows(api, filters, options).await?;
    let highlighted_rows = highlight_rows(&rows);

    Ok(Matrix {
        head,
        rows,
        highlighted_rows,
    })
}

fn validate(filters: &[FilterDefinition]) -> Result<(), MatrixError> {
    for filter in filters {
        if filter.only_row && filter.only_column {
            return Err(MatrixError::InvalidFilter {
                value: filter.value.clone(),
                reason: "cannot be both row-only and column-only",
            });
        }
        if filter.project.is_empty() || filter.field.is_empty() || filter.value.is_empty() {
            return Err(MatrixError::InvalidFilter {
                value: filter.value.clone(),
                reason: "project, field and value are required",
            });
        }
    }
    Ok(())
}

fn column_header(filters: &[FilterDefinition]) -> Vec<HeaderCell> {
    let mut head = vec![HeaderCell {
        key: LABELS_HEADER.to_string(),
        label: LABELS_HEADER.to_string(),
    }];
    for filter in filters {
        if filter.only_row {
            continue;
        }
        head.push(HeaderCell {
            key: filter.value.clone(),
            label: filter.value.clone(),
        });
    }
    head
}

async fn evaluate_rows(
    api: Arc<dyn JiraApi>,
    filters: &[FilterDefinition],
    options: &MatrixOptions,
) -> Result<Vec<Row>, MatrixError> {
    let mut jobs = Vec::new();
    for row_filter in filters {
        if row_filter.only_column {
            continue;
        }
        for col_filter in filters {
            if col_filter.only_row {
                continue;
            }
            jobs.push(SearchJob {
                jql: jql::build_jql(&[row_filter, col_filter]),
            });
        }
    }
    info!(
        "comparison matrix: {} filters, {} searches",
        filters.len(),
        jobs.len()
    );

    let jobs = Arc::new(jobs);
    let counts = run_searches(api, Arc::clone(&jobs), options.concurrency).await?;

    let mut rows = Vec::new();
    let mut slot = 0;
    for (index, row_filter) in filters.iter().enumerate() {
        if row_filter.only_column {
            continue;
        }
        let mut cells = vec![Cell {
            key: LABEL_KEY.to_string(),
            content: CellContent::Label(row_filter.value.clone()),
            link: None,
        }];
        let mut total = 0;
        for col_filter in filters {
            if col_filter.only_row {
                continue;
            }
            let count = counts[slot];
            cells.push(Cell {
                key: col_filter.value.clone(),
                content: CellContent::Count(count),
                link: Some(jql::browse_url(&options.link_base, &jobs[slot].jql)),
            });
            total += count;
            slot += 1;
        }
        rows.push(Row {
            key: format!("row-{index}-{}", row_filter.value),
            cells,
            total,
        });
    }
    Ok(rows)
}

/// Runs the pairwise searches on a bounded worker pool. Results land in a
/// grid by job slot, so completion order never affects the output. The
/// first failure aborts the remaining searches.
async fn run_searches(
    api: Arc<dyn JiraApi>,
    jobs: Arc<Vec<SearchJob>>,
    concurrency: usize,
) -> Result<Vec<u64>, MatrixError> {
    if jobs.is_empty() {
        return Ok(Vec::new());
    }

    let workers = concurrency.clamp(1, jobs.len());
    let cursor = Arc::new(AtomicUsize::new(0));
    let mut set = JoinSet::new();
    for _ in 0..workers {
        let api = Arc::clone(&api);
        let jobs = Arc::clone(&jobs);
        let cursor = Arc::clone(&cursor);
        set.spawn(async move {
            let mut counts = Vec::new();
            loop {
                let slot = cursor.fetch_add(1, Ordering::Relaxed);
                let Some(job) = jobs.get(slot) else {
                    return Ok(counts);
                };
                match api.search_count(&job.jql).await {
                    Ok(total) => counts.push((slot, total)),
                    Err(error) => return Err(error),
                }
            }
        });
    }

    let mut grid: Vec<Option<u64>> = vec![None; jobs.len()];
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(counts)) => {
                for (slot, total) in counts {
                    grid[slot] = Some(total);
                }
            }
            Ok(Err(error)) => {
                set.abort_all();
                return Err(MatrixError::Search(error));
            }
            Err(_) => {
                set.abort_all();
                return Err(MatrixError::Aborted);
            }
        }
    }

    grid.into_iter()
        .map(|count| count.ok_or(MatrixError::Aborted))
        .collect()
}

/// Indices of the rows sharing the maximum total; every tied row is
/// highlighted.
fn highlight_rows(rows: &[Row]) -> Vec<usize> {
    let Some(max) = rows.iter().map(|row| row.total).max() else {
        return Vec::new();
    };
    rows.iter()
        .enumerate()
        .filter(|(_, row)| row.total == max)
        .map(|(index, _)| index)
        .collect()
}
