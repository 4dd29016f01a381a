use std::sync::Arc;

use async_graphql::{Context, InputObject, Object, Result, SimpleObject};

use crate::{
    comparison::{self, CellContent, MatrixOptions},
    jql::{CompareOp, FilterDefinition},
    outbound::JiraApi,
};

/// One row/column definition submitted by the gadget configuration.
#[derive(InputObject)]
pub(crate) struct FilterInput {
    /// Project whose issues the filter is scoped to.
    project: String,
    /// Issue field the filter compares.
    field: String,
    operator: CompareOp,
    /// Comparison operand; doubles as the filter's display label.
    value: String,
    /// When set, the filter only produces a matrix row.
    #[graphql(default)]
    only_row: bool,
    /// When set, the filter only produces a matrix column.
    #[graphql(default)]
    only_column: bool,
}

impl From<FilterInput> for FilterDefinition {
    fn from(input: FilterInput) -> Self {
        FilterDefinition {
            project: input.project,
            field: input.field,
            operator: input.operator,
            value: input.value,
            only_row: input.only_row,
            only_column: input.only_column,
        }
    }
}

#[derive(SimpleObject)]
pub(crate) struct MatrixCell {
    pub(crate) key: String,
    /// Render-ready content: the row label or the formatted count.
    pub(crate) content: String,
    pub(crate) is_link: bool,
    pub(crate) link: Option<String>,
}

#[derive(SimpleObject)]
pub(crate) struct MatrixRow {
    pub(crate) key: String,
    pub(crate) cells: Vec<MatrixCell>,
    pub(crate) total: u64,
}

#[derive(SimpleObject)]
pub(crate) struct MatrixHeaderCell {
    pub(crate) key: String,
    pub(crate) label: String,
}

#[derive(SimpleObject)]
pub(crate) struct ComparisonMatrix {
    pub(crate) head: Vec<MatrixHeaderCell>,
    pub(crate) rows: Vec<MatrixRow>,
    /// Indices into `rows` of the row(s) with the maximum total.
    pub(crate) highlighted_rows: Vec<u64>,
}

impl From<comparison::Cell> for MatrixCell {
    fn from(cell: comparison::Cell) -> Self {
        let content = match cell.content {
            CellContent::Label(label) => label,
            CellContent::Count(count) => count.to_string(),
        };
        MatrixCell {
            key: cell.key,
            content,
            is_link: cell.link.is_some(),
            link: cell.link,
        }
    }
}

impl From<comparison::Row> for MatrixRow {
    fn from(row: comparison::Row) -> Self {
        MatrixRow {
            key: row.key,
            cells: row.cells.into_iter().map(Into::into).collect(),
            total: row.total,
        }
    }
}

impl From<comparison::HeaderCell> for MatrixHeaderCell {
    fn from(cell: comparison::HeaderCell) -> Self {
        MatrixHeaderCell {
            key: cell.key,
            label: cell.label,
        }
    }
}

impl From<comparison::Matrix> for ComparisonMatrix {
    fn from(matrix: comparison::Matrix) -> Self {
        ComparisonMatrix {
            head: matrix.head.into_iter().map(Into::into).collect(),
            rows: matrix.rows.into_iter().map(Into::into).collect(),
            highlighted_rows: matrix
                .highlighted_rows
                .into_iter()
                .map(|index| index as u64)
                .collect(),
        }
    }
}

#[derive(Default)]
pub(super) struct MatrixQuery;

#[Object]
impl MatrixQuery {
    /// Cross-tabulates the submitted filters into a count matrix.
    async fn comparison_matrix(
        &self,
        ctx: &Context<'_>,
        filters: Vec<FilterInput>,
    ) -> Result<ComparisonMatrix> {
        let api = ctx.data::<Arc<dyn JiraApi>>()?;
        let options = ctx.data::<MatrixOptions>()?;
        let filters: Vec<FilterDefinition> = filters.into_iter().map(Into::into).collect();
        let matrix = comparison::build_matrix(Arc::clone(api), &filters, options).await?;
        Ok(matrix.into())
    }
}

#[cfg(test)]
mod tests {
    use crate::{api::TestSchema, outbound::FakeJira};

    #[tokio::test]
    async fn single_filter_is_paired_with_itself() {
        let jira =
            FakeJira::new().count("PROJECT = TEST AND status = Open AND status = Open", 7);
        let schema = TestSchema::new(jira);

        let query = r#"
        {
            comparisonMatrix(
                filters: [{project: "TEST", field: "status", operator: EQUALS, value: "Open"}]
            ) {
                head {
                    key
                }
                rows {
                    key
                    total
                    cells {
                        key
                        content
                        isLink
                    }
                }
                highlightedRows
            }
        }"#;
        let res = schema.execute(query).await;
        assert_eq!(
            res.data.to_string(),
            "{comparisonMatrix: {\
             head: [{key: \"Labels\"}, {key: \"Open\"}], \
             rows: [{key: \"row-0-Open\", total: 7, cells: [\
             {key: \"label\", content: \"Open\", isLink: false}, \
             {key: \"Open\", content: \"7\", isLink: true}]}], \
             highlightedRows: [0]}}"
        );
    }

    #[tokio::test]
    async fn column_only_filter_keeps_its_column_but_loses_its_row() {
        let jira = FakeJira::new().default_count(3);
        let schema = TestSchema::new(jira);

        let query = r#"
        {
            comparisonMatrix(filters: [
                {project: "TEST", field: "status", operator: EQUALS, value: "Open"}
                {project: "TEST", field: "status", operator: EQUALS, value: "Done", onlyColumn: true}
            ]) {
                head {
                    key
                }
                rows {
                    key
                    total
                }
            }
        }"#;
        let res = schema.execute(query).await;
        assert_eq!(
            res.data.to_string(),
            "{comparisonMatrix: {\
             head: [{key: \"Labels\"}, {key: \"Open\"}, {key: \"Done\"}], \
             rows: [{key: \"row-0-Open\", total: 6}]}}"
        );
    }

    #[tokio::test]
    async fn empty_filter_list_yields_an_empty_matrix() {
        let schema = TestSchema::new(FakeJira::new());

        let query = r"
        {
            comparisonMatrix(filters: []) {
                head {
                    key
                }
                rows {
                    key
                }
                highlightedRows
            }
        }";
        let res = schema.execute(query).await;
        assert_eq!(
            res.data.to_string(),
            "{comparisonMatrix: {head: [{key: \"Labels\"}], rows: [], highlightedRows: []}}"
        );
    }

    #[tokio::test]
    async fn search_failure_surfaces_as_an_error() {
        let jira = FakeJira::new().fail_matching("Done");
        let schema = TestSchema::new(jira);

        let query = r#"
        {
            comparisonMatrix(filters: [
                {project: "TEST", field: "status", operator: EQUALS, value: "Open"}
                {project: "TEST", field: "status", operator: EQUALS, value: "Done"}
            ]) {
                rows {
                    total
                }
            }
        }"#;
        let res = schema.execute(query).await;
        assert_eq!(res.errors.len(), 1);
        assert!(res.errors[0].message.contains("search failed"));
    }

    #[tokio::test]
    async fn contradictory_flags_surface_as_an_error() {
        let schema = TestSchema::new(FakeJira::new());

        let query = r#"
        {
            comparisonMatrix(filters: [
                {
                    project: "TEST"
                    field: "status"
                    operator: EQUALS
                    value: "Open"
                    onlyRow: true
                    onlyColumn: true
                }
            ]) {
                rows {
                    total
                }
            }
        }"#;
        let res = schema.execute(query).await;
        assert_eq!(res.errors.len(), 1);
        assert!(res.errors[0].message.contains("invalid filter"));
    }
}
