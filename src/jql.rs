use async_graphql::Enum;
use reqwest::Url;

/// One row/column definition of the comparison gadget.
#[derive(Debug, Clone)]
pub(crate) struct FilterDefinition {
    pub(crate) project: String,
    pub(crate) field: String,
    pub(crate) operator: CompareOp,
    /// Comparison operand; doubles as the filter's display label.
    pub(crate) value: String,
    pub(crate) only_row: bool,
    pub(crate) only_column: bool,
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum CompareOp {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    LessThan,
    GreaterThan,
    Is,
    IsNot,
}

impl CompareOp {
    pub(crate) fn jql_token(self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::NotEquals => "!=",
            Self::Contains => "~",
            Self::NotContains => "!~",
            Self::LessThan => "<",
            Self::GreaterThan => ">",
            Self::Is => "IS",
            Self::IsNot => "IS NOT",
        }
    }
}

/// Builds the conjunctive JQL for a (row, column) pair of filters.
///
/// The first filter anchors the query with its `PROJECT =` clause; every
/// filter then contributes one `AND <field> <operator> <value>` clause in
/// input order. Values are interpolated verbatim so that saved gadget
/// configurations keep producing the same literal query strings.
pub(crate) fn build_jql(filters: &[&FilterDefinition]) -> String {
    let Some(first) = filters.first() else {
        return String::new();
    };

    let mut jql = format!("PROJECT = {}", first.project);
    for filter in filters {
        jql.push_str(&format!(
            " AND {} {} {}",
            filter.field,
            filter.operator.jql_token(),
            filter.value
        ));
    }
    jql
}

/// Browse link for the issue set behind one matrix cell. The query is
/// percent-encoded when embedded in the URL.
pub(crate) fn browse_url(link_base: &Url, jql: &str) -> String {
    let mut url = link_base.clone();
    url.set_path("/issues/");
    url.query_pairs_mut().clear().append_pair("jql", jql);
    url.to_string()
}
