//! Memo query pipeline.
//!
//! A listing request runs through a fixed, ordered chain of stages:
//! title → content → tag → order → page. Each stage narrows or shapes a
//! [`MemoScope`] and is a no-op when its parameter is absent. The filtered
//! scope is counted before ordering and paging so the page count reflects
//! the whole result set.

use serde::{Deserialize, Serialize};

use crate::models::MemoSummary;
use crate::{Error, Result};

use super::{placeholders, summary_select, tags_for_memos, DbPool};

/// Memos per page.
pub const PAGE_SIZE: i64 = 10;

/// Page returned when no page is requested.
pub const FIRST_PAGE: i64 = 1;

/// Raw listing parameters. Blank strings count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoQueryParams {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
    pub order: Option<String>,
    pub page: Option<String>,
}

/// A page of memos and the number of pages in the filtered set.
#[derive(Debug, Clone, Serialize)]
pub struct MemoPage {
    pub memos: Vec<MemoSummary>,
    pub total_page: i64,
    pub current_page: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Parse the `order` parameter. Anything other than `asc` sorts descending.
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("asc") => Self::Asc,
            _ => Self::Desc,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Binding {
    Text(String),
    Int(i64),
}

/// Accumulated state of the pipeline.
#[derive(Debug, Clone)]
pub struct MemoScope {
    conditions: Vec<String>,
    bindings: Vec<Binding>,
    order: SortOrder,
    page: i64,
}

impl Default for MemoScope {
    fn default() -> Self {
        Self {
            conditions: Vec::new(),
            bindings: Vec::new(),
            order: SortOrder::default(),
            page: FIRST_PAGE,
        }
    }
}

impl MemoScope {
    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(PAGE_SIZE)
    }

    fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }
}

/// One stage of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStage {
    Title,
    Content,
    Tag,
    Order,
    Page,
}

/// Stages in application order.
pub const FILTER_STAGES: [FilterStage; 5] = [
    FilterStage::Title,
    FilterStage::Content,
    FilterStage::Tag,
    FilterStage::Order,
    FilterStage::Page,
];

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl FilterStage {
    pub fn apply(self, mut scope: MemoScope, params: &MemoQueryParams) -> Result<MemoScope> {
        match self {
            // instr() is case-sensitive, LIKE is not
            Self::Title => {
                if let Some(title) = present(&params.title) {
                    scope.conditions.push("instr(m.title, ?) > 0".to_string());
                    scope.bindings.push(Binding::Text(title.to_string()));
                }
            }
            Self::Content => {
                if let Some(content) = present(&params.content) {
                    scope.conditions.push("instr(m.content, ?) > 0".to_string());
                    scope.bindings.push(Binding::Text(content.to_string()));
                }
            }
            Self::Tag => {
                if !params.tag_ids.is_empty() {
                    scope.conditions.push(format!(
                        "m.id IN (SELECT memo_id FROM memo_tags WHERE tag_id IN ({}))",
                        placeholders(params.tag_ids.len())
                    ));
                    scope
                        .bindings
                        .extend(params.tag_ids.iter().map(|id| Binding::Int(*id)));
                }
            }
            Self::Order => {
                scope.order = SortOrder::from_param(params.order.as_deref());
            }
            Self::Page => {
                scope.page = parse_page(params.page.as_deref())?;
            }
        }
        Ok(scope)
    }
}

/// Parse the `page` parameter.
///
/// Absent or blank selects the first page. A present value must be a
/// base-10 integer; values below one are clamped to the first page.
pub fn parse_page(raw: Option<&str>) -> Result<i64> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(FIRST_PAGE);
    };

    let page = raw
        .parse::<i64>()
        .map_err(|_| Error::InvalidInput(format!("page must be an integer, got '{}'", raw)))?;

    Ok(page.max(FIRST_PAGE))
}

/// Number of pages for `count` filtered memos. An empty set has one page.
pub fn total_pages(count: i64) -> i64 {
    if count <= 0 {
        FIRST_PAGE
    } else {
        (count + PAGE_SIZE - 1) / PAGE_SIZE
    }
}

/// Run every stage in order.
pub fn build_scope(params: &MemoQueryParams) -> Result<MemoScope> {
    FILTER_STAGES
        .iter()
        .try_fold(MemoScope::default(), |scope, stage| stage.apply(scope, params))
}

macro_rules! bind_all {
    ($query:expr, $bindings:expr) => {{
        let mut q = $query;
        for binding in $bindings {
            q = match binding {
                Binding::Text(s) => q.bind(s.clone()),
                Binding::Int(i) => q.bind(*i),
            };
        }
        q
    }};
}

/// List memos through the query pipeline.
pub async fn query_memos(pool: &DbPool, params: &MemoQueryParams) -> Result<MemoPage> {
    let scope = build_scope(params)?;
    let where_clause = scope.where_clause();

    let count_query = format!("SELECT COUNT(*) FROM memos m {}", where_clause);
    let (count,) = bind_all!(sqlx::query_as::<_, (i64,)>(&count_query), &scope.bindings)
        .fetch_one(pool)
        .await?;

    let page_query = format!(
        "{} {} ORDER BY m.id {} LIMIT ? OFFSET ?",
        summary_select(),
        where_clause,
        scope.order.as_sql()
    );
    let mut memos: Vec<MemoSummary> =
        bind_all!(sqlx::query_as::<_, MemoSummary>(&page_query), &scope.bindings)
            .bind(PAGE_SIZE)
            .bind(scope.offset())
            .fetch_all(pool)
            .await?;

    let ids: Vec<i64> = memos.iter().map(|m| m.id).collect();
    let mut tags = tags_for_memos(pool, &ids).await?;
    for memo in &mut memos {
        memo.tags = tags.remove(&memo.id).unwrap_or_default();
    }

    tracing::debug!(
        count,
        page = scope.page,
        returned = memos.len(),
        "Memo query executed"
    );

    Ok(MemoPage {
        memos,
        total_page: total_pages(count),
        current_page: scope.page,
    })
}
