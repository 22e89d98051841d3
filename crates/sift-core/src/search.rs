//! Natural-language search reconciliation
//!
//! The service translates a free-text query into a structured filter object.
//! Keys the client has controls for (category, subcategory, date bounds) are
//! reflected into [`FilterControls`]; every other key is kept verbatim and
//! shown as a read-only chip.
//!
//! Paging a natural-language search always resubmits the filter object
//! captured when the search ran. The controls are a one-way reflection of
//! that result and are never read back to page the same search.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{Error, Result};
use crate::models::Transaction;
use crate::sequence::{RequestSequencer, Ticket};
use crate::service::TransactionService;

/// Machine-readable decomposition of a search query, kept exactly as returned
pub type StructuredFilter = Map<String, Value>;

/// Body of `POST transactions/search`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SearchRequest {
    Query {
        query: String,
    },
    Page {
        filters: StructuredFilter,
        page: u32,
        page_size: u32,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<Transaction>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub filters: Option<StructuredFilter>,
}

/// Recognized filter fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Category,
    Subcategory,
    StartDate,
    EndDate,
}

/// Wire keys mapped onto controls (camelCase spellings accepted as aliases)
const RECOGNIZED: &[(&str, Field)] = &[
    ("category_id", Field::Category),
    ("categoryId", Field::Category),
    ("subcategory_id", Field::Subcategory),
    ("subcategoryId", Field::Subcategory),
    ("start_date", Field::StartDate),
    ("startDate", Field::StartDate),
    ("end_date", Field::EndDate),
    ("endDate", Field::EndDate),
];

fn recognized_field(key: &str) -> Option<Field> {
    RECOGNIZED.iter().find(|(k, _)| *k == key).map(|(_, f)| *f)
}

/// State of the date-range control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateRange {
    #[default]
    AllTime,
    Custom {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

/// Values the search result writes into the discrete filter controls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiPatch {
    pub category_id: Option<i64>,
    pub subcategory_id: Option<i64>,
    pub date_range: DateRange,
}

/// Read-only display of a filter field without a control
#[derive(Debug, Clone, PartialEq)]
pub struct FilterChip {
    pub key: String,
    pub label: String,
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Interpretation {
    pub ui_patch: UiPatch,
    pub residual: Vec<FilterChip>,
}

fn parse_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_date(value: &Value) -> Option<NaiveDate> {
    let s = value.as_str()?.trim();
    // Accept full timestamps by reading the date prefix
    let date = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// `merchant_name` -> `Merchant name`, `minAmount` -> `Min amount`
pub fn humanize_key(key: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    for ch in key.chars() {
        if ch == '_' || ch == '-' || ch == ' ' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else if ch.is_uppercase() && !current.is_empty() {
            words.push(std::mem::take(&mut current));
            current.extend(ch.to_lowercase());
        } else {
            current.extend(ch.to_lowercase());
        }
    }
    if !current.is_empty() {
        words.push(current);
    }

    let joined = words.join(" ");
    let mut chars = joined.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null => "none".to_string(),
        other => other.to_string(),
    }
}

fn chip(key: &str, value: &Value) -> FilterChip {
    FilterChip {
        key: key.to_string(),
        label: format!("{}: {}", humanize_key(key), display_value(value)),
        value: value.clone(),
    }
}

/// Partition a structured filter into control values and residual chips
///
/// Every non-null key lands in exactly one of the two. A recognized key whose
/// value cannot be mapped onto its control is shown as a chip instead, so the
/// constraint stays visible. With no date bound the range is "all time", so
/// older matches returned by the search are not hidden.
pub fn interpret(filter: &StructuredFilter) -> Interpretation {
    let mut patch = UiPatch::default();
    let mut start = None;
    let mut end = None;
    let mut residual = Vec::new();

    for (key, value) in filter {
        if value.is_null() {
            continue;
        }
        let mapped = match recognized_field(key) {
            Some(Field::Category) => parse_id(value).map(|id| patch.category_id = Some(id)),
            Some(Field::Subcategory) => parse_id(value).map(|id| patch.subcategory_id = Some(id)),
            Some(Field::StartDate) => parse_date(value).map(|d| start = Some(d)),
            Some(Field::EndDate) => parse_date(value).map(|d| end = Some(d)),
            None => None,
        };
        if mapped.is_none() {
            if recognized_field(key).is_some() {
                warn!("Search filter {} has unusable value {}", key, value);
            }
            residual.push(chip(key, value));
        }
    }

    if start.is_some() || end.is_some() {
        patch.date_range = DateRange::Custom { start, end };
    }

    Interpretation {
        ui_patch: patch,
        residual,
    }
}

/// Discrete filter controls of the transaction list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterControls {
    pub category_id: Option<i64>,
    pub subcategory_id: Option<i64>,
    pub date_range: DateRange,
}

impl FilterControls {
    /// Overwrite the controls with a search result's reflection
    pub fn apply(&mut self, patch: &UiPatch) {
        self.category_id = patch.category_id;
        self.subcategory_id = patch.subcategory_id;
        self.date_range = patch.date_range;
    }

    /// Filter object derived from the controls, for plain (non-AI) filtering
    pub fn to_filter(&self) -> StructuredFilter {
        let mut filter = Map::new();
        if let Some(id) = self.category_id {
            filter.insert("category_id".into(), Value::from(id));
        }
        if let Some(id) = self.subcategory_id {
            filter.insert("subcategory_id".into(), Value::from(id));
        }
        if let DateRange::Custom { start, end } = self.date_range {
            if let Some(d) = start {
                filter.insert("start_date".into(), Value::from(d.to_string()));
            }
            if let Some(d) = end {
                filter.insert("end_date".into(), Value::from(d.to_string()));
            }
        }
        filter
    }
}

/// One natural-language search and its pages
#[derive(Debug)]
pub struct SearchSession {
    controls: FilterControls,
    query: Option<String>,
    captured: Option<StructuredFilter>,
    interpretation: Option<Interpretation>,
    results: Vec<Transaction>,
    total: u64,
    page: u32,
    page_size: u32,
    sequencer: RequestSequencer,
}

impl SearchSession {
    pub fn new(page_size: u32) -> Self {
        Self {
            controls: FilterControls::default(),
            query: None,
            captured: None,
            interpretation: None,
            results: Vec::new(),
            total: 0,
            page: 1,
            page_size: page_size.max(1),
            sequencer: RequestSequencer::new(),
        }
    }

    pub fn controls(&self) -> &FilterControls {
        &self.controls
    }

    /// Controls stay editable; edits do not affect paging of a captured search
    pub fn controls_mut(&mut self) -> &mut FilterControls {
        &mut self.controls
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn captured_filter(&self) -> Option<&StructuredFilter> {
        self.captured.as_ref()
    }

    pub fn interpretation(&self) -> Option<&Interpretation> {
        self.interpretation.as_ref()
    }

    pub fn results(&self) -> &[Transaction] {
        &self.results
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn total_pages(&self) -> u32 {
        let pages = self.total.div_ceil(u64::from(self.page_size));
        pages.max(1).min(u64::from(u32::MAX)) as u32
    }

    pub fn begin_search(&mut self, query: &str) -> (Ticket, SearchRequest) {
        (
            self.sequencer.issue(),
            SearchRequest::Query {
                query: query.to_string(),
            },
        )
    }

    /// Capture the filter of a query response and reflect it into the controls
    pub fn apply_search(
        &mut self,
        ticket: Ticket,
        query: &str,
        response: SearchResponse,
    ) -> Option<&Interpretation> {
        if !self.sequencer.accept(ticket, "search") {
            return None;
        }

        let filters = response.filters.unwrap_or_default();
        let interpretation = interpret(&filters);
        self.controls.apply(&interpretation.ui_patch);

        self.query = Some(query.to_string());
        self.captured = Some(filters);
        self.interpretation = Some(interpretation);
        self.results = response.results;
        self.total = response.total;
        self.page = 1;
        self.interpretation.as_ref()
    }

    /// Request for a page: the captured filter when a search is active,
    /// otherwise a filter derived from the controls
    pub fn begin_page(&mut self, page: u32) -> Result<(Ticket, SearchRequest)> {
        if page == 0 {
            return Err(Error::InvalidRequest("Pages start at 1".into()));
        }
        let filters = match self.captured {
            Some(ref captured) => captured.clone(),
            None => self.controls.to_filter(),
        };
        Ok((
            self.sequencer.issue(),
            SearchRequest::Page {
                filters,
                page,
                page_size: self.page_size,
            },
        ))
    }

    /// Install a page response. The response's own `filters` echo is ignored.
    pub fn apply_page(&mut self, ticket: Ticket, page: u32, response: SearchResponse) -> bool {
        if !self.sequencer.accept(ticket, "search page") {
            return false;
        }
        self.results = response.results;
        self.total = response.total;
        self.page = page;
        true
    }

    /// Run a natural-language search
    pub async fn search(
        &mut self,
        service: &dyn TransactionService,
        query: &str,
    ) -> Result<Interpretation> {
        let (ticket, request) = self.begin_search(query);
        let response = service.search(&request).await?;
        Ok(self
            .apply_search(ticket, query, response)
            .cloned()
            .unwrap_or_default())
    }

    /// Fetch a page of the current search
    pub async fn fetch_page(
        &mut self,
        service: &dyn TransactionService,
        page: u32,
    ) -> Result<&[Transaction]> {
        let (ticket, request) = self.begin_page(page)?;
        let response = service.search(&request).await?;
        self.apply_page(ticket, page, response);
        Ok(&self.results)
    }

    /// Drop the captured search; paging falls back to the controls
    pub fn clear(&mut self) {
        self.sequencer.invalidate();
        self.query = None;
        self.captured = None;
        self.interpretation = None;
        self.results.clear();
        self.total = 0;
        self.page = 1;
    }
}
