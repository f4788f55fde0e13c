use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

pub const DEFAULT_PAGE_SIZE: usize = 5;
pub const DEFAULT_PAGE_SIZE_OPTIONS: [usize; 3] = [5, 10, 25];

/// One row's worth of field/value data. Row shapes vary per screen (student
/// rosters, questionnaire lists, ...), so rows stay open JSON maps and the
/// column descriptors decide what gets shown and sorted.
pub type Record = serde_json::Map<String, Value>;

/// Replaceable filter over the full record collection. Must be pure; the
/// engine re-applies it on every read.
pub type FilterFn = Box<dyn Fn(&[Record]) -> Vec<Record> + Send>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub disable_sorting: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

impl Default for SortDirection {
    fn default() -> Self {
        SortDirection::Ascending
    }
}

#[derive(Debug, Clone, Default)]
pub struct SortState {
    pub field: Option<String>,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy)]
pub struct PageState {
    pub page_index: usize,
    pub page_size: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadCell {
    pub id: String,
    pub label: String,
    pub sortable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<SortDirection>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total_count: usize,
    pub page_index: usize,
    pub page_count: usize,
    pub page_size: usize,
    pub page_size_options: Vec<usize>,
}

/// Sorted, filtered, paginated view over a caller-supplied record
/// collection. Filter, sort and page are independent state slices; every
/// read recomputes from the source records, which the view never mutates.
pub struct TableView {
    columns: Vec<ColumnDescriptor>,
    records: Vec<Record>,
    filter: FilterFn,
    sort: SortState,
    page: PageState,
    page_size_options: Vec<usize>,
}

impl TableView {
    pub fn new(columns: Vec<ColumnDescriptor>, records: Vec<Record>) -> Self {
        Self::with_page_config(
            columns,
            records,
            DEFAULT_PAGE_SIZE,
            DEFAULT_PAGE_SIZE_OPTIONS.to_vec(),
        )
    }

    pub fn with_page_config(
        columns: Vec<ColumnDescriptor>,
        records: Vec<Record>,
        page_size: usize,
        page_size_options: Vec<usize>,
    ) -> Self {
        TableView {
            columns,
            records,
            filter: Box::new(identity_filter),
            sort: SortState::default(),
            page: PageState {
                page_index: 0,
                page_size: page_size.max(1),
            },
            page_size_options,
        }
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn page_state(&self) -> PageState {
        self.page
    }

    /// Replace the record collection, keeping filter and sort. Screens push
    /// a fresh collection on every upstream refetch; the page index is
    /// clamped so it stays within the refreshed filtered range.
    pub fn set_records(&mut self, records: Vec<Record>) {
        self.records = records;
        let last = self.last_page_index();
        if self.page.page_index > last {
            self.page.page_index = last;
        }
    }

    /// Replace the active filter. A page index the new filtered range can no
    /// longer reach goes back to the first page.
    pub fn set_filter(&mut self, filter: FilterFn) {
        self.filter = filter;
        if self.page.page_index > self.last_page_index() {
            self.page.page_index = 0;
        }
    }

    /// Toggling the active sort column flips direction; any other sortable
    /// column becomes the active one, ascending. Non-sortable and unknown
    /// columns are a no-op.
    pub fn toggle_sort(&mut self, column_id: &str) {
        let sortable = self
            .columns
            .iter()
            .any(|c| c.id == column_id && !c.disable_sorting);
        if !sortable {
            return;
        }

        if self.sort.field.as_deref() == Some(column_id) {
            self.sort.direction = self.sort.direction.flipped();
        } else {
            self.sort.field = Some(column_id.to_string());
            self.sort.direction = SortDirection::Ascending;
        }
    }

    /// Clamps to the last valid page; with nothing to show, page 0.
    pub fn set_page(&mut self, page_index: usize) {
        self.page.page_index = page_index.min(self.last_page_index());
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page.page_size = page_size.max(1);
        self.page.page_index = 0;
    }

    pub fn filtered_count(&self) -> usize {
        self.filtered().len()
    }

    pub fn page_count(&self) -> usize {
        self.filtered_count().div_ceil(self.page.page_size)
    }

    /// The slice of the sorted, filtered collection for the current page.
    pub fn visible_rows(&self) -> Vec<Record> {
        let start = self.page.page_index * self.page.page_size;
        self.ordered()
            .into_iter()
            .skip(start)
            .take(self.page.page_size)
            .collect()
    }

    /// Head state for every column in display order. Only the active sort
    /// column carries a direction indicator; the rest render neutral.
    pub fn head_cells(&self) -> Vec<HeadCell> {
        self.columns
            .iter()
            .map(|c| {
                let active =
                    !c.disable_sorting && self.sort.field.as_deref() == Some(c.id.as_str());
                HeadCell {
                    id: c.id.clone(),
                    label: c.label.clone(),
                    sortable: !c.disable_sorting,
                    direction: active.then_some(self.sort.direction),
                }
            })
            .collect()
    }

    pub fn pagination(&self) -> Pagination {
        Pagination {
            total_count: self.filtered_count(),
            page_index: self.page.page_index,
            page_count: self.page_count(),
            page_size: self.page.page_size,
            page_size_options: self.page_size_options.clone(),
        }
    }

    fn filtered(&self) -> Vec<Record> {
        (self.filter)(&self.records)
    }

    fn ordered(&self) -> Vec<Record> {
        let mut rows = self.filtered();
        if let Some(field) = self.sort.field.clone() {
            let direction = self.sort.direction;
            // Stable sort: rows with equal keys keep their insertion order,
            // in both directions.
            rows.sort_by(|a, b| {
                let ord = compare_values(field_value(a, &field), field_value(b, &field));
                match direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
        }
        rows
    }

    fn last_page_index(&self) -> usize {
        self.page_count().saturating_sub(1)
    }
}

pub fn identity_filter(records: &[Record]) -> Vec<Record> {
    records.to_vec()
}

fn field_value<'a>(record: &'a Record, field: &str) -> &'a Value {
    record.get(field).unwrap_or(&Value::Null)
}

/// Total order over cell values: numbers numerically, text
/// case-insensitively with a case-sensitive tie-break so the order stays
/// deterministic, mixed types by a fixed rank. Never panics on
/// heterogeneous columns.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => compare_text(x, y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    match a.to_lowercase().cmp(&b.to_lowercase()) {
        Ordering::Equal => a.cmp(b),
        ord => ord,
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
