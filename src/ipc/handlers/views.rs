use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::view::{
    ColumnDescriptor, Record, TableView, DEFAULT_PAGE_SIZE, DEFAULT_PAGE_SIZE_OPTIONS,
};
use log::info;
use serde_json::json;
use uuid::Uuid;

const OPEN_MAX_COLUMNS: usize = 64;
const OPEN_MAX_RECORDS: usize = 10_000;

fn parse_columns(params: &serde_json::Value) -> Result<Vec<ColumnDescriptor>, HandlerErr> {
    let Some(raw) = params.get("columns") else {
        return Err(HandlerErr::bad_params("missing columns"));
    };

    let columns: Vec<ColumnDescriptor> = serde_json::from_value(raw.clone())
        .map_err(|e| HandlerErr::bad_params(format!("invalid columns: {}", e)))?;

    if columns.is_empty() {
        return Err(HandlerErr::bad_params("columns must not be empty"));
    }
    if columns.len() > OPEN_MAX_COLUMNS {
        return Err(
            HandlerErr::bad_params("too many columns").with_details(json!({
                "columns": columns.len(),
                "maxColumns": OPEN_MAX_COLUMNS
            })),
        );
    }
    if let Some(blank) = columns.iter().find(|c| c.id.trim().is_empty()) {
        return Err(HandlerErr::bad_params("column id must not be empty")
            .with_details(json!({ "label": blank.label })));
    }

    Ok(columns)
}

fn parse_records(raw: &serde_json::Value) -> Result<Vec<Record>, HandlerErr> {
    let Some(arr) = raw.as_array() else {
        return Err(HandlerErr::bad_params("records must be an array"));
    };
    if arr.len() > OPEN_MAX_RECORDS {
        return Err(
            HandlerErr::bad_params("record collection is too large").with_details(json!({
                "records": arr.len(),
                "maxRecords": OPEN_MAX_RECORDS
            })),
        );
    }

    arr.iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_object().cloned().ok_or_else(|| {
                HandlerErr::bad_params(format!("record at index {} must be an object", i))
            })
        })
        .collect()
}

fn parse_page_size(params: &serde_json::Value) -> Result<Option<usize>, HandlerErr> {
    match params.get("pageSize") {
        None => Ok(None),
        Some(v) => match v.as_u64() {
            Some(n) if n >= 1 => Ok(Some(n as usize)),
            _ => Err(HandlerErr::bad_params("pageSize must be a positive integer")),
        },
    }
}

fn parse_page_size_options(params: &serde_json::Value) -> Result<Option<Vec<usize>>, HandlerErr> {
    let Some(raw) = params.get("pageSizeOptions") else {
        return Ok(None);
    };
    let Some(arr) = raw.as_array() else {
        return Err(HandlerErr::bad_params("pageSizeOptions must be an array"));
    };

    let mut options = Vec::with_capacity(arr.len());
    for v in arr {
        match v.as_u64() {
            Some(n) if n >= 1 => options.push(n as usize),
            _ => {
                return Err(HandlerErr::bad_params(
                    "pageSizeOptions must contain positive integers",
                ))
            }
        }
    }
    if options.is_empty() {
        return Err(HandlerErr::bad_params("pageSizeOptions must not be empty"));
    }
    Ok(Some(options))
}

fn handle_view_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let columns = match parse_columns(&req.params) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let records = match req.params.get("records") {
        Some(raw) => match parse_records(raw) {
            Ok(v) => v,
            Err(e) => return e.response(&req.id),
        },
        None => Vec::new(),
    };
    let page_size = match parse_page_size(&req.params) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let page_size_options = match parse_page_size_options(&req.params) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    let view_id = Uuid::new_v4().to_string();
    let record_count = records.len();
    let view = if page_size.is_none() && page_size_options.is_none() {
        TableView::new(columns, records)
    } else {
        TableView::with_page_config(
            columns,
            records,
            page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            page_size_options.unwrap_or_else(|| DEFAULT_PAGE_SIZE_OPTIONS.to_vec()),
        )
    };

    info!(
        "view {} opened ({} columns, {} records)",
        view_id,
        view.columns().len(),
        record_count
    );
    state.views.insert(view_id.clone(), view);

    ok(
        &req.id,
        json!({ "viewId": view_id, "recordCount": record_count }),
    )
}

fn handle_view_close(state: &mut AppState, req: &Request) -> serde_json::Value {
    let view_id = match req.params.get("viewId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing viewId", None),
    };

    if state.views.remove(&view_id).is_none() {
        return err(
            &req.id,
            "not_found",
            "view not found",
            Some(json!({ "viewId": view_id })),
        );
    }

    info!("view {} closed", view_id);
    ok(&req.id, json!({ "ok": true }))
}

fn handle_view_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let mut views: Vec<serde_json::Value> = state
        .views
        .iter()
        .map(|(id, view)| {
            let p = view.pagination();
            json!({
                "viewId": id,
                "recordCount": view.record_count(),
                "filteredCount": p.total_count,
                "pageIndex": p.page_index,
                "pageCount": p.page_count
            })
        })
        .collect();

    // HashMap order is not stable; keep the listing deterministic.
    views.sort_by(|a, b| {
        a.get("viewId")
            .and_then(|v| v.as_str())
            .cmp(&b.get("viewId").and_then(|v| v.as_str()))
    });

    ok(&req.id, json!({ "views": views }))
}

fn handle_view_set_records(state: &mut AppState, req: &Request) -> serde_json::Value {
    let view_id = match req.params.get("viewId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing viewId", None),
    };
    let Some(raw) = req.params.get("records") else {
        return err(&req.id, "bad_params", "missing records", None);
    };
    let records = match parse_records(raw) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    let Some(view) = state.views.get_mut(&view_id) else {
        return err(
            &req.id,
            "not_found",
            "view not found",
            Some(json!({ "viewId": view_id })),
        );
    };

    let record_count = records.len();
    view.set_records(records);

    ok(
        &req.id,
        json!({ "ok": true, "recordCount": record_count }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "view.open" => Some(handle_view_open(state, req)),
        "view.close" => Some(handle_view_close(state, req)),
        "view.list" => Some(handle_view_list(state, req)),
        "view.setRecords" => Some(handle_view_set_records(state, req)),
        _ => None,
    }
}
