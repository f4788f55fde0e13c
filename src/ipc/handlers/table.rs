use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::view::{identity_filter, FilterFn, Record, TableView};
use log::debug;
use serde_json::{json, Value};

const CONTAINS_QUERY_MAX_LEN: usize = 256;

fn require_view_id(req: &Request) -> Result<String, HandlerErr> {
    match req.params.get("viewId").and_then(|v| v.as_str()) {
        Some(v) => Ok(v.to_string()),
        None => Err(HandlerErr::bad_params("missing viewId")),
    }
}

fn open_view<'a>(
    state: &'a mut AppState,
    view_id: &str,
) -> Result<&'a mut TableView, HandlerErr> {
    state.views.get_mut(view_id).ok_or_else(|| HandlerErr {
        code: "not_found",
        message: "view not found".to_string(),
        details: Some(json!({ "viewId": view_id })),
    })
}

fn head_json(view: &TableView) -> serde_json::Value {
    serde_json::to_value(view.head_cells()).unwrap_or_else(|_| json!([]))
}

fn rows_json(view: &TableView) -> serde_json::Value {
    serde_json::to_value(view.visible_rows()).unwrap_or_else(|_| json!([]))
}

fn pagination_json(view: &TableView) -> serde_json::Value {
    serde_json::to_value(view.pagination()).unwrap_or_else(|_| json!({}))
}

fn value_contains(v: &Value, needle: &str) -> bool {
    match v {
        Value::String(s) => s.to_lowercase().contains(needle),
        Value::Number(n) => n.to_string().contains(needle),
        Value::Bool(b) => b.to_string().contains(needle),
        _ => false,
    }
}

/// Compile the wire filter into the engine's collection-level predicate.
/// Screens only ever send the search-box shapes: everything, or a
/// case-insensitive substring match on one field or the whole record.
fn compile_filter(params: &serde_json::Value) -> Result<FilterFn, HandlerErr> {
    let Some(raw) = params.get("filter") else {
        return Err(HandlerErr::bad_params("missing filter"));
    };
    let Some(kind) = raw.get("type").and_then(|v| v.as_str()) else {
        return Err(HandlerErr::bad_params("filter.type must be a string"));
    };

    match kind {
        "all" => Ok(Box::new(identity_filter)),
        "contains" => {
            let Some(query) = raw.get("query").and_then(|v| v.as_str()) else {
                return Err(HandlerErr::bad_params("contains filter requires query"));
            };
            if query.len() > CONTAINS_QUERY_MAX_LEN {
                return Err(HandlerErr::bad_params("query is too long").with_details(
                    json!({ "length": query.len(), "maxLength": CONTAINS_QUERY_MAX_LEN }),
                ));
            }
            let field = raw
                .get("field")
                .and_then(|v| v.as_str())
                .map(str::to_string);
            let needle = query.to_lowercase();

            Ok(Box::new(move |records: &[Record]| {
                records
                    .iter()
                    .filter(|r| match field.as_deref() {
                        Some(f) => r.get(f).map(|v| value_contains(v, &needle)).unwrap_or(false),
                        None => r.values().any(|v| value_contains(v, &needle)),
                    })
                    .cloned()
                    .collect()
            }))
        }
        other => Err(
            HandlerErr::bad_params(format!("unknown filter type: {}", other))
                .with_details(json!({ "type": other })),
        ),
    }
}

fn handle_set_filter(state: &mut AppState, req: &Request) -> serde_json::Value {
    let view_id = match require_view_id(req) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let filter = match compile_filter(&req.params) {
        Ok(f) => f,
        Err(e) => return e.response(&req.id),
    };
    let view = match open_view(state, &view_id) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    view.set_filter(filter);
    debug!("view {} filter replaced", view_id);

    ok(
        &req.id,
        json!({ "ok": true, "pagination": pagination_json(view) }),
    )
}

fn handle_toggle_sort(state: &mut AppState, req: &Request) -> serde_json::Value {
    let view_id = match require_view_id(req) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let column_id = match req.params.get("columnId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing columnId", None),
    };
    let view = match open_view(state, &view_id) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    view.toggle_sort(&column_id);
    debug!("view {} sort toggled on {}", view_id, column_id);

    ok(&req.id, json!({ "ok": true, "head": head_json(view) }))
}

fn handle_set_page(state: &mut AppState, req: &Request) -> serde_json::Value {
    let view_id = match require_view_id(req) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let page_index = match req.params.get("pageIndex").and_then(|v| v.as_u64()) {
        Some(v) => v as usize,
        None => return err(&req.id, "bad_params", "missing/invalid pageIndex", None),
    };
    let view = match open_view(state, &view_id) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    view.set_page(page_index);

    ok(
        &req.id,
        json!({ "ok": true, "pageIndex": view.page_state().page_index }),
    )
}

fn handle_set_page_size(state: &mut AppState, req: &Request) -> serde_json::Value {
    let view_id = match require_view_id(req) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let page_size = match req.params.get("pageSize").and_then(|v| v.as_u64()) {
        Some(v) if v >= 1 => v as usize,
        _ => {
            return err(
                &req.id,
                "bad_params",
                "pageSize must be a positive integer",
                None,
            )
        }
    };
    let view = match open_view(state, &view_id) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    view.set_page_size(page_size);

    ok(
        &req.id,
        json!({ "ok": true, "pagination": pagination_json(view) }),
    )
}

fn handle_head(state: &mut AppState, req: &Request) -> serde_json::Value {
    let view_id = match require_view_id(req) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let view = match open_view(state, &view_id) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    ok(&req.id, json!({ "head": head_json(view) }))
}

fn handle_rows(state: &mut AppState, req: &Request) -> serde_json::Value {
    let view_id = match require_view_id(req) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let view = match open_view(state, &view_id) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    ok(
        &req.id,
        json!({
            "rows": rows_json(view),
            "pageIndex": view.page_state().page_index
        }),
    )
}

fn handle_pagination(state: &mut AppState, req: &Request) -> serde_json::Value {
    let view_id = match require_view_id(req) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let view = match open_view(state, &view_id) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    ok(&req.id, pagination_json(view))
}

fn handle_render(state: &mut AppState, req: &Request) -> serde_json::Value {
    let view_id = match require_view_id(req) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let view = match open_view(state, &view_id) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    ok(
        &req.id,
        json!({
            "head": head_json(view),
            "rows": rows_json(view),
            "pagination": pagination_json(view)
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "view.setFilter" => Some(handle_set_filter(state, req)),
        "view.toggleSort" => Some(handle_toggle_sort(state, req)),
        "view.setPage" => Some(handle_set_page(state, req)),
        "view.setPageSize" => Some(handle_set_page_size(state, req)),
        "view.head" => Some(handle_head(state, req)),
        "view.rows" => Some(handle_rows(state, req)),
        "view.pagination" => Some(handle_pagination(state, req)),
        "view.render" => Some(handle_render(state, req)),
        _ => None,
    }
}
