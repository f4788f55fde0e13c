use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_tableviewd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn tableviewd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn roster_columns() -> serde_json::Value {
    json!([
        { "id": "name", "label": "Name" },
        { "id": "age", "label": "Age" },
        { "id": "actions", "label": "Actions", "disableSorting": true }
    ])
}

fn open_view(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    records: serde_json::Value,
    page_size: u64,
) -> String {
    let opened = request_ok(
        stdin,
        reader,
        "open",
        "view.open",
        json!({
            "columns": roster_columns(),
            "records": records,
            "pageSize": page_size
        }),
    );
    opened
        .get("viewId")
        .and_then(|v| v.as_str())
        .expect("viewId")
        .to_string()
}

fn row_names(result: &serde_json::Value) -> Vec<String> {
    result
        .get("rows")
        .and_then(|v| v.as_array())
        .expect("rows array")
        .iter()
        .map(|r| {
            r.get("name")
                .and_then(|v| v.as_str())
                .expect("name field")
                .to_string()
        })
        .collect()
}

#[test]
fn toggle_sort_flips_direction_and_round_trips() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let view_id = open_view(
        &mut stdin,
        &mut reader,
        json!([
            { "id": 1, "name": "B" },
            { "id": 2, "name": "A" }
        ]),
        10,
    );

    let toggled = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "view.toggleSort",
        json!({ "viewId": view_id, "columnId": "name" }),
    );
    let head = toggled.get("head").and_then(|v| v.as_array()).expect("head");
    assert_eq!(
        head[0].get("direction").and_then(|v| v.as_str()),
        Some("ascending")
    );
    assert_eq!(head[1].get("direction"), None);

    let rows = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "view.rows",
        json!({ "viewId": view_id }),
    );
    assert_eq!(row_names(&rows), vec!["A", "B"]);

    let toggled = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "view.toggleSort",
        json!({ "viewId": view_id, "columnId": "name" }),
    );
    let head = toggled.get("head").and_then(|v| v.as_array()).expect("head");
    assert_eq!(
        head[0].get("direction").and_then(|v| v.as_str()),
        Some("descending")
    );

    let rows = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "view.rows",
        json!({ "viewId": view_id }),
    );
    assert_eq!(row_names(&rows), vec!["B", "A"]);

    // A third toggle lands back on the original ascending order.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "view.toggleSort",
        json!({ "viewId": view_id, "columnId": "name" }),
    );
    let rows = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "view.rows",
        json!({ "viewId": view_id }),
    );
    assert_eq!(row_names(&rows), vec!["A", "B"]);

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn numeric_column_sorts_numerically() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let view_id = open_view(
        &mut stdin,
        &mut reader,
        json!([
            { "id": 1, "name": "x", "age": 10 },
            { "id": 2, "name": "y", "age": 9 },
            { "id": 3, "name": "z", "age": 2 }
        ]),
        10,
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "view.toggleSort",
        json!({ "viewId": view_id, "columnId": "age" }),
    );
    let rows = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "view.rows",
        json!({ "viewId": view_id }),
    );
    let ages: Vec<u64> = rows
        .get("rows")
        .and_then(|v| v.as_array())
        .expect("rows")
        .iter()
        .map(|r| r.get("age").and_then(|v| v.as_u64()).expect("age"))
        .collect();
    assert_eq!(ages, vec![2, 9, 10]);

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn non_sortable_column_stays_neutral() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let view_id = open_view(
        &mut stdin,
        &mut reader,
        json!([
            { "id": 1, "name": "B" },
            { "id": 2, "name": "A" }
        ]),
        10,
    );

    let toggled = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "view.toggleSort",
        json!({ "viewId": view_id, "columnId": "actions" }),
    );
    let head = toggled.get("head").and_then(|v| v.as_array()).expect("head");
    assert_eq!(head[2].get("sortable").and_then(|v| v.as_bool()), Some(false));
    assert!(head.iter().all(|c| c.get("direction").is_none()));

    // Insertion order survives an ignored toggle.
    let rows = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "view.rows",
        json!({ "viewId": view_id }),
    );
    assert_eq!(row_names(&rows), vec!["B", "A"]);

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn pages_partition_records_and_set_page_clamps() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let records: Vec<serde_json::Value> = (0..25)
        .map(|i| json!({ "id": i, "name": format!("student-{:02}", i) }))
        .collect();
    let view_id = open_view(&mut stdin, &mut reader, json!(records), 10);

    let pagination = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "view.pagination",
        json!({ "viewId": view_id }),
    );
    assert_eq!(pagination.get("totalCount").and_then(|v| v.as_u64()), Some(25));
    assert_eq!(pagination.get("pageCount").and_then(|v| v.as_u64()), Some(3));
    assert_eq!(pagination.get("pageSize").and_then(|v| v.as_u64()), Some(10));

    let mut lengths = Vec::new();
    let mut total = 0;
    for page in 0..3 {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("page-{}", page),
            "view.setPage",
            json!({ "viewId": view_id, "pageIndex": page }),
        );
        let rows = request_ok(
            &mut stdin,
            &mut reader,
            &format!("rows-{}", page),
            "view.rows",
            json!({ "viewId": view_id }),
        );
        let len = rows
            .get("rows")
            .and_then(|v| v.as_array())
            .expect("rows")
            .len();
        lengths.push(len);
        total += len;
    }
    assert_eq!(lengths, vec![10, 10, 5]);
    assert_eq!(total, 25);

    // Past-the-end request clamps to the last valid page.
    let set = request_ok(
        &mut stdin,
        &mut reader,
        "clamp",
        "view.setPage",
        json!({ "viewId": view_id, "pageIndex": 5 }),
    );
    assert_eq!(set.get("pageIndex").and_then(|v| v.as_u64()), Some(2));

    drop(stdin);
    let _ = child.wait();
}
