use std::collections::HashMap;

use serde::Deserialize;

use crate::view::TableView;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Open views keyed by view id. Each view owns its own filter/sort/page
/// state; screens never share one.
pub struct AppState {
    pub views: HashMap<String, TableView>,
}

impl AppState {
    pub fn new() -> Self {
        AppState {
            views: HashMap::new(),
        }
    }
}
