//! Machine-readable list of the API's endpoints, served at `GET /api`.

use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub name: &'static str,
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_template: Option<Value>,
}

impl Endpoint {
    fn new(
        category: &'static str,
        name: &'static str,
        method: &'static str,
        path: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            method,
            path,
            description,
            category,
            body_template: None,
        }
    }

    fn with_body(mut self, template: Value) -> Self {
        self.body_template = Some(template);
        self
    }
}

pub fn endpoints() -> Vec<Endpoint> {
    vec![
        Endpoint::new(
            "documents",
            "Get All Documents",
            "GET",
            "/api/documents",
            "Retrieve all documents for the authenticated user",
        ),
        Endpoint::new(
            "documents",
            "Create Document",
            "POST",
            "/api/documents",
            "Create a new document",
        )
        .with_body(json!({
            "title": "My Document",
            "content": "Document content here...",
            "type": "contract",
        })),
        Endpoint::new(
            "documents",
            "Get Document",
            "GET",
            "/api/documents/{id}",
            "Retrieve one document (replace {id} with document ID)",
        ),
        Endpoint::new(
            "documents",
            "Update Document",
            "PUT",
            "/api/documents/{id}",
            "Update an existing document (replace {id} with document ID)",
        )
        .with_body(json!({
            "title": "Updated Title",
            "content": "Updated content...",
        })),
        Endpoint::new(
            "documents",
            "Delete Document",
            "DELETE",
            "/api/documents/{id}",
            "Delete a document (replace {id} with document ID)",
        ),
        Endpoint::new(
            "buttons",
            "Get All Custom Buttons",
            "GET",
            "/api/custom-buttons",
            "Retrieve all custom buttons for the authenticated user",
        ),
        Endpoint::new(
            "buttons",
            "Create Custom Button",
            "POST",
            "/api/custom-buttons",
            "Create a new custom button",
        )
        .with_body(json!({
            "label": "My Button",
            "url": "https://example.com",
            "description": "Button description",
            "icon": "🚀",
            "color": "blue",
            "category": "Navigation",
            "isActive": true,
        })),
        Endpoint::new(
            "buttons",
            "Get Custom Button",
            "GET",
            "/api/custom-buttons/{id}",
            "Retrieve one custom button (replace {id} with button ID)",
        ),
        Endpoint::new(
            "buttons",
            "Update Custom Button",
            "PUT",
            "/api/custom-buttons/{id}",
            "Update an existing custom button (replace {id} with button ID)",
        )
        .with_body(json!({
            "label": "Updated Label",
            "isActive": false,
        })),
        Endpoint::new(
            "buttons",
            "Delete Custom Button",
            "DELETE",
            "/api/custom-buttons/{id}",
            "Delete a custom button (replace {id} with button ID)",
        ),
        Endpoint::new(
            "auth",
            "Get Session",
            "GET",
            "/api/session",
            "Return the user the current session belongs to",
        ),
    ]
}

pub async fn list_endpoints() -> Json<Vec<Endpoint>> {
    Json(endpoints())
}
