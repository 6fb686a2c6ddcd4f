use actix_web::HttpResponse;
use serde_json::{json, Map, Value};

use super::{route_table, RouteSpec};

pub const OPENAPI_PATH: &str = "/docs/openapi.json";

fn operation(spec: &RouteSpec) -> Value {
    let mut op = Map::new();
    op.insert("summary".into(), json!(spec.summary));
    op.insert("tags".into(), json!(["users"]));

    if spec.requires_bearer {
        op.insert("security".into(), json!([{ "bearerAuth": [] }]));
    }

    if !spec.headers.is_empty() {
        let params: Vec<Value> = spec
            .headers
            .iter()
            .map(|name| {
                json!({
                    "name": name,
                    "in": "header",
                    "required": true,
                    "schema": { "type": "string" }
                })
            })
            .collect();
        op.insert("parameters".into(), Value::Array(params));
    }

    if !spec.body_fields.is_empty() {
        let properties: Map<String, Value> = spec
            .body_fields
            .iter()
            .map(|field| (field.to_string(), json!({ "type": "string" })))
            .collect();
        op.insert(
            "requestBody".into(),
            json!({
                "required": true,
                "content": {
                    "application/json": {
                        "schema": {
                            "type": "object",
                            "required": spec.body_fields,
                            "properties": properties
                        }
                    }
                }
            }),
        );
    }

    let responses: Map<String, Value> = spec
        .responses
        .iter()
        .map(|(status, description)| (status.to_string(), json!({ "description": description })))
        .collect();
    op.insert("responses".into(), Value::Object(responses));

    Value::Object(op)
}

/// OpenAPI 3 document generated from the route table
pub fn openapi_document(routes: &[RouteSpec]) -> Value {
    let mut paths = Map::new();
    for spec in routes {
        let entry = paths
            .entry(spec.path.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(methods) = entry {
            methods.insert(spec.method.as_str().to_lowercase(), operation(spec));
        }
    }

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "baro-auth",
            "version": env!("CARGO_PKG_VERSION")
        },
        "paths": paths,
        "components": {
            "securitySchemes": {
                "bearerAuth": { "type": "http", "scheme": "bearer", "bearerFormat": "JWT" }
            }
        }
    })
}

/// GET /docs/openapi.json
pub async fn openapi() -> HttpResponse {
    HttpResponse::Ok().json(openapi_document(&route_table()))
}
