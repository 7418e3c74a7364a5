//! `GET /api/info/`: how to use the API

use axum::Json;
use serde_json::{Value, json};

pub async fn api_info() -> Json<Value> {
    Json(json!({
        "message": "Book API with Authentication",
        "authentication": {
            "token_endpoint": "/api-token-auth/",
            "method": "POST",
            "body": {"username": "your_username", "password": "your_password"},
            "response": {"token": "your_token"},
            "header": "Authorization: Token <your_token>"
        },
        "endpoints": {
            "books": {
                "list": "GET /api/books_all/",
                "detail": "GET /api/books_all/<id>/",
                "create": "POST /api/books_all/",
                "update": "PUT /api/books_all/<id>/",
                "partial_update": "PATCH /api/books_all/<id>/",
                "delete": "DELETE /api/books_all/<id>/"
            },
            "authors": {
                "list": "GET /api/authors/",
                "detail": "GET /api/authors/<id>/",
                "create": "POST /api/authors/",
                "update": "PUT /api/authors/<id>/",
                "partial_update": "PATCH /api/authors/<id>/",
                "delete": "DELETE /api/authors/<id>/"
            }
        },
        "query_parameters": {
            "filter": ["title", "author__name", "publication_year"],
            "search": "search=<terms>, matched against title and author__name",
            "ordering": "ordering=title | -title | publication_year | -publication_year",
            "pagination": "page=<n>&page_size=<size>"
        },
        "permissions": {
            "read_operations": "No authentication required",
            "write_operations": "Authentication token required"
        }
    }))
}
