use rocket::{Request, catch, serde::json::Json};
use shared::{ErrorKind, ErrorResponse};

#[catch(400)]
pub fn bad_request(_req: &Request) -> Json<ErrorResponse> {
    Json(ErrorResponse::new(ErrorKind::InvalidRequest, "Invalid request parameters."))
}

#[catch(403)]
pub fn forbidden(_req: &Request) -> Json<ErrorResponse> {
    Json(ErrorResponse::new(ErrorKind::Forbidden, "Admin token missing or invalid."))
}

#[catch(404)]
pub fn not_found(req: &Request) -> Json<ErrorResponse> {
    let message = match req.content_type() {
        Some(ct) if req.method() != rocket::http::Method::Get && !ct.is_json() => {
            "Requests must be sent as application/json.".to_string()
        }
        _ => format!("No route for {}.", req.uri().path()),
    };
    Json(ErrorResponse::new(ErrorKind::NotFound, message))
}

#[catch(422)]
pub fn unprocessable(_req: &Request) -> Json<ErrorResponse> {
    Json(ErrorResponse::new(ErrorKind::InvalidRequest, "Request body has the wrong shape."))
}

#[catch(429)]
pub fn too_many_requests(_req: &Request) -> Json<ErrorResponse> {
    Json(ErrorResponse::new(ErrorKind::RateLimited, "Rate limit exceeded. Please wait before trying again."))
}

#[catch(500)]
pub fn internal_error(_req: &Request) -> Json<ErrorResponse> {
    Json(ErrorResponse::new(ErrorKind::StorageError, "An internal server error occurred."))
}
