use actix_web::http::header::AUTHORIZATION;
use actix_web::HttpRequest;

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    let authorization = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = authorization.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let trimmed = token.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed)
}

fn query_token(req: &HttpRequest) -> Option<&str> {
    req.query_string()
        .split('&')
        .find_map(|pair| pair.strip_prefix("token="))
        .filter(|token| !token.is_empty())
}

/// Token identifying the session: `Authorization: Bearer <token>` header,
/// falling back to a `?token=` query parameter.
pub(crate) fn request_token(req: &HttpRequest) -> Option<String> {
    bearer_token(req)
        .or_else(|| query_token(req))
        .map(str::to_string)
}
