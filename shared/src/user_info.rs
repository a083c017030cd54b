use serde::{Serialize, Deserialize};

/// Identity of the calling client, used only for rate limiting and logs.
/// Voter eligibility is decided by the voter id in the request body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    pub fingerprint: String,
    pub ip: Option<String>,
}

impl UserInfo {
    pub fn from_parts(ip: Option<&str>, user_agent: Option<&str>) -> Self {
        Self {
            fingerprint: client_fingerprint(ip.unwrap_or("unknown"), user_agent),
            ip: ip.map(str::to_string),
        }
    }
}

pub fn client_fingerprint(ip: &str, user_agent: Option<&str>) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use sha2::{Sha256, Digest};

    let mut hasher = Sha256::new();
    hasher.update(ip.as_bytes());
    hasher.update([0u8]);
    if let Some(ua) = user_agent {
        hasher.update(ua.as_bytes());
    }
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

#[cfg(feature = "backend")]
mod backend_impl {
    use super::*;
    use rocket::request::{FromRequest, Outcome};
    use rocket::Request;

    #[rocket::async_trait]
    impl<'r> FromRequest<'r> for UserInfo {
        type Error = std::convert::Infallible;

        async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
            let headers = req.headers();
            let forwarded = headers
                .get_one("X-Forwarded-For")
                .and_then(|list| list.split(',').next())
                .map(str::trim)
                .map(str::to_string);
            let ip = req.client_ip().map(|ip| ip.to_string()).or(forwarded);

            Outcome::Success(UserInfo::from_parts(ip.as_deref(), headers.get_one("User-Agent")))
        }
    }
}
