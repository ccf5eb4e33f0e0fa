//! Owner identity carried in an encrypted cookie.
//!
//! The cookie holds the owner id sealed with AES-256-GCM. The key is the
//! SHA-256 digest of a configured secret, the 12-byte nonce is random per
//! cookie and prepended to the ciphertext, and the whole value is base64url
//! encoded. A request without a cookie that opens gets a fresh owner id and
//! a `Set-Cookie` on the response.

use crate::state::AppState;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use axum::extract::{Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

pub const COOKIE_NAME: &str = "UserID";

const NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
#[error("cannot seal identity cookie")]
pub struct SealError;

/// Seals and opens identity cookie values.
#[derive(Clone)]
pub struct CookieCipher {
    cipher: Aes256Gcm,
}

impl CookieCipher {
    pub fn new(secret: &str) -> Self {
        let key = Sha256::digest(secret.as_bytes());
        Self {
            cipher: Aes256Gcm::new(&key),
        }
    }

    pub fn seal(&self, owner_id: &str) -> Result<String, SealError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, owner_id.as_bytes())
            .map_err(|_| SealError)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(sealed))
    }

    /// Returns the owner id inside `value`, or `None` if it was not sealed
    /// with this key.
    pub fn open(&self, value: &str) -> Option<String> {
        let sealed = URL_SAFE_NO_PAD.decode(value).ok()?;
        if sealed.len() <= NONCE_LEN {
            return None;
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .ok()?;
        String::from_utf8(plain).ok()
    }
}

/// The owner a request acts for.
///
/// `established` is false when the id was issued for this request, i.e. the
/// client did not present a valid cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub id: String,
    pub established: bool,
}

fn new_owner_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Extracts the value of cookie `name` from the `Cookie` headers.
fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Middleware that attaches an [`Owner`] to every request.
pub async fn identify(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let presented = cookie_value(request.headers(), COOKIE_NAME)
        .and_then(|value| state.cookies().open(value));

    let owner = match presented {
        Some(id) => Owner {
            id,
            established: true,
        },
        None => Owner {
            id: new_owner_id(),
            established: false,
        },
    };
    request.extensions_mut().insert(owner.clone());

    let mut response = next.run(request).await;
    if owner.established {
        return response;
    }

    let sealed = match state.cookies().seal(&owner.id) {
        Ok(sealed) => sealed,
        Err(err) => {
            warn!(error = %err, "identity cookie not issued");
            return response;
        }
    };
    match HeaderValue::from_str(&format!("{COOKIE_NAME}={sealed}; Path=/; HttpOnly")) {
        Ok(value) => {
            debug!(owner_id = %owner.id, "issued identity cookie");
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(err) => warn!(error = %err, "identity cookie not issued"),
    }

    response
}
