use std::sync::Arc;

use burrow_generator::Generator;
use burrow_shortener::ShortenerService;

use crate::identity::CookieCipher;
use crate::subnet::TrustedSubnet;

pub type Shortener = ShortenerService<Box<dyn Generator>>;

#[derive(Clone)]
pub struct AppState {
    shortener: Arc<Shortener>,
    cookies: Arc<CookieCipher>,
    trusted_subnet: Option<TrustedSubnet>,
}

impl AppState {
    pub fn new(
        shortener: Shortener,
        cookies: CookieCipher,
        trusted_subnet: Option<TrustedSubnet>,
    ) -> Self {
        Self {
            shortener: Arc::new(shortener),
            cookies: Arc::new(cookies),
            trusted_subnet,
        }
    }

    pub fn shortener(&self) -> &Shortener {
        &self.shortener
    }

    pub fn cookies(&self) -> &CookieCipher {
        &self.cookies
    }

    pub fn trusted_subnet(&self) -> Option<&TrustedSubnet> {
        self.trusted_subnet.as_ref()
    }
}
