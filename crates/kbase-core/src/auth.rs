//! The shared admin secret.
//!
//! Every admin request carries the plaintext password in its JSON body and is
//! checked against one process-wide value. There are no sessions, tokens,
//! lockouts, or per-user identities.
//!
//! # Comparison
//!
//! - The configured secret is SHA-256 hashed once at startup; only the digest
//!   is kept, zeroized on drop.
//! - A supplied password is hashed the same way and compared with
//!   `subtle::ConstantTimeEq`, so the work done does not depend on where the
//!   two values first differ or on their lengths.
//! - Equality is exact: no trimming, no case folding.
//! - An unset or empty secret disables the admin API; nothing verifies.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Process-wide admin credential.
pub struct AdminSecret {
    digest: Option<Zeroizing<[u8; 32]>>,
}

impl AdminSecret {
    /// Build from the configured value. `None` or `""` leaves the admin API
    /// locked.
    #[must_use]
    pub fn new(secret: Option<&str>) -> Self {
        let digest = secret
            .filter(|s| !s.is_empty())
            .map(|s| Zeroizing::new(hash(s)));
        Self { digest }
    }

    /// Whether a usable secret was configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.digest.is_some()
    }

    /// Check a client-supplied password. A missing password never matches.
    #[must_use]
    pub fn verify(&self, supplied: Option<&str>) -> bool {
        let (Some(expected), Some(supplied)) = (self.digest.as_ref(), supplied) else {
            return false;
        };
        let candidate = Zeroizing::new(hash(supplied));
        expected.as_slice().ct_eq(candidate.as_slice()).into()
    }
}

impl std::fmt::Debug for AdminSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSecret")
            .field("configured", &self.is_configured())
            .finish()
    }
}

fn hash(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}
