use std::sync::Once;

use rustls::crypto::CryptoProvider;
use tracing::debug;

static INSTALL_PROVIDER: Once = Once::new();

/// Installs the process-wide rustls [`CryptoProvider`] the first time it is called.
///
/// Both the kube client and reqwest build TLS configs from the process default, and with more
/// than one provider compiled in rustls refuses to pick one on its own. Safe to call from any
/// number of threads, the installation runs once.
pub fn install_crypto_provider() {
    INSTALL_PROVIDER.call_once(|| {
        if CryptoProvider::get_default().is_some() {
            debug!("crypto provider already installed");
            return;
        }

        if CryptoProvider::install_default(rustls::crypto::aws_lc_rs::default_provider()).is_err()
        {
            debug!("crypto provider installed concurrently by someone else");
        }
    });
}
