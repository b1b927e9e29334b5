use serde::{Deserialize, Serialize};
use tracing::debug;

use hw_provider_core::types::{Address, Bytes};

use super::adapter::decode_signature;
use crate::{ledger::HwApp, HwProviderError};

/// An address together with its signature over an opaque login token
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProof {
    pub address: Address,
    pub signature: Bytes,
}

/// Proves control of an address by signing a token with it. Token signing is not
/// gated on the firmware version.
#[derive(Debug)]
pub struct IdentityProofSigner<'a> {
    app: &'a dyn HwApp,
    account: u32,
}

impl<'a> IdentityProofSigner<'a> {
    pub fn new(app: &'a dyn HwApp, account: u32) -> Self {
        Self { app, account }
    }

    /// Reads the address at `index` and signs `token` with it in one device round trip
    #[tracing::instrument(skip(self, token), fields(len = token.len()))]
    pub async fn prove_identity(
        &self,
        token: &[u8],
        index: u32,
    ) -> Result<IdentityProof, HwProviderError> {
        let response =
            self.app.get_address_and_sign_auth_token(self.account, index, token).await?;
        let signature = decode_signature(&response.signature)?;
        debug!(address = %response.address, "token signed");
        Ok(IdentityProof { address: response.address, signature })
    }
}
