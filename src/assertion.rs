//! Assertion verification.
//!
//! After attestation, the app proves possession of its key per request by
//! signing `authenticatorData || SHA-256(challenge)` with it. The server
//! verifies the signature under the public key stored at attestation, then
//! checks the app binding and counter monotonicity.

use crate::cbor;
use crate::crypto::{compute_sha256, pkey_from_x962_point, verify_signature};
use crate::error::AppAttestError;
use crate::proto::{AssertionResult, AuthenticatorData};

/// Verify an assertion CBOR object (`{"signature", "authenticatorData"}`)
/// for a challenge, under the stored public key point and against the
/// previously recorded result, if any.
///
/// With no previous result the counter is accepted as-is - devices start
/// at 0 or 1 - and replay protection begins once the caller persists the
/// returned result.
pub(crate) fn verify_assertion(
    challenge: &[u8],
    assertion: &[u8],
    rp_id_hash: &[u8; 32],
    public_key: &[u8],
    previous: Option<&AssertionResult>,
) -> Result<AssertionResult, AppAttestError> {
    // 1. Decode the assertion envelope.
    let value = cbor::decode(assertion)?;
    let signature = value
        .lookup_text("signature")
        .ok_or(AppAttestError::MalformedEncoding)?
        .try_bytes()?;
    let auth_data_bytes = value
        .lookup_text("authenticatorData")
        .ok_or(AppAttestError::MalformedEncoding)?
        .try_bytes()?;

    // 2. The signature covers authenticatorData || SHA-256(challenge).
    let client_data_hash = compute_sha256(challenge);
    let mut verification_data = auth_data_bytes.to_vec();
    verification_data.extend_from_slice(&client_data_hash);

    let pkey = pkey_from_x962_point(public_key)?;
    if !verify_signature(&pkey, signature, &verification_data)? {
        error!("assertion signature failed to validate");
        return Err(AppAttestError::SignatureInvalid);
    }

    // 3. Only now is the authenticator data worth interpreting.
    let auth_data = AuthenticatorData::try_from(auth_data_bytes)?;

    // 4. The assertion must name the expected app.
    if auth_data.rp_id_hash != *rp_id_hash {
        return Err(AppAttestError::RpIdMismatch);
    }

    // 5. The counter must advance strictly; an equal or lower value means
    //    a replay or a cloned key.
    if let Some(previous) = previous {
        if auth_data.counter <= previous.counter {
            return Err(AppAttestError::CounterViolation);
        }
    }

    trace!("assertion verified at counter {}", auth_data.counter);

    Ok(AssertionResult {
        counter: auth_data.counter,
    })
}
