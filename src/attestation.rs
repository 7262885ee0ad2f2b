//! Attestation verification.
//!
//! Implements the server-side steps from Apple's "Validating apps that
//! connect to your server": decode the attestation object, walk the
//! certificate chain to the App Attest root, recompute and compare the
//! nonce, then bind the attested key to the credential id, the app id and
//! a zero sign counter.

use crate::cbor;
use crate::constants::APPLE_APP_ATTEST_FMT;
use crate::crypto::compute_sha256;
use crate::error::AppAttestError;
use crate::proto::{AttestationResponse, AttestationResult, AuthenticatorData, Environment};
use crate::x509::{validate_chain, Certificate};

/// A decoded attestation object: `fmt` already checked, certificates
/// parsed, authenticator data parsed but with the raw bytes kept around
/// for the nonce computation.
pub(crate) struct AttestationObject {
    pub x5c: Vec<Certificate>,
    pub receipt: Vec<u8>,
    pub auth_data: AuthenticatorData,
    pub auth_data_bytes: Vec<u8>,
}

pub(crate) fn parse_attestation_object(data: &[u8]) -> Result<AttestationObject, AppAttestError> {
    let value = cbor::decode(data)?;

    let fmt = value
        .lookup_text("fmt")
        .ok_or(AppAttestError::MalformedEncoding)?
        .try_text()?;
    if fmt != APPLE_APP_ATTEST_FMT {
        debug!("rejecting attestation format {:?}", fmt);
        return Err(AppAttestError::AttestationFormatUnsupported);
    }

    let att_stmt = value
        .lookup_text("attStmt")
        .ok_or(AppAttestError::MalformedEncoding)?;
    let x5c = att_stmt
        .lookup_text("x5c")
        .ok_or(AppAttestError::MalformedEncoding)?
        .try_array()?
        .iter()
        .map(|cert| Certificate::from_der(cert.try_bytes()?))
        .collect::<Result<Vec<_>, _>>()?;
    let receipt = att_stmt
        .lookup_text("receipt")
        .ok_or(AppAttestError::MalformedEncoding)?
        .try_bytes()?
        .to_vec();

    let auth_data_bytes = value
        .lookup_text("authData")
        .ok_or(AppAttestError::MalformedEncoding)?
        .try_bytes()?
        .to_vec();
    let auth_data = AuthenticatorData::try_from(auth_data_bytes.as_slice())?;

    Ok(AttestationObject {
        x5c,
        receipt,
        auth_data,
        auth_data_bytes,
    })
}

/// Verify an attestation object against a one-time challenge, the
/// relying party id hash of the expected app, and a trust anchor, at the
/// given unix timestamp.
///
/// Devices send `x5c` as `[leaf, intermediate]` without the root; the
/// configured anchor is appended before chain validation unless the final
/// presented certificate already equals it byte for byte.
pub(crate) fn verify_attestation(
    challenge: &[u8],
    response: &AttestationResponse,
    rp_id_hash: &[u8; 32],
    trust_anchor: &Certificate,
    at: i64,
) -> Result<AttestationResult, AppAttestError> {
    // 1. Decode the CBOR attestation object and check its format.
    let att_obj = parse_attestation_object(&response.attestation_object)?;

    // 2. Verify that the x5c certificates chain to the trust anchor and
    //    are valid at the verification time.
    let mut chain = att_obj.x5c;
    if chain.last().map_or(true, |cert| cert.der != trust_anchor.der) {
        chain.push(trust_anchor.clone());
    }
    validate_chain(&chain, trust_anchor, at)?;
    // chain.first() is the credential certificate; validate_chain already
    // rejected empty chains.
    let cred_cert = chain.first().ok_or(AppAttestError::MalformedCertificate)?;

    // 3. The client data hash is the SHA-256 of the one-time challenge.
    let client_data_hash = compute_sha256(challenge);

    // 4. Compute the nonce over authenticator data and client data hash.
    let mut nonce_data = att_obj.auth_data_bytes.clone();
    nonce_data.extend_from_slice(&client_data_hash);
    let nonce = compute_sha256(&nonce_data);

    // 5. The nonce must equal the value of the 1.2.840.113635.100.8.2
    //    extension in the credential certificate; this proves the
    //    statement is live and covers the authenticator data.
    if cred_cert.apple_nonce()? != nonce {
        error!("attestation certificate nonce mismatch");
        return Err(AppAttestError::NonceMismatch);
    }

    // 6. Attestation must carry attested credential data.
    let acd = att_obj
        .auth_data
        .acd
        .as_ref()
        .ok_or(AppAttestError::MissingAttestedCredentialData)?;

    // 7. The credential id must be the SHA-256 of the credential public
    //    key, and must agree with the key id the app sent out-of-band.
    let credential_key = &acd.credential_public_key;
    let public_key = credential_key.x962_uncompressed();
    if compute_sha256(&public_key).as_slice() != acd.credential_id.as_slice()
        || response.key_id != acd.credential_id
    {
        return Err(AppAttestError::CredentialIdMismatch);
    }

    // 8. The credential certificate must certify exactly the attested key.
    if cred_cert.public_key_point != public_key {
        return Err(AppAttestError::PublicKeyMismatch);
    }

    // 9. The relying party id hash must name the expected app.
    if att_obj.auth_data.rp_id_hash != *rp_id_hash {
        return Err(AppAttestError::RpIdMismatch);
    }

    // 10. A fresh key has never signed anything.
    if att_obj.auth_data.counter != 0 {
        return Err(AppAttestError::CounterViolation);
    }

    // 11. The AAGUID names the environment that attested the key.
    let environment = Environment::try_from(&acd.aaguid)?;

    debug!(
        "attestation verified for credential {:?} in {:?}",
        acd.credential_id, environment
    );

    Ok(AttestationResult {
        credential_id: acd.credential_id.clone(),
        public_key,
        counter: att_obj.auth_data.counter,
        receipt: att_obj.receipt,
        environment,
    })
}
