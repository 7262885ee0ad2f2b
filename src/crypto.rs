//! Cryptographic operation wrappers. This module exists to allow ease of
//! auditing and safe operation wrappers for the verification procedures.
//! It currently uses OpenSSL as the cryptographic primitive provider.

use openssl::{bn, ec, hash, nid, pkey, sha, sign};
use serde::{Deserialize, Serialize};

use crate::cbor;
use crate::error::AppAttestError;

// Why OpenSSL over another rust crate?
// - The openssl crate allows us to reconstruct a public key from the
//   x/y group coords, where most others want a pkcs formatted structure. As
//   a result, it's easiest to use openssl as it gives us exactly what we need
//   for these operations, and despite it's many challenges as a library, it
//   has resources and investment into it's maintenance, so we can at least
//   assert a higher level of confidence in it than <backyard crypto here>.

/// An ECDSA curve as named in a COSE key. App Attest keys are always
/// P-256.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ECDSACurve {
    /// NIST P-256, COSE curve identifier 1.
    SECP256R1,
}

/// The credential public key as attested in authenticator data: a COSE
/// EC2 key restricted to what App Attest produces (kty EC2, alg ES256,
/// crv P-256).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct COSEKey {
    /// The curve the point lies on.
    pub curve: ECDSACurve,
    /// The key's public X coordinate.
    pub x: [u8; 32],
    /// The key's public Y coordinate.
    pub y: [u8; 32],
}

impl TryFrom<&cbor::Value> for COSEKey {
    type Error = AppAttestError;

    fn try_from(d: &cbor::Value) -> Result<COSEKey, Self::Error> {
        // kty (1) must be EC2 (2).
        let kty = d
            .lookup_integer(1)
            .ok_or(AppAttestError::CoseKeyInvalid)?
            .try_integer()
            .map_err(|_| AppAttestError::CoseKeyInvalid)?;
        // alg (3) must be ES256 (-7).
        let alg = d
            .lookup_integer(3)
            .ok_or(AppAttestError::CoseKeyInvalid)?
            .try_integer()
            .map_err(|_| AppAttestError::CoseKeyInvalid)?;
        // crv (-1) must be P-256 (1).
        let crv = d
            .lookup_integer(-1)
            .ok_or(AppAttestError::CoseKeyInvalid)?
            .try_integer()
            .map_err(|_| AppAttestError::CoseKeyInvalid)?;
        if kty != 2 || alg != -7 || crv != 1 {
            return Err(AppAttestError::CoseKeyInvalid);
        }

        let x = d
            .lookup_integer(-2)
            .ok_or(AppAttestError::CoseKeyInvalid)?
            .try_bytes()
            .map_err(|_| AppAttestError::CoseKeyInvalid)?;
        let y = d
            .lookup_integer(-3)
            .ok_or(AppAttestError::CoseKeyInvalid)?
            .try_bytes()
            .map_err(|_| AppAttestError::CoseKeyInvalid)?;

        Ok(COSEKey {
            curve: ECDSACurve::SECP256R1,
            x: x.try_into().map_err(|_| AppAttestError::CoseKeyInvalid)?,
            y: y.try_into().map_err(|_| AppAttestError::CoseKeyInvalid)?,
        })
    }
}

impl COSEKey {
    /// The X9.62 uncompressed point, `04 || x || y`. This is the form the
    /// key identifier is the SHA-256 digest of, and the form callers should
    /// persist for later assertion verification.
    pub fn x962_uncompressed(&self) -> Vec<u8> {
        let mut point = Vec::with_capacity(65);
        point.push(0x04);
        point.extend_from_slice(&self.x);
        point.extend_from_slice(&self.y);
        point
    }
}

/// Reconstruct a P-256 public key from an X9.62 point as stored by the
/// caller after attestation.
pub(crate) fn pkey_from_x962_point(
    point: &[u8],
) -> Result<pkey::PKey<pkey::Public>, AppAttestError> {
    let group = ec::EcGroup::from_curve_name(nid::Nid::X9_62_PRIME256V1)?;
    let mut ctx = bn::BigNumContext::new()?;
    let ec_point = ec::EcPoint::from_bytes(&group, point, &mut ctx)
        .map_err(|_| AppAttestError::CoseKeyInvalid)?;
    let ec_key = ec::EcKey::from_public_key(&group, &ec_point)?;
    ec_key
        .check_key()
        .map_err(|_| AppAttestError::CoseKeyInvalid)?;
    Ok(pkey::PKey::from_ec_key(ec_key)?)
}

/// Verify an ECDSA-SHA256 signature over `verification_data`.
pub(crate) fn verify_signature(
    pkey: &pkey::PKeyRef<pkey::Public>,
    signature: &[u8],
    verification_data: &[u8],
) -> Result<bool, AppAttestError> {
    let mut verifier = sign::Verifier::new(hash::MessageDigest::sha256(), pkey)?;
    verifier.update(verification_data)?;
    // A structurally broken signature is just an invalid one.
    Ok(verifier.verify(signature).unwrap_or(false))
}

pub(crate) fn compute_sha256(data: &[u8]) -> [u8; 32] {
    sha::sha256(data)
}
