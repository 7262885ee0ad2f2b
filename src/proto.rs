//! The data structures that cross the crate boundary, and the parser for
//! the fixed-layout authenticator data both ceremonies carry.

use nom::bytes::complete::take;
use nom::number::complete::{be_u16, be_u32, u8 as nom_u8};
use serde::{Deserialize, Serialize};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::cbor;
use crate::constants::{AAGUID_APPATTEST, AAGUID_APPATTEST_DEVELOP};
use crate::crypto::{compute_sha256, COSEKey};
use crate::error::AppAttestError;

/// A sign counter.
pub type Counter = u32;

/// The flags byte of authenticator data.
const FLAG_AT: u8 = 0b0100_0000;
const FLAG_ED: u8 = 0b1000_0000;
const FLAG_UP: u8 = 0b0000_0001;
const FLAG_UV: u8 = 0b0000_0100;

/// The identity an attestation is bound to: the 10-character team id and
/// the bundle id, hashed together as `{team_id}.{bundle_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppId {
    team_id: String,
    bundle_id: String,
}

impl AppId {
    /// Build an app id from its team and bundle components.
    pub fn new(team_id: &str, bundle_id: &str) -> Self {
        AppId {
            team_id: team_id.to_string(),
            bundle_id: bundle_id.to_string(),
        }
    }

    /// The combined identifier, `{team_id}.{bundle_id}`.
    pub fn identifier(&self) -> String {
        format!("{}.{}", self.team_id, self.bundle_id)
    }

    /// SHA-256 of the combined identifier - the value authenticator data
    /// carries as its relying party id hash.
    pub(crate) fn rp_id_hash(&self) -> [u8; 32] {
        compute_sha256(self.identifier().as_bytes())
    }
}

impl std::fmt::Display for AppId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.team_id, self.bundle_id)
    }
}

/// Which App Attest environment produced a key, derived from the AAGUID in
/// attestation authenticator data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    /// Keys attested by Apple's production servers.
    Production,
    /// Keys attested in the development (sandbox) environment.
    Development,
}

impl TryFrom<&[u8; 16]> for Environment {
    type Error = AppAttestError;

    fn try_from(aaguid: &[u8; 16]) -> Result<Environment, Self::Error> {
        match *aaguid {
            AAGUID_APPATTEST => Ok(Environment::Production),
            AAGUID_APPATTEST_DEVELOP => Ok(Environment::Development),
            _ => Err(AppAttestError::AaguidInvalid),
        }
    }
}

/// What the client sends for attestation: the key identifier it claims and
/// the CBOR attestation object from `DCAppAttestService.attestKey`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestationResponse {
    /// SHA-256 of the generated public key, sent out-of-band by the app.
    pub key_id: Vec<u8>,
    /// The raw attestation object.
    pub attestation_object: Vec<u8>,
}

impl AttestationResponse {
    /// Build a response from the base64 encodings the DeviceCheck APIs
    /// hand to the app.
    pub fn from_base64(key_id: &str, attestation_object: &str) -> Result<Self, AppAttestError> {
        Ok(AttestationResponse {
            key_id: STANDARD.decode(key_id)?,
            attestation_object: STANDARD.decode(attestation_object)?,
        })
    }
}

/// The outcome of a successful attestation. Persist `credential_id`,
/// `public_key` and `counter` against the user; they are the inputs to
/// later assertion verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationResult {
    /// The attested credential id (equal to the verified key id).
    pub credential_id: Vec<u8>,
    /// The credential public key as an X9.62 uncompressed point.
    pub public_key: Vec<u8>,
    /// The sign counter at attestation, always zero.
    pub counter: Counter,
    /// The opaque receipt, usable against Apple's fraud risk servers.
    /// Never interpreted here.
    pub receipt: Vec<u8>,
    /// Which environment attested the key.
    pub environment: Environment,
}

/// The outcome of a successful assertion: the counter to persist and feed
/// back as `previous` next time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionResult {
    /// The sign counter the device reported.
    pub counter: Counter,
}

/// Attested credential data, present in attestation authenticator data.
#[derive(Debug, Clone)]
pub struct AttestedCredentialData {
    /// The authenticator class identifier. For App Attest this names the
    /// environment rather than a device model.
    pub aaguid: [u8; 16],
    /// The credential id the device claims.
    pub credential_id: Vec<u8>,
    /// The credential public key.
    pub credential_public_key: COSEKey,
}

/// The fixed-layout structure both ceremonies sign over: the relying
/// party id hash, a flags byte, a 32-bit big-endian sign counter, and -
/// when the attested-credential-data flag is set - the credential itself.
#[derive(Debug, Clone)]
pub struct AuthenticatorData {
    /// SHA-256 of the app id this data is bound to.
    pub rp_id_hash: [u8; 32],
    /// User presence flag. Not meaningful for App Attest, parsed anyway.
    pub user_present: bool,
    /// User verification flag.
    pub user_verified: bool,
    /// The sign counter.
    pub counter: Counter,
    /// Attested credential data, when the AT flag is set and bytes follow
    /// the fixed header.
    pub acd: Option<AttestedCredentialData>,
}

fn parse_header(i: &[u8]) -> nom::IResult<&[u8], ([u8; 32], u8, u32)> {
    let (i, rp_id_hash) = take(32usize)(i)?;
    let (i, flags) = nom_u8(i)?;
    let (i, counter) = be_u32(i)?;
    let mut hash = [0u8; 32];
    hash.copy_from_slice(rp_id_hash);
    Ok((i, (hash, flags, counter)))
}

fn parse_acd_header(i: &[u8]) -> nom::IResult<&[u8], ([u8; 16], &[u8])> {
    let (i, aaguid) = take(16usize)(i)?;
    let (i, credential_id_len) = be_u16(i)?;
    let (i, credential_id) = take(credential_id_len as usize)(i)?;
    let mut guid = [0u8; 16];
    guid.copy_from_slice(aaguid);
    Ok((i, (guid, credential_id)))
}

impl TryFrom<&[u8]> for AuthenticatorData {
    type Error = AppAttestError;

    fn try_from(data: &[u8]) -> Result<AuthenticatorData, Self::Error> {
        let (rest, (rp_id_hash, flags, counter)) =
            parse_header(data).map_err(|_| AppAttestError::MalformedEncoding)?;

        // Extension data never appears in App Attest authenticator data.
        if flags & FLAG_ED != 0 {
            return Err(AppAttestError::MalformedEncoding);
        }

        // Devices set the AT flag on assertions too, where the structure
        // ends at the fixed header. Credential data is only present when
        // bytes actually follow.
        let acd = if flags & FLAG_AT != 0 && !rest.is_empty() {
            let (rest, (aaguid, credential_id)) =
                parse_acd_header(rest).map_err(|_| AppAttestError::MalformedEncoding)?;
            // The COSE key spans the remainder exactly.
            let credential_public_key = COSEKey::try_from(&cbor::decode(rest)?)?;
            Some(AttestedCredentialData {
                aaguid,
                credential_id: credential_id.to_vec(),
                credential_public_key,
            })
        } else {
            if !rest.is_empty() {
                return Err(AppAttestError::MalformedEncoding);
            }
            None
        };

        Ok(AuthenticatorData {
            rp_id_hash,
            user_present: flags & FLAG_UP != 0,
            user_verified: flags & FLAG_UV != 0,
            counter,
            acd,
        })
    }
}
