//! X.509 certificate parsing and chain validation.
//!
//! Structural access (TBS bytes, validity, extensions) goes through
//! x509-parser and der-parser; the actual signature checks are done with
//! OpenSSL over the raw TBS bytes. Chains are validated pairwise from the
//! leaf upward, and the terminal certificate must be byte-identical to the
//! configured trust anchor - there is no path building and no revocation
//! checking.

use der_parser::der::{
    parse_der_container, parse_der_octetstring, parse_der_tagged_explicit, Class, Header, Tag,
};
use der_parser::error::BerError;
use der_parser::oid::Oid;
use openssl::hash::MessageDigest;
use openssl::sign::Verifier;
use openssl::x509::X509;
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::constants::MAX_CHAIN_LEN;
use crate::error::{AppAttestError, ChainFailure};

/// The App Attest nonce extension.
const APPLE_NONCE_OID: Oid<'static> = der_parser::oid!(1.2.840 .113635 .100 .8 .2);

/// Signature algorithms Apple uses on App Attest chains. Anything else
/// fails certificate parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SignatureAlgorithm {
    EcdsaSha256,
    EcdsaSha384,
    EcdsaSha512,
}

impl SignatureAlgorithm {
    fn from_oid(oid: &str) -> Option<Self> {
        match oid {
            "1.2.840.10045.4.3.2" => Some(SignatureAlgorithm::EcdsaSha256),
            "1.2.840.10045.4.3.3" => Some(SignatureAlgorithm::EcdsaSha384),
            "1.2.840.10045.4.3.4" => Some(SignatureAlgorithm::EcdsaSha512),
            _ => None,
        }
    }

    fn digest(self) -> MessageDigest {
        match self {
            SignatureAlgorithm::EcdsaSha256 => MessageDigest::sha256(),
            SignatureAlgorithm::EcdsaSha384 => MessageDigest::sha384(),
            SignatureAlgorithm::EcdsaSha512 => MessageDigest::sha512(),
        }
    }
}

/// A parsed certificate. The original DER is retained - the trust anchor
/// comparison is on exact bytes, and OpenSSL reconstructs the public key
/// from the DER when verifying signatures.
#[derive(Debug, Clone)]
pub(crate) struct Certificate {
    pub der: Vec<u8>,
    /// Raw DER of the subject and issuer names, compared byte-wise when
    /// linking a chain.
    pub subject: Vec<u8>,
    pub issuer: Vec<u8>,
    /// Validity window as unix timestamps, inclusive.
    pub not_before: i64,
    pub not_after: i64,
    /// The subjectPublicKey BIT STRING content. For EC keys this is the
    /// X9.62 point.
    pub public_key_point: Vec<u8>,
    /// Raw tbsCertificate bytes, the exact input to the signature.
    pub tbs: Vec<u8>,
    pub signature_algorithm: SignatureAlgorithm,
    pub signature: Vec<u8>,
}

impl Certificate {
    /// Parse one certificate from DER. Trailing bytes after the outer
    /// SEQUENCE are rejected.
    pub(crate) fn from_der(der: &[u8]) -> Result<Self, AppAttestError> {
        let (rem, cert) =
            X509Certificate::from_der(der).map_err(|_| AppAttestError::MalformedCertificate)?;
        if !rem.is_empty() {
            return Err(AppAttestError::MalformedCertificate);
        }

        let signature_algorithm =
            SignatureAlgorithm::from_oid(&cert.signature_algorithm.algorithm.to_id_string())
                .ok_or(AppAttestError::MalformedCertificate)?;

        Ok(Certificate {
            der: der.to_vec(),
            subject: cert.tbs_certificate.subject.as_raw().to_vec(),
            issuer: cert.tbs_certificate.issuer.as_raw().to_vec(),
            not_before: cert.validity().not_before.timestamp(),
            not_after: cert.validity().not_after.timestamp(),
            public_key_point: cert
                .tbs_certificate
                .subject_pki
                .subject_public_key
                .data
                .to_vec(),
            tbs: cert.tbs_certificate.as_ref().to_vec(),
            signature_algorithm,
            signature: cert.signature_value.data.to_vec(),
        })
    }

    /// Parse a single PEM certificate.
    pub(crate) fn from_pem(pem: &str) -> Result<Self, AppAttestError> {
        let der = X509::from_pem(pem.as_bytes())?.to_der()?;
        Certificate::from_der(&der)
    }

    /// Extract the App Attest nonce from the extension with OID
    /// 1.2.840.113635.100.8.2. The extension value is a single-element
    /// SEQUENCE holding a [1] EXPLICIT tagged OCTET STRING of 32 bytes.
    pub(crate) fn apple_nonce(&self) -> Result<[u8; 32], AppAttestError> {
        let (_, cert) = X509Certificate::from_der(&self.der)
            .map_err(|_| AppAttestError::MalformedCertificate)?;
        let extension = cert
            .extensions()
            .iter()
            .find(|extension| extension.oid == APPLE_NONCE_OID)
            .ok_or(AppAttestError::MalformedCertificate)?;
        let (_, nonce) = parse_nonce(extension.value)
            .map_err(|_| AppAttestError::MalformedCertificate)?;
        Ok(nonce)
    }
}

fn parse_nonce(i: &[u8]) -> der_parser::error::BerResult<'_, [u8; 32]> {
    parse_der_container(|i: &[u8], hdr: Header| {
        if hdr.tag() != Tag::Sequence {
            return Err(nom::Err::Error(BerError::BerTypeError));
        }
        let (i, tagged_nonce) = parse_der_tagged_explicit(1, parse_der_octetstring)(i)?;
        let (class, _tag, nonce) = tagged_nonce.as_tagged()?;
        if class != Class::ContextSpecific {
            return Err(nom::Err::Error(BerError::BerTypeError));
        }
        let nonce = nonce
            .as_slice()?
            .try_into()
            .map_err(|_| BerError::InvalidLength)?;
        Ok((i, nonce))
    })(i)
}

/// Did `issuer` sign `child`? Verifies the child's signature over its raw
/// TBS bytes with the issuer's public key, using the digest the child's
/// signature algorithm declares.
fn signed_by(child: &Certificate, issuer: &Certificate) -> Result<bool, AppAttestError> {
    let issuer_key = X509::from_der(&issuer.der)?.public_key()?;
    let mut verifier = Verifier::new(child.signature_algorithm.digest(), &issuer_key)?;
    verifier.update(&child.tbs)?;
    Ok(verifier.verify(&child.signature).unwrap_or(false))
}

/// Validate a certificate chain, ordered leaf first, against a trust
/// anchor at the given unix timestamp.
///
/// Every certificate must be inside its validity window. Every adjacent
/// pair must link by name and signature. The final certificate must be
/// byte-identical to the anchor; its self-signature is not re-verified,
/// trust in the anchor comes from configuration, not from the wire.
pub(crate) fn validate_chain(
    chain: &[Certificate],
    anchor: &Certificate,
    at: i64,
) -> Result<(), AppAttestError> {
    let terminal = match chain.last() {
        Some(terminal) => terminal,
        None => return Err(ChainFailure::Empty.into()),
    };
    if chain.len() > MAX_CHAIN_LEN {
        return Err(ChainFailure::TooLong.into());
    }

    for (link, cert) in chain.iter().enumerate() {
        if at < cert.not_before {
            return Err(ChainFailure::NotYetValid { link }.into());
        }
        if at > cert.not_after {
            return Err(ChainFailure::Expired { link }.into());
        }
    }

    for (link, pair) in chain.windows(2).enumerate() {
        if pair[0].issuer != pair[1].subject {
            return Err(ChainFailure::IssuerMismatch { link }.into());
        }
        if !signed_by(&pair[0], &pair[1])? {
            error!("certificate {} failed signature validation", link);
            return Err(ChainFailure::SignatureMismatch { link }.into());
        }
    }

    if terminal.der != anchor.der {
        return Err(ChainFailure::RootMismatch.into());
    }

    Ok(())
}
