//! Error types.

use thiserror::Error;

/// Why a certificate chain failed validation. Carried inside
/// [`AppAttestError::ChainInvalid`] so callers can log the precise link
/// that broke without string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChainFailure {
    /// The presented chain contained no certificates.
    #[error("certificate chain is empty")]
    Empty,

    /// The chain is longer than any chain Apple issues.
    #[error("certificate chain exceeds the supported length")]
    TooLong,

    /// The certificate at `link` was not signed by the certificate above it.
    #[error("certificate {link} was not issued by its parent")]
    SignatureMismatch {
        /// Index of the failing certificate, leaf first.
        link: usize,
    },

    /// The issuer name at `link` does not match its parent's subject.
    #[error("certificate {link} names a different issuer than its parent")]
    IssuerMismatch {
        /// Index of the failing certificate, leaf first.
        link: usize,
    },

    /// The certificate at `link` is not yet within its validity window.
    #[error("certificate {link} is not yet valid")]
    NotYetValid {
        /// Index of the failing certificate, leaf first.
        link: usize,
    },

    /// The certificate at `link` is past its validity window.
    #[error("certificate {link} has expired")]
    Expired {
        /// Index of the failing certificate, leaf first.
        link: usize,
    },

    /// The terminal certificate is not byte-identical to the trust anchor.
    #[error("terminal certificate does not match the trust anchor")]
    RootMismatch,
}

/// Possible errors that may occur during App Attest verification.
///
/// Verification failures are deliberately specific - every gate in the
/// attestation and assertion procedures has its own variant, so a failed
/// verification tells you exactly which check rejected the input.
#[derive(Debug, Error)]
pub enum AppAttestError {
    /// A CBOR input was truncated, used an unsupported encoding (indefinite
    /// lengths, tags, floats), or carried trailing bytes.
    #[error("CBOR input is malformed or outside the supported subset")]
    MalformedEncoding,

    /// A certificate could not be parsed from DER, or used a signature
    /// algorithm other than ECDSA with SHA-256/384/512.
    #[error("certificate is malformed or uses an unsupported algorithm")]
    MalformedCertificate,

    /// The x5c chain did not validate against the trust anchor.
    #[error("certificate chain validation failed: {0}")]
    ChainInvalid(#[from] ChainFailure),

    /// The attestation statement format was not `apple-appattest`.
    #[error("attestation statement format is not supported")]
    AttestationFormatUnsupported,

    /// Attestation authenticator data carried no attested credential data.
    #[error("authenticator data does not contain attested credential data")]
    MissingAttestedCredentialData,

    /// The credential public key was not a well-formed P-256 COSE key.
    #[error("credential public key is invalid or unsupported")]
    CoseKeyInvalid,

    /// The nonce in the leaf certificate did not match the nonce computed
    /// over the authenticator data and client data hash.
    #[error("attestation certificate nonce mismatch")]
    NonceMismatch,

    /// The credential id was not the SHA-256 digest of the credential
    /// public key, or disagreed with the key id sent alongside.
    #[error("credential id does not match the credential public key")]
    CredentialIdMismatch,

    /// The leaf certificate's public key and the attested credential public
    /// key are different keys.
    #[error("attestation certificate key does not match the credential key")]
    PublicKeyMismatch,

    /// The relying party id hash did not match the expected app id.
    #[error("relying party id hash mismatch")]
    RpIdMismatch,

    /// A sign counter broke monotonicity - nonzero at attestation, or not
    /// strictly greater than the previously recorded value at assertion.
    #[error("sign counter violation")]
    CounterViolation,

    /// The assertion signature did not verify under the stored public key.
    #[error("assertion signature is invalid")]
    SignatureInvalid,

    /// The AAGUID named neither the production nor development environment.
    #[error("aaguid does not identify an App Attest environment")]
    AaguidInvalid,

    /// Base64 decoding of an input failed.
    #[error("input is not valid base64")]
    ParseBase64Failure(#[from] base64::DecodeError),

    /// An OpenSSL operation failed.
    #[error("openssl failure: {0}")]
    OpenSslError(#[from] openssl::error::ErrorStack),
}
