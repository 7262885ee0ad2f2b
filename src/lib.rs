//! app-attest-rs - Apple App Attest verification for Rust servers
//!
//! Apple's App Attest lets an iOS app prove to your server that requests
//! originate from a legitimate copy of the app on genuine hardware. The app
//! generates a hardware-bound key, has Apple attest it once, and then signs
//! per-request assertions with it.
//!
//! This library implements the server side of both ceremonies: verifying
//! the one-time attestation object against Apple's root certificate, and
//! verifying the per-request assertions against the public key the
//! attestation yielded.
//!
//! Build an [`AppAttest`] for your app's identity, then call
//! [`AppAttest::verify_attestation`] and [`AppAttest::verify_assertion`].
//! Your server remains responsible for issuing single-use challenges and
//! for persisting the [`AttestationResult`] and the latest counter.

#![deny(warnings)]
#![warn(unused_extern_crates)]
#![warn(missing_docs)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::unreachable)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::trivially_copy_pass_by_ref)]

#[macro_use]
extern crate tracing;

mod assertion;
mod attestation;
mod cbor;
mod constants;
mod crypto;
pub mod error;
pub mod proto;
mod x509;


use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::AppAttestError;
use crate::proto::{AppId, AssertionResult, AttestationResponse, AttestationResult};
use crate::x509::Certificate;

pub use crate::crypto::{COSEKey, ECDSACurve};

/// A verifier bound to one app's identity and one trust anchor.
///
/// Construct once and reuse; it holds no per-key state. All per-key state
/// (the attested public key and the sign counter) lives with the caller.
#[derive(Debug, Clone)]
pub struct AppAttest {
    app_id: AppId,
    rp_id_hash: [u8; 32],
    trust_anchor: Certificate,
}

impl AppAttest {
    /// A verifier for the given app identity, anchored at the Apple App
    /// Attestation Root CA that production and development devices chain
    /// to.
    pub fn new(app_id: AppId) -> Result<Self, AppAttestError> {
        let trust_anchor = Certificate::from_pem(constants::APPLE_APP_ATTESTATION_ROOT_CA_PEM)?;
        let rp_id_hash = app_id.rp_id_hash();
        Ok(AppAttest {
            app_id,
            rp_id_hash,
            trust_anchor,
        })
    }

    /// A verifier anchored at a caller-supplied root certificate instead
    /// of Apple's. Intended for tests and for private re-signing setups.
    pub fn with_trust_anchor(app_id: AppId, anchor_der: &[u8]) -> Result<Self, AppAttestError> {
        let trust_anchor = Certificate::from_der(anchor_der)?;
        let rp_id_hash = app_id.rp_id_hash();
        Ok(AppAttest {
            app_id,
            rp_id_hash,
            trust_anchor,
        })
    }

    /// The app identity this verifier is bound to.
    pub fn app_id(&self) -> &AppId {
        &self.app_id
    }

    /// Verify a one-time attestation against the challenge your server
    /// issued for it, at the current system time.
    ///
    /// On success, persist the returned [`AttestationResult`] keyed by the
    /// user and the credential id. The `public_key` field is the input to
    /// every later [`verify_assertion`](AppAttest::verify_assertion) call.
    pub fn verify_attestation(
        &self,
        challenge: &[u8],
        response: &AttestationResponse,
    ) -> Result<AttestationResult, AppAttestError> {
        // A clock before the epoch fails closed: no certificate in these
        // chains is valid at time zero.
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        self.verify_attestation_at(challenge, response, now)
    }

    /// Verify a one-time attestation with certificate validity evaluated
    /// at the given unix timestamp.
    pub fn verify_attestation_at(
        &self,
        challenge: &[u8],
        response: &AttestationResponse,
        at: i64,
    ) -> Result<AttestationResult, AppAttestError> {
        attestation::verify_attestation(
            challenge,
            response,
            &self.rp_id_hash,
            &self.trust_anchor,
            at,
        )
    }

    /// Verify a per-request assertion against the challenge issued for it,
    /// the public key persisted at attestation (X9.62 uncompressed point)
    /// and the previously recorded result, if any.
    ///
    /// On success, persist the returned counter and pass it back as
    /// `previous` for the next assertion.
    pub fn verify_assertion(
        &self,
        challenge: &[u8],
        assertion: &[u8],
        public_key: &[u8],
        previous: Option<&AssertionResult>,
    ) -> Result<AssertionResult, AppAttestError> {
        assertion::verify_assertion(
            challenge,
            assertion,
            &self.rp_id_hash,
            public_key,
            previous,
        )
    }
}
