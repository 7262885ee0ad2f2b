//! Protocol constants.

/// The Apple App Attestation Root CA, the default trust anchor for
/// attestation certificate chains.
///
/// <https://www.apple.com/certificateauthority/Apple_App_Attestation_Root_CA.pem>
pub(crate) const APPLE_APP_ATTESTATION_ROOT_CA_PEM: &str = "-----BEGIN CERTIFICATE-----
MIICITCCAaegAwIBAgIQC/O+DvHN0uD7jG5yH2IXmDAKBggqhkjOPQQDAzBSMSYw
JAYDVQQDDB1BcHBsZSBBcHAgQXR0ZXN0YXRpb24gUm9vdCBDQTETMBEGA1UECgwK
QXBwbGUgSW5jLjETMBEGA1UECAwKQ2FsaWZvcm5pYTAeFw0yMDAzMTgxODMyNTNa
Fw00NTAzMTUwMDAwMDBaMFIxJjAkBgNVBAMMHUFwcGxlIEFwcCBBdHRlc3RhdGlv
biBSb290IENBMRMwEQYDVQQKDApBcHBsZSBJbmMuMRMwEQYDVQQIDApDYWxpZm9y
bmlhMHYwEAYHKoZIzj0CAQYFK4EEACIDYgAERTHhmLW07ATaFQIEVwTtT4dyctdh
NbJhFs/Ii2FdCgAHGbpphY3+d8qjuDngIN3WVhQUBHAoMeQ/cLiP1sOUtgjqK9au
Yen1mMEvRq9Sk3Jm5X8U62H+xTD3FE9TgS41o0IwQDAPBgNVHRMBAf8EBTADAQH/
MB0GA1UdDgQWBBSskRBTM72+aEH/pwyp5frq5eWKoTAOBgNVHQ8BAf8EBAMCAQYw
CgYIKoZIzj0EAwMDaAAwZQIwQgFGnByvsiVbpTKwSga0kP0e8EeDS4+sQmTvb7vn
53O5+FRXgeLhpJ06ysC5PrOyAjEAp5U4xDgEgllF7En3VcE3iexZZtKeYnpqtijV
oyFraWVIyd/dganmrduC1bmTBGwD
-----END CERTIFICATE-----
";

/// Attestation statement format emitted by the DeviceCheck framework.
pub(crate) const APPLE_APP_ATTEST_FMT: &str = "apple-appattest";

/// AAGUID carried by keys attested against Apple's production servers.
pub(crate) const AAGUID_APPATTEST: [u8; 16] = *b"appattest\0\0\0\0\0\0\0";

/// AAGUID carried by keys attested in the development (sandbox) environment.
pub(crate) const AAGUID_APPATTEST_DEVELOP: [u8; 16] = *b"appattestdevelop";

/// Apple issues a leaf and a single intermediate. The completed chain is
/// three certificates; anything longer is rejected before signature work.
pub(crate) const MAX_CHAIN_LEN: usize = 5;
