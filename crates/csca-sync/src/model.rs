use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Provenance tag stamped on every row this daemon writes.
pub const SOURCE_ICAO_MASTERLIST: &str = "icao-masterlist";

/// One X.509 certificate extracted from the bundle, plus the metadata the
/// store indexes on. The `certificate` bytes are the exact DER slice from the
/// input; nothing is re-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRecord {
	pub id: Uuid,
	pub certificate: Vec<u8>,
	/// Lowercase hex of the SubjectKeyIdentifier extension, when present.
	pub subject_key_identifier: Option<String>,
	/// Lowercase hex of the AuthorityKeyIdentifier keyIdentifier, when present.
	pub authority_key_identifier: Option<String>,
	/// RFC 4514 rendering of the issuer Name.
	pub issuer: String,
	/// Raw DER of the issuer Name field.
	pub x500_issuer: Vec<u8>,
	pub source: &'static str,
	/// `0x`-prefixed lowercase hex of the serial integer.
	pub serial_hex: String,
	pub updated_at: Option<DateTime<Utc>>,
}

/// One certificate revocation list, byte-exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrlRecord {
	pub id: Uuid,
	pub crl: Vec<u8>,
	pub source: &'static str,
	pub issuer: String,
	/// ISO 3166-1 alpha-2 code from the issuer's `C=` attribute, when present.
	pub country: Option<String>,
	pub updated_at: Option<DateTime<Utc>>,
}

/// One revoked-certificate entry of a CRL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokedCertificateRecord {
	pub id: Uuid,
	pub source: &'static str,
	pub country: Option<String>,
	pub serial_hex: String,
	/// Id of the [`CrlRecord`] this entry was extracted from.
	pub crl_id: Uuid,
	pub revocation_reason: Option<String>,
	pub revocation_date: DateTime<Utc>,
	pub updated_at: Option<DateTime<Utc>>,
}

/// Everything one bundle decodes to. Built by the parser, consumed whole by
/// the store; either all of it is written or none of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MasterListPayload {
	/// Inner Master List certificates followed by the outer envelope signers.
	pub root_cas: Vec<CertificateRecord>,
	/// Reserved: DSCs are distributed outside the Master List, so this is
	/// empty under the current ICAO model.
	pub dscs: Vec<CertificateRecord>,
	pub crls: Vec<CrlRecord>,
	pub revoked_certificates: Vec<RevokedCertificateRecord>,
}

/// The two tokens presented together on the bundle download.
#[derive(Debug, Clone)]
pub struct AuthCredentials {
	pub access_token: String,
	pub sfc_token: String,
}
