//! CMS/PKCS#7 decoding of the Master List bundle.
//!
//! The bundle is a DER `ContentInfo` carrying `SignedData` (RFC 5652). Three
//! of its fields matter here: the optional `certificates` set (the envelope
//! signers), the optional `crls` set, and `encapContentInfo.eContent`, whose
//! octets are themselves a DER `CscaMasterList`:
//!
//! ```text
//! CscaMasterList ::= SEQUENCE {
//!     version    INTEGER,          -- 0
//!     certList   SET OF Certificate
//! }
//! ```
//!
//! The envelope is carved up with the walker in [`der`] so every extracted
//! certificate and CRL is the exact input slice; `x509-parser` then supplies
//! the per-certificate metadata and the revoked entries. Signature
//! verification is out of scope: the transport authenticates the source.

mod der;
#[cfg(test)]
mod testdata;

use oid_registry::OID_PKCS7_ID_SIGNED_DATA;
use tracing::{debug, warn};
use uuid::Uuid;
use x509_parser::nom::Parser as _;
use x509_parser::prelude::*;

use crate::errors::{ErrorCode, PipelineError, PipelineResult};
use crate::model::{
	CertificateRecord, CrlRecord, MasterListPayload, RevokedCertificateRecord,
	SOURCE_ICAO_MASTERLIST,
};
use crate::pipeline::BundleParser;

/// id-icao-cscaMasterList (2.23.136.1.1.2), DER content octets.
const OID_ICAO_CSCA_MASTER_LIST: &[u8] = &[0x67, 0x81, 0x08, 0x01, 0x01, 0x02];

#[derive(Debug, thiserror::Error)]
enum ParseError {
	#[error("empty input")]
	Empty,
	#[error(transparent)]
	Der(#[from] der::DerError),
	#[error("contentType is not signedData")]
	NotSignedData,
	#[error("master list: {0}")]
	MasterList(&'static str),
	#[error("certificate decode: {0}")]
	Certificate(String),
	#[error("crl decode: {0}")]
	Crl(String),
}

/// Stateless decoder from bundle bytes to a [`MasterListPayload`].
#[derive(Debug, Default)]
pub struct MasterListParser;

impl MasterListParser {
	pub fn new() -> Self {
		MasterListParser
	}
}

impl BundleParser for MasterListParser {
	fn parse(&self, raw: &[u8]) -> PipelineResult<MasterListPayload> {
		decode_bundle(raw)
			.map_err(PipelineError::wrap(ErrorCode::Technical, "master list decoding failed"))
	}
}

fn decode_bundle(raw: &[u8]) -> Result<MasterListPayload, ParseError> {
	if raw.is_empty() {
		return Err(ParseError::Empty);
	}
	let envelope = Envelope::decode(raw)?;

	// inner Master List certificates first, outer envelope signers appended
	let mut root_cas = Vec::new();
	if let Some(e_content) = envelope.e_content {
		decode_master_list(e_content, &mut root_cas)?;
	}
	for cert_der in &envelope.certificates {
		root_cas.push(extract_certificate(cert_der)?);
	}

	let mut crls = Vec::new();
	let mut revoked_certificates = Vec::new();
	for crl_der in &envelope.crls {
		let (record, entries) = extract_crl(crl_der)?;
		crls.push(record);
		revoked_certificates.extend(entries);
	}

	Ok(MasterListPayload {
		root_cas,
		dscs: Vec::new(),
		crls,
		revoked_certificates,
	})
}

/// The three SignedData fields this pipeline consumes, as exact input
/// slices.
struct Envelope<'a> {
	certificates: Vec<&'a [u8]>,
	crls: Vec<&'a [u8]>,
	e_content: Option<&'a [u8]>,
}

impl<'a> Envelope<'a> {
	fn decode(raw: &'a [u8]) -> Result<Envelope<'a>, ParseError> {
		// ContentInfo ::= SEQUENCE { contentType OID, content [0] EXPLICIT ANY }
		let (content_info, _) = der::read_expected(raw, der::TAG_SEQUENCE)?;
		let (content_type, rest) = der::read_expected(content_info.content, der::TAG_OID)?;
		if content_type.content != OID_PKCS7_ID_SIGNED_DATA.as_bytes() {
			return Err(ParseError::NotSignedData);
		}
		let (content, _) = der::read_expected(rest, der::TAG_CTX_0)?;
		let (signed_data, _) = der::read_expected(content.content, der::TAG_SEQUENCE)?;

		// SignedData ::= SEQUENCE { version, digestAlgorithms, encapContentInfo,
		//   certificates [0] IMPLICIT OPTIONAL, crls [1] IMPLICIT OPTIONAL,
		//   signerInfos }
		let (_version, rest) = der::read_expected(signed_data.content, der::TAG_INTEGER)?;
		let (_digest_algorithms, rest) = der::read_expected(rest, der::TAG_SET)?;
		let (encap, mut rest) = der::read_expected(rest, der::TAG_SEQUENCE)?;
		let e_content = decode_encap_content(encap.content)?;

		let mut certificates = Vec::new();
		let mut crls = Vec::new();
		while !rest.is_empty() {
			let (field, remaining) = der::read_tlv(rest)?;
			rest = remaining;
			match field.tag {
				der::TAG_CTX_0 => certificates = plain_choices(field.content, "certificate")?,
				der::TAG_CTX_1 => crls = plain_choices(field.content, "crl")?,
				// signerInfos; nothing to take from them
				_ => {},
			}
		}
		Ok(Envelope {
			certificates,
			crls,
			e_content,
		})
	}
}

/// Collect the plain alternatives of a choices set: anything
/// SEQUENCE-tagged, i.e. a `Certificate` in `CertificateChoices` or a CRL in
/// `RevocationInfoChoices`. Context-tagged alternatives (attribute
/// certificates, other revocation formats) are skipped.
fn plain_choices<'a>(content: &'a [u8], kind: &'static str) -> Result<Vec<&'a [u8]>, ParseError> {
	let mut choices = Vec::new();
	for tlv in der::iter(content) {
		let tlv = tlv?;
		if tlv.tag == der::TAG_SEQUENCE {
			choices.push(tlv.raw);
		} else {
			debug!(tag = tlv.tag, "skipping non-{kind} choice");
		}
	}
	Ok(choices)
}

/// EncapsulatedContentInfo ::= SEQUENCE { eContentType OID,
/// eContent [0] EXPLICIT OCTET STRING OPTIONAL }
fn decode_encap_content(content: &[u8]) -> Result<Option<&[u8]>, ParseError> {
	let (e_content_type, rest) = der::read_expected(content, der::TAG_OID)?;
	if e_content_type.content != OID_ICAO_CSCA_MASTER_LIST {
		debug!("eContentType is not id-icao-cscaMasterList");
	}
	if rest.is_empty() {
		return Ok(None);
	}
	let (wrapper, _) = der::read_expected(rest, der::TAG_CTX_0)?;
	let (octets, _) = der::read_expected(wrapper.content, der::TAG_OCTET_STRING)?;
	Ok(Some(octets.content))
}

fn decode_master_list(
	e_content: &[u8],
	records: &mut Vec<CertificateRecord>,
) -> Result<(), ParseError> {
	let (list, _) = der::read_expected(e_content, der::TAG_SEQUENCE)?;
	let (version, rest) = der::read_expected(list.content, der::TAG_INTEGER)?;
	if version.content != [0x00] {
		warn!(version = ?version.content, "unexpected CscaMasterList version, continuing");
	}
	let (cert_list, _) = der::read_expected(rest, der::TAG_SET)?;
	for tlv in der::iter(cert_list.content) {
		let tlv = tlv?;
		if tlv.tag != der::TAG_SEQUENCE {
			return Err(ParseError::MasterList("certList entry is not a Certificate"));
		}
		records.push(extract_certificate(tlv.raw)?);
	}
	Ok(())
}

fn extract_certificate(der_bytes: &[u8]) -> Result<CertificateRecord, ParseError> {
	// Shallow extension parsing: a certificate with a damaged extension value
	// must still yield a record (with that identifier absent), not sink the
	// whole bundle. The two identifiers are read below with the walker.
	let (_, cert) = X509CertificateParser::new()
		.with_deep_parse_extensions(false)
		.parse(der_bytes)
		.map_err(|e| ParseError::Certificate(e.to_string()))?;
	let issuer = cert.tbs_certificate.issuer.to_string();

	// SubjectKeyIdentifier ::= OCTET STRING
	let subject_key_identifier = match find_extension(
		&cert,
		&oid_registry::OID_X509_EXT_SUBJECT_KEY_IDENTIFIER,
	) {
		Some(value) => match der::read_expected(value, der::TAG_OCTET_STRING) {
			Ok((ki, _)) => Some(hex::encode(ki.content)),
			Err(_) => {
				warn!(issuer = %issuer, "malformed subject key identifier extension, leaving empty");
				None
			},
		},
		None => {
			// seen in real master lists; tolerated
			warn!(issuer = %issuer, "certificate carries no subject key identifier");
			None
		},
	};
	// AuthorityKeyIdentifier ::= SEQUENCE { keyIdentifier [0] IMPLICIT OPTIONAL, .. }
	// Self-signed roots legitimately omit it, so silence is fine.
	let authority_key_identifier = find_extension(
		&cert,
		&oid_registry::OID_X509_EXT_AUTHORITY_KEY_IDENTIFIER,
	)
	.and_then(|value| {
		let (seq, _) = der::read_expected(value, der::TAG_SEQUENCE).ok()?;
		der::iter(seq.content)
			.filter_map(Result::ok)
			.find(|tlv| tlv.tag == der::TAG_CTX_0_PRIMITIVE)
			.map(|tlv| hex::encode(tlv.content))
	});

	Ok(CertificateRecord {
		id: Uuid::new_v4(),
		certificate: der_bytes.to_vec(),
		subject_key_identifier,
		authority_key_identifier,
		x500_issuer: cert.tbs_certificate.issuer.as_raw().to_vec(),
		issuer,
		source: SOURCE_ICAO_MASTERLIST,
		serial_hex: format!("{:#x}", cert.tbs_certificate.serial),
		updated_at: None,
	})
}

/// The extnValue content octets of the certificate's extension with this
/// oid, if present.
fn find_extension<'a>(
	cert: &'a X509Certificate<'a>,
	oid: &oid_registry::Oid<'static>,
) -> Option<&'a [u8]> {
	cert.extensions().iter().find(|ext| &ext.oid == oid).map(|ext| ext.value)
}

fn extract_crl(
	der_bytes: &[u8],
) -> Result<(CrlRecord, Vec<RevokedCertificateRecord>), ParseError> {
	let (_, crl) = parse_x509_crl(der_bytes).map_err(|e| ParseError::Crl(e.to_string()))?;
	let issuer = &crl.tbs_cert_list.issuer;
	let country = issuer
		.iter_country()
		.next()
		.and_then(|c| c.as_str().ok())
		.map(str::to_string);
	let record = CrlRecord {
		id: Uuid::new_v4(),
		crl: der_bytes.to_vec(),
		source: SOURCE_ICAO_MASTERLIST,
		issuer: issuer.to_string(),
		country,
		updated_at: None,
	};

	let mut entries = Vec::with_capacity(crl.tbs_cert_list.revoked_certificates.len());
	for revoked in crl.iter_revoked_certificates() {
		let revocation_date = chrono::DateTime::from_timestamp(revoked.revocation_date.timestamp(), 0)
			.ok_or(ParseError::Crl("revocation date out of range".to_string()))?;
		entries.push(RevokedCertificateRecord {
			id: Uuid::new_v4(),
			source: SOURCE_ICAO_MASTERLIST,
			country: record.country.clone(),
			serial_hex: format!("{:#x}", revoked.user_certificate),
			crl_id: record.id,
			revocation_reason: revoked.reason_code().map(|(_, code)| reason_token(code).to_string()),
			revocation_date,
			updated_at: None,
		});
	}
	Ok((record, entries))
}

/// CRLReason enumeration to the store's lowercase tokens (RFC 5280 §5.3.1).
fn reason_token(code: ReasonCode) -> &'static str {
	match code.0 {
		1 => "key_compromise",
		2 => "ca_compromise",
		3 => "affiliation_changed",
		4 => "superseded",
		5 => "cessation_of_operation",
		6 => "certificate_hold",
		8 => "remove_from_crl",
		9 => "privilege_withdrawn",
		10 => "aa_compromise",
		_ => "unspecified",
	}
}
