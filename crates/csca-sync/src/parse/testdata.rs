//! Fixture builders for the parser tests: a tiny DER writer assembling CMS
//! envelopes by hand, structurally-minimal certificates and CRLs for edge
//! cases (absent or damaged extensions, issuer without a country), and
//! rcgen-backed helpers for realistic signed material.

use std::ops::Add;
use std::time::Duration;

const OID_SIGNED_DATA: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x02];
const OID_ICAO_CSCA_MASTER_LIST: &[u8] = &[0x67, 0x81, 0x08, 0x01, 0x01, 0x02];
const OID_COUNTRY_NAME: &[u8] = &[0x55, 0x04, 0x06];
const OID_ORGANIZATION_NAME: &[u8] = &[0x55, 0x04, 0x0a];
const OID_SUBJECT_KEY_IDENTIFIER: &[u8] = &[0x55, 0x1d, 0x0e];
const OID_AUTHORITY_KEY_IDENTIFIER: &[u8] = &[0x55, 0x1d, 0x23];
const OID_CRL_REASON: &[u8] = &[0x55, 0x1d, 0x15];
const OID_RSA_ENCRYPTION: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01];
const OID_SHA256_WITH_RSA: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x0b];

pub fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
	let mut out = vec![tag];
	let len = content.len();
	if len < 0x80 {
		out.push(len as u8);
	} else if len <= 0xff {
		out.extend([0x81, len as u8]);
	} else {
		out.extend([0x82, (len >> 8) as u8, (len & 0xff) as u8]);
	}
	out.extend_from_slice(content);
	out
}

fn concat(parts: &[Vec<u8>]) -> Vec<u8> {
	parts.iter().flatten().copied().collect()
}

fn oid(content: &[u8]) -> Vec<u8> {
	tlv(0x06, content)
}

fn integer(value: u64) -> Vec<u8> {
	let mut bytes: Vec<u8> = value.to_be_bytes().iter().copied().skip_while(|b| *b == 0).collect();
	if bytes.is_empty() || bytes[0] & 0x80 != 0 {
		bytes.insert(0, 0);
	}
	tlv(0x02, &bytes)
}

fn printable(value: &str) -> Vec<u8> {
	tlv(0x13, value.as_bytes())
}

fn utc_time(value: &str) -> Vec<u8> {
	tlv(0x17, value.as_bytes())
}

fn algorithm(algorithm_oid: &[u8]) -> Vec<u8> {
	tlv(0x30, &concat(&[oid(algorithm_oid), vec![0x05, 0x00]]))
}

fn rdn(attribute_oid: &[u8], value: &str) -> Vec<u8> {
	tlv(0x31, &tlv(0x30, &concat(&[oid(attribute_oid), printable(value)])))
}

fn name(country: Option<&str>, organization: &str) -> Vec<u8> {
	let mut rdns = Vec::new();
	if let Some(country) = country {
		rdns.push(rdn(OID_COUNTRY_NAME, country));
	}
	rdns.push(rdn(OID_ORGANIZATION_NAME, organization));
	tlv(0x30, &concat(&rdns))
}

fn extension(extension_oid: &[u8], inner: &[u8]) -> Vec<u8> {
	tlv(0x30, &concat(&[oid(extension_oid), tlv(0x04, inner)]))
}

/// What the hand-built certificate should carry.
pub struct CertSpec {
	pub country: Option<&'static str>,
	pub organization: &'static str,
	pub serial: u64,
	pub ski: Option<&'static [u8]>,
	/// Emit an SKI extension whose value is not an OCTET STRING.
	pub malformed_ski: bool,
	pub aki: Option<&'static [u8]>,
}

impl Default for CertSpec {
	fn default() -> Self {
		CertSpec {
			country: Some("UT"),
			organization: "Test CSCA",
			serial: 0x1f4,
			ski: None,
			malformed_ski: false,
			aki: None,
		}
	}
}

/// A structurally valid, unsigned-in-spirit v3 certificate. The signature
/// bits are filler; nothing in the pipeline verifies them.
pub fn certificate(params: &CertSpec) -> Vec<u8> {
	let issuer = name(params.country, params.organization);
	let mut extensions = Vec::new();
	if params.malformed_ski {
		extensions.push(extension(OID_SUBJECT_KEY_IDENTIFIER, &integer(1)));
	} else if let Some(ski) = params.ski {
		extensions.push(extension(OID_SUBJECT_KEY_IDENTIFIER, &tlv(0x04, ski)));
	}
	if let Some(aki) = params.aki {
		extensions.push(extension(OID_AUTHORITY_KEY_IDENTIFIER, &tlv(0x30, &tlv(0x80, aki))));
	}
	let mut tbs_fields = vec![
		tlv(0xa0, &integer(2)), // v3
		integer(params.serial),
		algorithm(OID_SHA256_WITH_RSA),
		issuer.clone(),
		tlv(0x30, &concat(&[utc_time("240101000000Z"), utc_time("340101000000Z")])),
		issuer,
		// SPKI with filler key bits
		tlv(
			0x30,
			&concat(&[algorithm(OID_RSA_ENCRYPTION), tlv(0x03, &[0x00, 0x30, 0x00])]),
		),
	];
	if !extensions.is_empty() {
		tbs_fields.push(tlv(0xa3, &tlv(0x30, &concat(&extensions))));
	}
	let tbs = tlv(0x30, &concat(&tbs_fields));
	tlv(
		0x30,
		&concat(&[
			tbs,
			algorithm(OID_SHA256_WITH_RSA),
			tlv(0x03, &[0x00, 0xde, 0xad, 0xbe, 0xef]),
		]),
	)
}

/// One revoked entry of a hand-built CRL.
pub struct RevokedSpec {
	pub serial: u64,
	/// CRLReason enumeration value, when the entry carries the extension.
	pub reason: Option<u8>,
}

/// A structurally valid v2 CRL with the given issuer country and entries.
/// Revocation dates are pinned to 2024-03-01T12:00:00Z.
pub fn crl(country: Option<&str>, entries: &[RevokedSpec]) -> Vec<u8> {
	let revoked: Vec<Vec<u8>> = entries
		.iter()
		.map(|entry| {
			let mut fields = vec![integer(entry.serial), utc_time("240301120000Z")];
			if let Some(reason) = entry.reason {
				fields.push(tlv(
					0x30,
					&extension(OID_CRL_REASON, &tlv(0x0a, &[reason])),
				));
			}
			tlv(0x30, &concat(&fields))
		})
		.collect();
	let tbs = tlv(
		0x30,
		&concat(&[
			integer(1), // v2
			algorithm(OID_SHA256_WITH_RSA),
			name(country, "Test CSCA CRL"),
			utc_time("240301120000Z"),
			utc_time("241231120000Z"),
			tlv(0x30, &concat(&revoked)),
		]),
	);
	tlv(
		0x30,
		&concat(&[
			tbs,
			algorithm(OID_SHA256_WITH_RSA),
			tlv(0x03, &[0x00, 0xca, 0xfe]),
		]),
	)
}

/// Assemble a complete `ContentInfo`/`SignedData` bundle. `inner` becomes
/// the encapsulated `CscaMasterList` (absent when `None`), `outer` the
/// `certificates` field, `crls` the `crls` field.
pub fn bundle(inner: Option<&[Vec<u8>]>, outer: &[Vec<u8>], crls: &[Vec<u8>]) -> Vec<u8> {
	bundle_with_version(0, inner, outer, crls)
}

pub fn bundle_with_version(
	list_version: u64,
	inner: Option<&[Vec<u8>]>,
	outer: &[Vec<u8>],
	crls: &[Vec<u8>],
) -> Vec<u8> {
	let mut encap_fields = vec![oid(OID_ICAO_CSCA_MASTER_LIST)];
	if let Some(certs) = inner {
		let master_list = tlv(
			0x30,
			&concat(&[integer(list_version), tlv(0x31, &concat(certs))]),
		);
		encap_fields.push(tlv(0xa0, &tlv(0x04, &master_list)));
	}
	let mut signed_data_fields = vec![
		integer(3),
		tlv(0x31, &[]), // digestAlgorithms
		tlv(0x30, &concat(&encap_fields)),
	];
	if !outer.is_empty() {
		signed_data_fields.push(tlv(0xa0, &concat(outer)));
	}
	if !crls.is_empty() {
		signed_data_fields.push(tlv(0xa1, &concat(crls)));
	}
	signed_data_fields.push(tlv(0x31, &[])); // signerInfos
	let signed_data = tlv(0x30, &concat(&signed_data_fields));
	tlv(
		0x30,
		&concat(&[oid(OID_SIGNED_DATA), tlv(0xa0, &signed_data)]),
	)
}

/// A self-signed CA certificate for the given country, via rcgen.
pub fn generated_ca(country: &str, common_name: &str) -> (Vec<u8>, rcgen::Certificate, rcgen::KeyPair) {
	let mut params = rcgen::CertificateParams::new(Vec::new()).unwrap();
	params.distinguished_name.push(rcgen::DnType::CountryName, country);
	params.distinguished_name.push(rcgen::DnType::CommonName, common_name);
	params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
	params.key_usages = vec![
		rcgen::KeyUsagePurpose::KeyCertSign,
		rcgen::KeyUsagePurpose::DigitalSignature,
		rcgen::KeyUsagePurpose::CrlSign,
	];
	let key = rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256).unwrap();
	let cert = params.self_signed(&key).unwrap();
	let der = cert.der().to_vec();
	(der, cert, key)
}

/// A CRL signed by `issuer`, revoking `serials` with the key-compromise
/// reason, dated 2024-02-02.
pub fn generated_crl(
	issuer: &rcgen::Certificate,
	issuer_key: &rcgen::KeyPair,
	serials: &[u64],
) -> Vec<u8> {
	let revoked_certs = serials
		.iter()
		.map(|serial| rcgen::RevokedCertParams {
			serial_number: rcgen::SerialNumber::from(*serial),
			revocation_time: rcgen::date_time_ymd(2024, 2, 2),
			reason_code: Some(rcgen::RevocationReason::KeyCompromise),
			invalidity_date: None,
		})
		.collect();
	let params = rcgen::CertificateRevocationListParams {
		this_update: rcgen::date_time_ymd(2024, 2, 2),
		next_update: rcgen::date_time_ymd(2024, 2, 2).add(Duration::from_secs(86400 * 30)),
		crl_number: rcgen::SerialNumber::from(1u64),
		issuing_distribution_point: None,
		revoked_certs,
		key_identifier_method: rcgen::KeyIdMethod::Sha256,
	};
	let crl = params.signed_by(issuer, issuer_key).unwrap();
	crl.der().to_vec()
}
