//! Transactional replace of the certificate store. Each run deletes the
//! entire previous world and inserts the new payload inside one transaction,
//! so readers only ever observe a complete bundle. The four tables are
//! assumed to exist (see `schema.sql`); creating them is an operational
//! task.

use std::collections::HashSet;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sqlx::{Connection, PgConnection, Postgres, Transaction};

use crate::errors::{ErrorCode, PipelineError, PipelineResult};
use crate::model::{CertificateRecord, CrlRecord, MasterListPayload, RevokedCertificateRecord};
use crate::pipeline::CertificateStore;

const INSERT_ROOT_CA: &str = "INSERT INTO root_ca \
	(id, certificate, subject_key_identifier, authority_key_identifier, issuer, x_500_issuer, source, isn, updated_at) \
	VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)";
const INSERT_DSC: &str = "INSERT INTO dsc \
	(id, certificate, subject_key_identifier, authority_key_identifier, issuer, x_500_issuer, source, isn, updated_at) \
	VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)";
const INSERT_CRL: &str = "INSERT INTO crls \
	(id, crl, source, issuer, country, updated_at) \
	VALUES ($1, $2, $3, $4, $5, $6)";
const INSERT_REVOKED: &str = "INSERT INTO revoked_certificate_list \
	(id, source, country, isn, crl, revocation_reason, revocation_date, updated_at) \
	VALUES ($1, $2, $3, $4, $5, $6, $7, $8)";

pub struct PgCertificateStore {
	dsn: SecretString,
}

impl PgCertificateStore {
	/// Runs are hours apart, so no pool is kept: every `store` call opens one
	/// connection, runs one transaction and closes it.
	pub fn new(dsn: SecretString) -> Self {
		PgCertificateStore { dsn }
	}

	async fn replace_all(&self, payload: &MasterListPayload) -> Result<u64, sqlx::Error> {
		let mut conn = PgConnection::connect(self.dsn.expose_secret()).await?;
		let mut tx = conn.begin().await?;

		// children before parents, matching the foreign keys
		sqlx::query("DELETE FROM revoked_certificate_list")
			.execute(&mut *tx)
			.await?;
		sqlx::query("DELETE FROM crls").execute(&mut *tx).await?;
		sqlx::query("DELETE FROM dsc").execute(&mut *tx).await?;
		sqlx::query("DELETE FROM root_ca").execute(&mut *tx).await?;

		let mut rows = 0u64;
		for record in &payload.root_cas {
			rows += insert_certificate(&mut tx, INSERT_ROOT_CA, record).await?;
		}
		for record in &payload.dscs {
			rows += insert_certificate(&mut tx, INSERT_DSC, record).await?;
		}
		for record in &payload.crls {
			rows += insert_crl(&mut tx, record).await?;
		}
		for record in &payload.revoked_certificates {
			rows += insert_revoked(&mut tx, record).await?;
		}

		tx.commit().await?;
		Ok(rows)
	}
}

async fn insert_certificate(
	tx: &mut Transaction<'_, Postgres>,
	statement: &'static str,
	record: &CertificateRecord,
) -> Result<u64, sqlx::Error> {
	let result = sqlx::query(statement)
		.bind(record.id)
		.bind(&record.certificate)
		.bind(&record.subject_key_identifier)
		.bind(&record.authority_key_identifier)
		.bind(&record.issuer)
		.bind(&record.x500_issuer)
		.bind(record.source)
		.bind(&record.serial_hex)
		.bind(record.updated_at)
		.execute(&mut **tx)
		.await?;
	Ok(result.rows_affected())
}

async fn insert_crl(
	tx: &mut Transaction<'_, Postgres>,
	record: &CrlRecord,
) -> Result<u64, sqlx::Error> {
	let result = sqlx::query(INSERT_CRL)
		.bind(record.id)
		.bind(&record.crl)
		.bind(record.source)
		.bind(&record.issuer)
		.bind(&record.country)
		.bind(record.updated_at)
		.execute(&mut **tx)
		.await?;
	Ok(result.rows_affected())
}

async fn insert_revoked(
	tx: &mut Transaction<'_, Postgres>,
	record: &RevokedCertificateRecord,
) -> Result<u64, sqlx::Error> {
	let result = sqlx::query(INSERT_REVOKED)
		.bind(record.id)
		.bind(record.source)
		.bind(&record.country)
		.bind(&record.serial_hex)
		.bind(record.crl_id)
		.bind(&record.revocation_reason)
		.bind(record.revocation_date)
		.bind(record.updated_at)
		.execute(&mut **tx)
		.await?;
	Ok(result.rows_affected())
}

/// Domain check ahead of the transaction: every revoked entry must point at
/// a CRL travelling in the same payload.
fn validate_payload(payload: &MasterListPayload) -> Result<(), PipelineError> {
	let crl_ids: HashSet<_> = payload.crls.iter().map(|crl| crl.id).collect();
	for revoked in &payload.revoked_certificates {
		if !crl_ids.contains(&revoked.crl_id) {
			return Err(PipelineError::new(
				ErrorCode::Validation,
				"payload failed referential check",
			)
			.with_details(format!(
				"revoked entry {} references unknown crl {}",
				revoked.id, revoked.crl_id
			)));
		}
	}
	Ok(())
}

#[async_trait]
impl CertificateStore for PgCertificateStore {
	async fn store(&self, payload: &MasterListPayload) -> PipelineResult<u64> {
		validate_payload(payload)?;
		// the transaction rolls back on drop, so every error path below
		// leaves the previous state untouched
		self.replace_all(payload).await.map_err(PipelineError::wrap(
			ErrorCode::Database,
			"certificate store replace failed",
		))
	}
}
