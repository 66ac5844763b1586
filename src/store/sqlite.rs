//! Adaptador SQLite para as duas portas de persistência.
//!
//! Um único arquivo guarda `proposals` e `contracts`. A regra "no máximo um
//! contrato por proposta" é o índice único `idx_contracts_proposal_id`;
//! a violação chega como [`StoreError::Conflict`]. Vários processos podem
//! abrir o mesmo arquivo sem outra coordenação.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{ContractStore, ProposalStore, StoreError};
use crate::contract::Contract;
use crate::state_machine::{Proposal, ProposalStatus};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS proposals (
        id              TEXT PRIMARY KEY,
        client_name     TEXT NOT NULL,
        client_tax_id   TEXT NOT NULL,
        insurance_type  TEXT NOT NULL,
        coverage_amount TEXT NOT NULL,
        premium_amount  TEXT NOT NULL,
        status          INTEGER NOT NULL CHECK (status BETWEEN 1 AND 4),
        created_at      TEXT NOT NULL,
        updated_at      TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_proposals_created_at
    ON proposals(created_at);

    CREATE TABLE IF NOT EXISTS contracts (
        id            TEXT PRIMARY KEY,
        proposal_id   TEXT NOT NULL,
        contracted_at TEXT NOT NULL
    );

    CREATE UNIQUE INDEX IF NOT EXISTS idx_contracts_proposal_id
    ON contracts(proposal_id);
";

const PROPOSAL_COLUMNS: &str = "id, client_name, client_tax_id, insurance_type, \
     coverage_amount, premium_amount, status, created_at, updated_at";

/// Shared by clones; each clone sees the same connection.
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) the database file and applies the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Backend(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let db = Connection::open(path)?;
        // Outro processo pode estar escrevendo no mesmo arquivo.
        db.busy_timeout(Duration::from_secs(5))?;
        db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL;")?;
        Self::initialize(db)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(db: Connection) -> Result<Self, StoreError> {
        db.execute_batch(SCHEMA)?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    /// Runs `f` on the blocking pool. A busy wait on a shared file never
    /// parks a runtime worker.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| StoreError::Backend("database lock poisoned".into()))?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("database task failed: {e}")))?
    }
}

fn format_ts(ts: DateTime<Utc>) -> String {
    // Fixed width + `Z` keeps lexical order equal to chronological order.
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn optional_timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}

fn status_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<ProposalStatus> {
    let code: u8 = row.get(idx)?;
    ProposalStatus::try_from(code)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

fn proposal_from_row(row: &Row<'_>) -> rusqlite::Result<Proposal> {
    Ok(Proposal::from_parts(
        uuid_at(row, 0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        decimal_at(row, 4)?,
        decimal_at(row, 5)?,
        status_at(row, 6)?,
        timestamp_at(row, 7)?,
        optional_timestamp_at(row, 8)?,
    ))
}

fn contract_from_row(row: &Row<'_>) -> rusqlite::Result<Contract> {
    Ok(Contract::from_parts(
        uuid_at(row, 0)?,
        uuid_at(row, 1)?,
        timestamp_at(row, 2)?,
    ))
}

fn proposal_exists(db: &Connection, id: Uuid) -> rusqlite::Result<bool> {
    db.query_row(
        "SELECT EXISTS(SELECT 1 FROM proposals WHERE id = ?1)",
        params![id.to_string()],
        |row| row.get(0),
    )
}

#[async_trait]
impl ProposalStore for SqliteStore {
    async fn get(&self, id: Uuid) -> Result<Proposal, StoreError> {
        self.with_conn(move |db| {
            db.query_row(
                &format!("SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE id = ?1"),
                params![id.to_string()],
                proposal_from_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound {
                entity: "proposal",
                id,
            })
        })
        .await
    }

    async fn list(&self) -> Result<Vec<Proposal>, StoreError> {
        self.with_conn(|db| {
            let mut stmt = db.prepare(&format!(
                "SELECT {PROPOSAL_COLUMNS} FROM proposals ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt.query_map([], proposal_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }

    async fn create(&self, proposal: Proposal) -> Result<Proposal, StoreError> {
        self.with_conn(move |db| {
            db.execute(
                &format!(
                    "INSERT INTO proposals ({PROPOSAL_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
                ),
                params![
                    proposal.id().to_string(),
                    proposal.client_name(),
                    proposal.client_tax_id(),
                    proposal.insurance_type(),
                    proposal.coverage_amount().to_string(),
                    proposal.premium_amount().to_string(),
                    proposal.status().code(),
                    format_ts(proposal.created_at()),
                    proposal.updated_at().map(format_ts),
                ],
            )?;
            Ok(proposal)
        })
        .await
    }

    async fn update_if_status(
        &self,
        proposal: &Proposal,
        expected: ProposalStatus,
    ) -> Result<(), StoreError> {
        let proposal = proposal.clone();
        self.with_conn(move |db| {
            let changed = db.execute(
                "UPDATE proposals SET status = ?2, updated_at = ?3 \
                 WHERE id = ?1 AND status = ?4",
                params![
                    proposal.id().to_string(),
                    proposal.status().code(),
                    proposal.updated_at().map(format_ts),
                    expected.code(),
                ],
            )?;
            if changed == 1 {
                return Ok(());
            }
            if proposal_exists(db, proposal.id())? {
                Err(StoreError::Conflict(format!(
                    "proposal {} is no longer {expected}",
                    proposal.id()
                )))
            } else {
                Err(StoreError::NotFound {
                    entity: "proposal",
                    id: proposal.id(),
                })
            }
        })
        .await
    }

    async fn exists(&self, id: Uuid) -> Result<bool, StoreError> {
        self.with_conn(move |db| Ok(proposal_exists(db, id)?)).await
    }
}

#[async_trait]
impl ContractStore for SqliteStore {
    async fn get(&self, id: Uuid) -> Result<Contract, StoreError> {
        self.with_conn(move |db| {
            db.query_row(
                "SELECT id, proposal_id, contracted_at FROM contracts WHERE id = ?1",
                params![id.to_string()],
                contract_from_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound {
                entity: "contract",
                id,
            })
        })
        .await
    }

    async fn list(&self) -> Result<Vec<Contract>, StoreError> {
        self.with_conn(|db| {
            let mut stmt = db.prepare(
                "SELECT id, proposal_id, contracted_at FROM contracts \
                 ORDER BY contracted_at DESC, rowid DESC",
            )?;
            let rows = stmt.query_map([], contract_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }

    async fn create(&self, contract: Contract) -> Result<Contract, StoreError> {
        self.with_conn(move |db| {
            db.execute(
                "INSERT INTO contracts (id, proposal_id, contracted_at) VALUES (?1, ?2, ?3)",
                params![
                    contract.id().to_string(),
                    contract.proposal_id().to_string(),
                    format_ts(contract.contracted_at()),
                ],
            )?;
            Ok(contract)
        })
        .await
    }

    async fn exists_by_proposal_id(&self, proposal_id: Uuid) -> Result<bool, StoreError> {
        self.with_conn(move |db| {
            let found: bool = db.query_row(
                "SELECT EXISTS(SELECT 1 FROM contracts WHERE proposal_id = ?1)",
                params![proposal_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(found)
        })
        .await
    }
}
