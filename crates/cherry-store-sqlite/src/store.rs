//! [`SqliteStore`]: the SQLite implementation of [`EntityStore`].

use std::path::Path;

use cherry_core::{
  EntityIdentity, EntityType,
  entity::EntityRow,
  query::{Condition, EntityQuery, FieldSource, Operator, QueryValue},
  store::EntityStore,
};
use rusqlite::{OptionalExtension as _, types::Value};
use tracing::debug;

use crate::{
  Error, Result,
  encode::{COLUMNS, RawRow, decode_uuid, encode_uuid},
  schema::SCHEMA,
};

const UPSERT: &str = "
INSERT INTO entities (
    id, entity_type, parent_id, parent_type, name, description, reference,
    tags, status_type, since, created_at, created_by, modified_at,
    modified_by, payload
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
ON CONFLICT(id) DO UPDATE SET
    parent_id   = excluded.parent_id,
    parent_type = excluded.parent_type,
    name        = excluded.name,
    description = excluded.description,
    reference   = excluded.reference,
    tags        = excluded.tags,
    status_type = excluded.status_type,
    since       = excluded.since,
    modified_at = excluded.modified_at,
    modified_by = excluded.modified_by,
    payload     = excluded.payload
WHERE entities.entity_type = excluded.entity_type
";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Cherry entity store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a `SELECT {COLUMNS} ...` statement and decode every row.
  async fn select(
    &self,
    sql: String,
    params: Vec<Value>,
  ) -> Result<Vec<EntityRow>> {
    let raws: Vec<RawRow> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), |r| {
            RawRow::from_sql(r)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRow::into_row).collect()
  }
}

// ─── Search translation ──────────────────────────────────────────────────────

fn escape_like(s: &str) -> String {
  s.replace('\\', "\\\\")
    .replace('%', "\\%")
    .replace('_', "\\_")
}

/// Translate one condition into a SQL predicate with a single positional
/// parameter `?{index}`.
fn predicate(condition: &Condition, index: usize) -> (String, Value) {
  let name = condition.field.name;
  let expr = match condition.field.source {
    FieldSource::Column => name.to_owned(),
    FieldSource::Payload => format!("json_extract(payload, '$.{name}')"),
  };

  match (&condition.value, condition.operator) {
    (QueryValue::Text(text), Operator::Match) => (
      format!("LOWER({expr}) LIKE ?{index} ESCAPE '\\'"),
      Value::Text(format!("%{}%", escape_like(&text.to_lowercase()))),
    ),
    (QueryValue::Text(text), Operator::Equal) => {
      (format!("{expr} = ?{index}"), Value::Text(text.clone()))
    }
    (QueryValue::Boolean(flag), _) => {
      (format!("{expr} = ?{index}"), Value::Integer(i64::from(*flag)))
    }
    (QueryValue::Long(n), _) => {
      (format!("{expr} = ?{index}"), Value::Integer(*n))
    }
    (QueryValue::Date(date), _) => (
      format!("substr({expr}, 1, 10) = ?{index}"),
      Value::Text(date.format("%Y-%m-%d").to_string()),
    ),
    (QueryValue::Uuid(id), _) => {
      (format!("{expr} = ?{index}"), Value::Text(encode_uuid(*id)))
    }
  }
}

fn search_sql(query: &EntityQuery) -> (String, Vec<Value>) {
  let mut clauses = vec!["entity_type = ?1".to_owned()];
  let mut params = vec![Value::Text(query.entity_type.to_string())];

  for condition in &query.conditions {
    let (clause, value) = predicate(condition, params.len() + 1);
    clauses.push(clause);
    params.push(value);
  }

  let limit = query.limit.map_or(-1, |n| n as i64);
  let offset = query.offset.map_or(0, |n| n as i64);
  let sql = format!(
    "SELECT {COLUMNS} FROM entities WHERE {} ORDER BY created_at, id \
     LIMIT ?{} OFFSET ?{}",
    clauses.join(" AND "),
    params.len() + 1,
    params.len() + 2,
  );
  params.push(Value::Integer(limit));
  params.push(Value::Integer(offset));
  (sql, params)
}

// ─── EntityStore impl ────────────────────────────────────────────────────────

impl EntityStore for SqliteStore {
  type Error = Error;

  async fn exists(&self, identity: EntityIdentity) -> Result<bool> {
    let id = encode_uuid(identity.id());
    let entity_type = identity.entity_type().to_string();

    let found = self
      .conn
      .call(move |conn| {
        let found = conn
          .query_row(
            "SELECT 1 FROM entities WHERE id = ?1 AND entity_type = ?2",
            rusqlite::params![id, entity_type],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        Ok(found)
      })
      .await?;
    Ok(found)
  }

  async fn count(&self, entity_type: EntityType) -> Result<u64> {
    let entity_type = entity_type.to_string();
    let n: i64 = self
      .conn
      .call(move |conn| {
        let n = conn.query_row(
          "SELECT COUNT(*) FROM entities WHERE entity_type = ?1",
          rusqlite::params![entity_type],
          |r| r.get(0),
        )?;
        Ok(n)
      })
      .await?;
    Ok(n.max(0) as u64)
  }

  async fn get(&self, identity: EntityIdentity) -> Result<Option<EntityRow>> {
    let rows = self
      .select(
        format!(
          "SELECT {COLUMNS} FROM entities WHERE id = ?1 AND entity_type = ?2"
        ),
        vec![
          Value::Text(encode_uuid(identity.id())),
          Value::Text(identity.entity_type().to_string()),
        ],
      )
      .await?;
    Ok(rows.into_iter().next())
  }

  async fn children(
    &self,
    parent: EntityIdentity,
    entity_type: EntityType,
  ) -> Result<Vec<EntityRow>> {
    self
      .select(
        format!(
          "SELECT {COLUMNS} FROM entities
           WHERE parent_id = ?1 AND parent_type = ?2 AND entity_type = ?3
           ORDER BY created_at, id"
        ),
        vec![
          Value::Text(encode_uuid(parent.id())),
          Value::Text(parent.entity_type().to_string()),
          Value::Text(entity_type.to_string()),
        ],
      )
      .await
  }

  async fn descendants(&self, root: EntityIdentity) -> Result<Vec<EntityRow>> {
    self
      .select(
        format!(
          "WITH RECURSIVE tree(id) AS (
               SELECT id FROM entities WHERE parent_id = ?1 AND parent_type = ?2
               UNION
               SELECT e.id FROM entities e JOIN tree t ON e.parent_id = t.id
           )
           SELECT {COLUMNS} FROM entities
           WHERE id IN (SELECT id FROM tree)
           ORDER BY created_at, id"
        ),
        vec![
          Value::Text(encode_uuid(root.id())),
          Value::Text(root.entity_type().to_string()),
        ],
      )
      .await
  }

  async fn search<'a>(&'a self, query: &'a EntityQuery) -> Result<Vec<EntityRow>> {
    let (sql, params) = search_sql(query);
    debug!(entity_type = %query.entity_type, %sql, "searching entities");
    self.select(sql, params).await
  }

  async fn save(&self, rows: Vec<EntityRow>) -> Result<()> {
    let raws = rows
      .iter()
      .map(RawRow::encode)
      .collect::<Result<Vec<_>>>()?;

    // `Some(id)` when an existing row of another type blocks the upsert; the
    // transaction is dropped uncommitted in that case.
    let conflict: Option<String> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare_cached(UPSERT)?;
          for raw in &raws {
            let changed = stmt.execute(rusqlite::params![
              raw.id,
              raw.entity_type,
              raw.parent_id,
              raw.parent_type,
              raw.name,
              raw.description,
              raw.reference,
              raw.tags,
              raw.status_type,
              raw.since,
              raw.created_at,
              raw.created_by,
              raw.modified_at,
              raw.modified_by,
              raw.payload,
            ])?;
            if changed == 0 {
              return Ok(Some(raw.id.clone()));
            }
          }
        }
        tx.commit()?;
        Ok(None)
      })
      .await?;

    match conflict {
      Some(id) => Err(Error::EntityTypeConflict(decode_uuid(&id)?)),
      None => Ok(()),
    }
  }

  async fn delete(&self, identity: EntityIdentity) -> Result<bool> {
    let id = encode_uuid(identity.id());
    let entity_type = identity.entity_type().to_string();

    let changed = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "DELETE FROM entities WHERE id = ?1 AND entity_type = ?2",
          rusqlite::params![id, entity_type],
        )?;
        Ok(changed)
      })
      .await?;
    Ok(changed > 0)
  }
}

