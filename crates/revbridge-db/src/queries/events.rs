//! Append-only event log.
//!
//! Each row links to its predecessor through a BLAKE3 digest, so any rewrite
//! of history is detectable by [`verify_chain`].

use rusqlite::{Connection, OptionalExtension};

use revbridge_crypto::ids;
use revbridge_types::{BridgeEvent, EventRecord};

use crate::{column_u64, to_sql_int, DbError, Result};

/// Append an event and return the persisted record.
pub fn append(conn: &Connection, chain_id: u64, timestamp: u64, event: &BridgeEvent) -> Result<EventRecord> {
    let last: Option<(i64, Vec<u8>)> = conn
        .query_row(
            "SELECT sequence, digest FROM event_log ORDER BY sequence DESC LIMIT 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let (sequence, previous) = match last {
        Some((seq, digest)) => {
            let previous: [u8; 32] = digest
                .try_into()
                .map_err(|_| DbError::Serialization(format!("event {seq} has malformed digest")))?;
            let seq = u64::try_from(seq)
                .map_err(|_| DbError::Serialization(format!("negative event sequence {seq}")))?;
            (seq + 1, previous)
        }
        None => (1, ids::event_chain_genesis(chain_id)),
    };

    let payload =
        serde_json::to_string(event).map_err(|e| DbError::Serialization(e.to_string()))?;
    let digest = ids::event_digest(&previous, sequence, timestamp, payload.as_bytes());

    conn.execute(
        "INSERT INTO event_log (sequence, event_type, settlement_id, payload, digest, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            to_sql_int(sequence, "sequence")?,
            event.event_type(),
            event.settlement_id().map(|id| id.as_bytes().to_vec()),
            payload,
            digest.as_slice(),
            to_sql_int(timestamp, "timestamp")?,
        ],
    )?;

    Ok(EventRecord {
        sequence,
        timestamp,
        event: event.clone(),
    })
}

/// Events with `sequence > after`, oldest first.
pub fn list_since(conn: &Connection, after: u64, limit: u32) -> Result<Vec<EventRecord>> {
    let mut stmt = conn.prepare(
        "SELECT sequence, timestamp, payload FROM event_log
         WHERE sequence > ?1 ORDER BY sequence ASC LIMIT ?2",
    )?;

    let rows = stmt
        .query_map(rusqlite::params![to_sql_int(after, "sequence")?, limit], |row| {
            Ok((column_u64(row, 0)?, column_u64(row, 1)?, row.get::<_, String>(2)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(sequence, timestamp, payload)| {
            let event: BridgeEvent = serde_json::from_str(&payload)
                .map_err(|e| DbError::Serialization(format!("event {sequence}: {e}")))?;
            Ok(EventRecord {
                sequence,
                timestamp,
                event,
            })
        })
        .collect()
}

/// Highest sequence number written so far (0 if the log is empty).
pub fn last_sequence(conn: &Connection) -> Result<u64> {
    Ok(conn.query_row(
        "SELECT COALESCE(MAX(sequence), 0) FROM event_log",
        [],
        |row| column_u64(row, 0),
    )?)
}

/// Recompute every digest and check sequences are gap-free.
///
/// Returns the number of verified events.
///
/// # Errors
///
/// - [`DbError::Constraint`] naming the first sequence that fails
pub fn verify_chain(conn: &Connection, chain_id: u64) -> Result<u64> {
    let mut stmt = conn.prepare(
        "SELECT sequence, timestamp, payload, digest FROM event_log ORDER BY sequence ASC",
    )?;
    let mut rows = stmt.query([])?;

    let mut previous = ids::event_chain_genesis(chain_id);
    let mut expected_sequence = 1u64;

    while let Some(row) = rows.next()? {
        let sequence = column_u64(row, 0)?;
        let timestamp = column_u64(row, 1)?;
        let payload: String = row.get(2)?;
        let digest: Vec<u8> = row.get(3)?;

        if sequence != expected_sequence {
            return Err(DbError::Constraint(format!(
                "event log gap: expected sequence {expected_sequence}, found {sequence}"
            )));
        }
        let recomputed = ids::event_digest(&previous, sequence, timestamp, payload.as_bytes());
        if digest.as_slice() != recomputed.as_slice() {
            return Err(DbError::Constraint(format!(
                "event log digest mismatch at sequence {sequence}"
            )));
        }

        previous = recomputed;
        expected_sequence += 1;
    }

    Ok(expected_sequence - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use revbridge_types::AccountId;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    fn paused(seed: u8) -> BridgeEvent {
        BridgeEvent::Paused {
            by: AccountId([seed; 20]),
        }
    }

    #[test]
    fn test_append_assigns_sequences() {
        let conn = test_db();
        let first = append(&conn, 1, 100, &paused(1)).expect("append");
        let second = append(&conn, 1, 101, &paused(2)).expect("append");
        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert_eq!(last_sequence(&conn).expect("last"), 2);
    }

    #[test]
    fn test_list_since() {
        let conn = test_db();
        for i in 0..5 {
            append(&conn, 1, 100 + u64::from(i), &paused(i)).expect("append");
        }
        let tail = list_since(&conn, 3, 10).expect("list");
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].sequence, 4);
        assert_eq!(tail[1].event, paused(4));

        let limited = list_since(&conn, 0, 2).expect("list");
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_verify_chain_intact() {
        let conn = test_db();
        assert_eq!(verify_chain(&conn, 1).expect("empty chain"), 0);
        for i in 0..3 {
            append(&conn, 1, 100, &paused(i)).expect("append");
        }
        assert_eq!(verify_chain(&conn, 1).expect("verify"), 3);
    }

    #[test]
    fn test_verify_chain_detects_tampering() {
        let conn = test_db();
        for i in 0..3 {
            append(&conn, 1, 100, &paused(i)).expect("append");
        }
        conn.execute(
            "UPDATE event_log SET payload = ?1 WHERE sequence = 2",
            [serde_json::to_string(&paused(9)).expect("json")],
        )
        .expect("tamper");
        assert!(matches!(verify_chain(&conn, 1), Err(DbError::Constraint(_))));
    }

    #[test]
    fn test_verify_chain_wrong_chain_id() {
        let conn = test_db();
        append(&conn, 1, 100, &paused(1)).expect("append");
        assert!(verify_chain(&conn, 2).is_err());
    }

    #[test]
    fn test_last_sequence_rejects_negative() {
        let conn = test_db();
        append(&conn, 1, 100, &paused(1)).expect("append");
        conn.execute("UPDATE event_log SET sequence = -5 WHERE sequence = 1", [])
            .expect("corrupt sequence");
        assert!(last_sequence(&conn).is_err());
    }
}
