//! # Envkeep Backup List Handler
//!
//! File: cli/src/commands/backup/list.rs
//!
//! ## Overview
//!
//! `envkeep backup list` prints the environment's snapshots, newest first. The
//! number in the first column is what `backup delete` and `backup restore`
//! accept as an identifier.
//!
//! ```text
//! #  TAG                     CREATED              SIZE     IMAGE ID
//! -  ----------------------  -------------------  -------  ------------
//! 1  backup_20240301_120000  2024-03-01 12:00:00  4.21 GB  3f2a9c1d7b4e
//! ```
//!
use crate::common::ui::tables;
use crate::core::error::Result;
use crate::manager::{context::Session, model::SnapshotRecord, snapshots::SnapshotStore};
use chrono::Local;
use clap::Parser;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(about = "List snapshots, newest first")]
pub struct ListArgs {}

fn short_id(id: &str) -> &str {
    let id = id.strip_prefix("sha256:").unwrap_or(id);
    &id[..id.len().min(12)]
}

fn rows(records: &[SnapshotRecord]) -> Vec<Vec<String>> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            vec![
                (i + 1).to_string(),
                record.tag.clone(),
                record
                    .created
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string(),
                tables::human_size(record.size),
                short_id(&record.image_id).to_string(),
            ]
        })
        .collect()
}

pub async fn handle_list(args: ListArgs, session: &Session) -> Result<()> {
    info!("Handling backup list command...");
    debug!("List args: {:?}", args);

    let ctx = session.open().await?;
    let lifecycle = ctx.lifecycle();
    let records = SnapshotStore::new(&lifecycle).list().await?;
    if records.is_empty() {
        println!("No snapshots of '{}'.", lifecycle.image().repository);
        return Ok(());
    }
    tables::print_table(&["#", "TAG", "CREATED", "SIZE", "IMAGE ID"], &rows(&records));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_rows_are_numbered_from_one() {
        let records = vec![
            SnapshotRecord {
                tag: "backup_20240302_000000".into(),
                image_id: "sha256:0123456789abcdef0123".into(),
                created: Utc.timestamp_opt(1_709_337_600, 0).unwrap(),
                size: 2048,
            },
            SnapshotRecord {
                tag: "backup_20240301_000000".into(),
                image_id: "abc".into(),
                created: Utc.timestamp_opt(1_709_251_200, 0).unwrap(),
                size: 10,
            },
        ];
        let rows = rows(&records);
        assert_eq!(rows[0][0], "1");
        assert_eq!(rows[0][1], "backup_20240302_000000");
        assert_eq!(rows[0][3], "2.00 KB");
        assert_eq!(rows[0][4], "0123456789ab");
        assert_eq!(rows[1][0], "2");
        assert_eq!(rows[1][4], "abc");
    }
}
