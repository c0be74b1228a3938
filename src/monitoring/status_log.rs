use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::OpenOptions;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatoonStatus {
    pub platoon_id: String,
    pub target_speed: Option<f64>,
    pub current_speed: f64,
    pub member_count: usize,
}

/// Snapshot of one intersection controller after an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntersectionStatus {
    pub tick: u64,
    pub intersection: String,
    pub reserved_time: Option<f64>,
    pub platoons: Vec<PlatoonStatus>,
}

/// One CSV row per tracked platoon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub tick: u64,
    pub intersection: String,
    pub reserved_time: Option<f64>,
    pub platoon_id: String,
    pub target_speed: Option<f64>,
    pub current_speed: f64,
    pub member_count: usize,
}

impl IntersectionStatus {
    pub fn records(&self) -> Vec<StatusRecord> {
        self.platoons
            .iter()
            .map(|p| StatusRecord {
                tick: self.tick,
                intersection: self.intersection.clone(),
                reserved_time: self.reserved_time,
                platoon_id: p.platoon_id.clone(),
                target_speed: p.target_speed,
                current_speed: p.current_speed,
                member_count: p.member_count,
            })
            .collect()
    }
}

/// Appends the status rows to `path`, writing headers only for a new file.
pub fn append_status_csv(
    path: impl AsRef<Path>,
    status: &IntersectionStatus,
) -> Result<(), Box<dyn Error>> {
    let path = path.as_ref();
    let file_exists = path.exists();
    let file = OpenOptions::new().append(true).create(true).open(path)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);
    for record in status.records() {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(tick: u64) -> IntersectionStatus {
        IntersectionStatus {
            tick,
            intersection: "J1".to_string(),
            reserved_time: Some(12.5),
            platoons: vec![
                PlatoonStatus {
                    platoon_id: "a".to_string(),
                    target_speed: None,
                    current_speed: 10.0,
                    member_count: 3,
                },
                PlatoonStatus {
                    platoon_id: "b".to_string(),
                    target_speed: Some(4.0),
                    current_speed: 6.0,
                    member_count: 1,
                },
            ],
        }
    }

    #[test]
    fn test_records_flatten_platoons() {
        let records = status(7).records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].platoon_id, "b");
        assert_eq!(records[1].tick, 7);
        assert_eq!(records[1].target_speed, Some(4.0));
    }

    #[test]
    fn test_append_writes_header_once() {
        let path = std::env::temp_dir().join(format!(
            "platoon_status_{}_{}.csv",
            std::process::id(),
            rand::random::<u32>()
        ));
        append_status_csv(&path, &status(1)).unwrap();
        append_status_csv(&path, &status(2)).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<StatusRecord> = rdr.deserialize().map(|r| r.unwrap()).collect();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].tick, 1);
        assert_eq!(rows[3].tick, 2);
        assert_eq!(rows[2].platoon_id, "a");
    }
}
