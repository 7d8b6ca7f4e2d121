//! Report counters against a brute-force scan of the embedded records.

use std::path::PathBuf;

use xqk_core::entities::{QuotaRecord, QuotaReport};
use xqk_core::enums::{EntityKind, QuotaStatus};

fn sweep() -> Vec<QuotaRecord> {
    let values = [0u64, 1, 79, 80, 81, 99, 100, 101, 1000];
    let mut records = Vec::new();
    let mut id = 0;
    for &block_used in &values {
        for &block_hard in &[0u64, 100] {
            for &inode_used in &values {
                for &inode_hard in &[0u64, 100] {
                    id += 1;
                    records.push(QuotaRecord {
                        block_used,
                        block_hard,
                        inode_used,
                        inode_hard,
                        ..QuotaRecord::empty(
                            EntityKind::ALL[id as usize % 3],
                            id,
                            PathBuf::from("/mnt/xfs"),
                            "/dev/sdb1".into(),
                        )
                    });
                }
            }
        }
    }
    records
}

#[test]
fn totals_equal_scan_of_records() {
    let records = sweep();
    let report = QuotaReport::from_records(PathBuf::from("/mnt/xfs"), records);

    let over = report
        .quotas
        .iter()
        .filter(|r| r.is_block_exceeded() || r.is_inode_exceeded())
        .count();
    let warning = report
        .quotas
        .iter()
        .filter(|r| !(r.is_block_exceeded() || r.is_inode_exceeded()))
        .filter(|r| r.block_usage_percent() > 80.0 || r.inode_usage_percent() > 80.0)
        .count();

    assert_eq!(report.total_quotas, report.quotas.len());
    assert_eq!(report.over_quotas, over);
    assert_eq!(report.warning_quotas, warning);
    assert!(report.over_quotas + report.warning_quotas <= report.total_quotas);
}

#[test]
fn unlimited_records_are_never_flagged() {
    let report = QuotaReport::from_records(PathBuf::from("/mnt/xfs"), sweep());
    for record in report
        .quotas
        .iter()
        .filter(|r| r.block_hard == 0 && r.inode_hard == 0)
    {
        assert_eq!(record.status(), QuotaStatus::Ok, "record {}", record.id);
    }
}
