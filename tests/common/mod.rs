#![allow(dead_code)]

use std::io::Write;
use tempfile::NamedTempFile;

pub const TENANT_A: &str = "11111111-1111-4111-8111-111111111111";
pub const TENANT_B: &str = "22222222-2222-4222-8222-222222222222";
pub const RESERVATION_1: &str = "aaaaaaaa-aaaa-4aaa-8aaa-aaaaaaaaaaaa";
pub const RESERVATION_2: &str = "bbbbbbbb-bbbb-4bbb-8bbb-bbbbbbbbbbbb";
pub const USER_1: &str = "cccccccc-cccc-4ccc-8ccc-cccccccccccc";
pub const USER_2: &str = "dddddddd-dddd-4ddd-8ddd-dddddddddddd";

pub const OPS_HEADER: &str = "op, ref, tenant, reservation, user, amount, currency, detail";

/// Writes an operations CSV with the standard header and the given rows.
pub fn ops_file(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{OPS_HEADER}").unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
    file
}
