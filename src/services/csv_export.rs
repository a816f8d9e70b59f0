//! CSV 导出服务
//!
//! 每条记录一行，顺序与账本一致，带表头

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{AppResult, ExportError};
use crate::models::GradedStudent;

/// 表头：学生序号、单选、多选、问答、总分
pub const CSV_HEADERS: [&str; 5] = ["学生", "单选题", "多选题", "问答题", "总分"];

/// 将记录写入任意 writer
pub fn export_csv<W: Write>(records: &[GradedStudent], writer: W) -> AppResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(CSV_HEADERS)?;

    for record in records {
        let scores = &record.scores;
        csv_writer.write_record([
            record.id.to_string(),
            format_score(scores.multiple_choice_score),
            format_score(scores.complex_multiple_choice_score),
            format_score(scores.essay_score),
            format_score(scores.total_score),
        ])?;
    }

    csv_writer
        .flush()
        .map_err(|source| ExportError::WriteFailed {
            path: String::from("<writer>"),
            source,
        })?;
    Ok(())
}

/// 写入 CSV 文件
pub fn write_csv_file(records: &[GradedStudent], path: &Path) -> AppResult<()> {
    let file = std::fs::File::create(path).map_err(|source| ExportError::WriteFailed {
        path: path.display().to_string(),
        source,
    })?;
    export_csv(records, file)?;
    info!("💾 已导出 {} 条成绩到 {}", records.len(), path.display());
    Ok(())
}

/// 默认导出文件名，带时间戳
pub fn default_export_path() -> PathBuf {
    PathBuf::from(format!(
        "grading-results-{}.csv",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ))
}

/// 数值按 `Display` 输出：不带千位分隔符，整数不带小数部分
fn format_score(value: f64) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SectionScores;
    use crate::services::ResultsLedger;

    fn ledger_with(totals: &[f64]) -> ResultsLedger {
        let mut ledger = ResultsLedger::new();
        for (i, total) in totals.iter().enumerate() {
            ledger.append(
                SectionScores {
                    multiple_choice_score: *total,
                    complex_multiple_choice_score: 0.0,
                    essay_score: 0.0,
                    total_score: *total,
                },
                format!("s{}.jpg", i + 1),
            );
        }
        ledger
    }

    #[test]
    fn test_rows_follow_ledger() {
        let ledger = ledger_with(&[4.0, 12345.5, 0.25]);
        let mut buf = Vec::new();
        export_csv(ledger.list(), &mut buf).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), ledger.len() + 1);
        assert_eq!(lines[0], "学生,单选题,多选题,问答题,总分");
        assert_eq!(lines[1], "1,4,0,0,4");
        assert_eq!(lines[2], "2,12345.5,0,0,12345.5");
        assert_eq!(lines[3], "3,0.25,0,0,0.25");
    }

    #[test]
    fn test_empty_ledger_has_header_only() {
        let mut buf = Vec::new();
        export_csv(&[], &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let ledger = ledger_with(&[1.0, 2.0]);

        write_csv_file(ledger.list(), &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let ids: Vec<String> = reader
            .records()
            .map(|r| r.unwrap()[0].to_string())
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }
}
