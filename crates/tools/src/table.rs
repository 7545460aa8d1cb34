//! スコア表のCSV出力

use std::io::Write;

use anyhow::Result;

use satbench_core::ScoreTable;

/// スコア表をCSVとして書き出す
///
/// 区切りは `, `（カンマ+空白）。各行の1セル目は裸で書き、2セル目以降に
/// 区切りを前置する。既存の集計スクリプトがこの形式を読むため変更しない。
pub fn write_score_csv<W: Write>(out: &mut W, table: &ScoreTable) -> Result<()> {
    for row in table.render_rows() {
        write_csv_row(out, &row)?;
    }
    Ok(())
}

fn write_csv_row<W: Write>(out: &mut W, cells: &[String]) -> Result<()> {
    let mut first = true;
    for cell in cells {
        if first {
            write!(out, "{cell}")?;
            first = false;
        } else {
            write!(out, ", {cell}")?;
        }
    }
    writeln!(out)?;
    Ok(())
}
