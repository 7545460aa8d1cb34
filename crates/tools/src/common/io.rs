//! ログファイルI/Oユーティリティ（gzip対応）
//!
//! ソルバーの実行ログは数百MBに達することがあるため圧縮保存を許容し、
//! 読み込み側で `.gz` を透過的に展開する。パス `-` は標準入力。

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};

const READER_BUF_CAP: usize = 128 * 1024; // 128 KiB

/// パスに応じて plain / gzip / stdin を吸収したリーダーを開く
pub fn open_reader<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn BufRead>> {
    let p = path.as_ref();
    if p.to_string_lossy() == "-" {
        return Ok(Box::new(BufReader::with_capacity(READER_BUF_CAP, io::stdin())));
    }
    let f = File::open(p)?;
    let ext = p.extension().and_then(|e| e.to_str()).unwrap_or_default().to_ascii_lowercase();

    if ext == "gz" {
        let dec = flate2::read::GzDecoder::new(f);
        return Ok(Box::new(BufReader::with_capacity(READER_BUF_CAP, dec)));
    }
    Ok(Box::new(BufReader::with_capacity(READER_BUF_CAP, f)))
}

/// 実行ログを丸ごと文字列へ読み込む
///
/// パーサは行番号付きの診断を返すため、ストリーミングではなく一括読みで
/// 十分。失敗時は対象ファイルのパスをエラーに含める。
pub fn read_log_text<P: AsRef<Path>>(path: P) -> Result<String> {
    let p = path.as_ref();
    let mut reader =
        open_reader(p).with_context(|| format!("failed to open {}", p.display()))?;
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .with_context(|| format!("failed to read {}", p.display()))?;
    Ok(text)
}
