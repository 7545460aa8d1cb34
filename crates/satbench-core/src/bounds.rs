//! 外部ソルバーの上下界ログのパーサ
//!
//! 上下界の比較実験で使う2種類の外部 MaxSAT ソルバーの出力方言を読む。
//! どちらの方言かは実験設定の一部なので呼び出し側が明示的に指定し、
//! 内容からの推定は行わない。
//!
//! どちらの方言でも時間制限で打ち切られた実行を前提とする。最適性が
//! 証明された形跡（最終行の `o ` 行、上下界の一致）は正常データでは
//! なく [`ParseError::UnexpectedOptimalProof`] として報告する。

use std::fmt;
use std::str::FromStr;

use crate::error::{ParseError, ParseResult};
use crate::record::BoundsRecord;

/// 上下界ログの方言
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsDialect {
    /// `c bounds <ub> >= <lb> @ <time>` 形式
    RoundingSat,
    /// `c LB : <lb> CS : <n>` / `c  Best solution: <ub>` 形式
    Loandra,
}

impl fmt::Display for BoundsDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BoundsDialect::RoundingSat => "roundingsat",
            BoundsDialect::Loandra => "loandra",
        })
    }
}

impl FromStr for BoundsDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "roundingsat" => Ok(BoundsDialect::RoundingSat),
            "loandra" => Ok(BoundsDialect::Loandra),
            other => Err(format!(
                "unknown bounds dialect '{other}' (expected roundingsat or loandra)"
            )),
        }
    }
}

const ROUNDINGSAT_BOUNDS_TAG: &str = "c bounds ";
const LOANDRA_SYMMETRY_TAG: &str = "c  Nb symmetry clauses:";
const LOANDRA_LB_TAG: &str = "c LB : ";
const LOANDRA_BEST_TAG: &str = "c  Best solution:";

/// 上下界ログを [`BoundsRecord`] へ解析する
///
/// 更新は締める方向（上界は非増加、下界は非減少）のみ受理する。
pub fn parse_bounds_log(text: &str, dialect: BoundsDialect) -> ParseResult<BoundsRecord> {
    let bounds = match dialect {
        BoundsDialect::RoundingSat => parse_roundingsat(text)?,
        BoundsDialect::Loandra => parse_loandra(text)?,
    };
    if bounds.is_closed() {
        return Err(ParseError::UnexpectedOptimalProof {
            context: format!(
                "bounds closed at {} although only truncated runs are expected",
                bounds.lower_bound
            ),
        });
    }
    Ok(bounds)
}

fn parse_roundingsat(text: &str) -> ParseResult<BoundsRecord> {
    let mut bounds = BoundsRecord::default();
    let mut last_line = "";

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        last_line = line;

        let Some(pos) = line.find(ROUNDINGSAT_BOUNDS_TAG) else {
            continue;
        };
        let rest = &line[pos + ROUNDINGSAT_BOUNDS_TAG.len()..];
        let Some(sep) = rest.find(">= ") else {
            return Err(ParseError::FormatViolation {
                line: line_no,
                tag: ROUNDINGSAT_BOUNDS_TAG,
                detail: "missing '>= ' separator".to_string(),
            });
        };

        // 上界フィールドが '-' のうちはインカンベント未発見
        if !rest.starts_with('-') {
            let ub = parse_bound_int(rest[..sep].trim(), line_no, ROUNDINGSAT_BOUNDS_TAG)?;
            if (ub as f64) > bounds.upper_bound {
                return Err(ParseError::MonotonicityViolation {
                    context: format!(
                        "line {line_no}: upper bound {} loosens previous {}",
                        ub, bounds.upper_bound
                    ),
                });
            }
            bounds.upper_bound = ub as f64;
        }

        let after = &rest[sep + 3..];
        let Some(at) = after.find('@') else {
            return Err(ParseError::FormatViolation {
                line: line_no,
                tag: ROUNDINGSAT_BOUNDS_TAG,
                detail: "missing '@' terminator".to_string(),
            });
        };
        let lb = parse_bound_int(after[..at].trim(), line_no, ROUNDINGSAT_BOUNDS_TAG)?;
        if (lb as f64) < bounds.lower_bound {
            return Err(ParseError::MonotonicityViolation {
                context: format!(
                    "line {line_no}: lower bound {} loosens previous {}",
                    lb, bounds.lower_bound
                ),
            });
        }
        bounds.lower_bound = lb as f64;
    }

    // 最終行に解行があるのは完了まで走り切った実行で、この解析の対象外
    if last_line.contains("o ") {
        return Err(ParseError::UnexpectedOptimalProof {
            context: format!("final line reports a solution: '{}'", last_line.trim()),
        });
    }
    Ok(bounds)
}

fn parse_loandra(text: &str) -> ParseResult<BoundsRecord> {
    let mut bounds = BoundsRecord::default();

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;

        if line.contains(LOANDRA_SYMMETRY_TAG) {
            // ここから先は前処理統計のみで上下界は現れない
            return Ok(bounds);
        }
        if let Some(pos) = line.find(LOANDRA_LB_TAG) {
            let rest = &line[pos + LOANDRA_LB_TAG.len()..];
            let Some(cs) = rest.find("CS : ") else {
                return Err(ParseError::FormatViolation {
                    line: line_no,
                    tag: LOANDRA_LB_TAG,
                    detail: "missing 'CS : ' delimiter".to_string(),
                });
            };
            let lb = parse_bound_int(rest[..cs].trim(), line_no, LOANDRA_LB_TAG)?;
            if (lb as f64) < bounds.lower_bound {
                return Err(ParseError::MonotonicityViolation {
                    context: format!(
                        "line {line_no}: lower bound {} loosens previous {}",
                        lb, bounds.lower_bound
                    ),
                });
            }
            bounds.lower_bound = lb as f64;
        }
        if let Some(pos) = line.find(LOANDRA_BEST_TAG) {
            let rest = line[pos + LOANDRA_BEST_TAG.len()..].trim();
            // 数値でなければ（"unknown" 等）上界は据え置きで打ち切る
            if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
                let ub = parse_bound_int(rest, line_no, LOANDRA_BEST_TAG)?;
                if (ub as f64) > bounds.upper_bound {
                    return Err(ParseError::MonotonicityViolation {
                        context: format!(
                            "line {line_no}: best solution {} loosens previous {}",
                            ub, bounds.upper_bound
                        ),
                    });
                }
                bounds.upper_bound = ub as f64;
            }
            return Ok(bounds);
        }
    }
    Ok(bounds)
}

fn parse_bound_int(token: &str, line_no: usize, tag: &'static str) -> ParseResult<i64> {
    token.parse::<i64>().map_err(|_| ParseError::FormatViolation {
        line: line_no,
        tag,
        detail: format!("'{token}' is not an integer"),
    })
}
