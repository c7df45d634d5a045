use crate::models::{Field, FieldScore, RecordView};
use crate::service::normalize::{digit_core, normalize, tokens};
use chrono::NaiveDate;
use strsim::normalized_levenshtein;

const AMOUNT_EPSILON: f64 = 1e-9;

/// 单号相似度
/// 两侧都含数字时, 取整串与数字部分相似度的较大值 (Q-/INV- 等前缀因单据类型而不同)
pub fn reference_similarity(a: &str, b: &str) -> Option<f64> {
    let (na, nb) = (normalize(a), normalize(b));
    if na.is_empty() || nb.is_empty() {
        return None;
    }

    let whole = normalized_levenshtein(&na, &nb);
    let (da, db) = (digit_core(a), digit_core(b));
    if da.is_empty() || db.is_empty() {
        return Some(whole);
    }
    Some(whole.max(normalized_levenshtein(&da, &db)))
}

/// 联系人相似度: 词排序后比较, 与词序无关
pub fn contact_similarity(a: &str, b: &str) -> Option<f64> {
    let sorted = |s: &str| {
        let mut t = tokens(s);
        t.sort();
        t.concat()
    };
    let (sa, sb) = (sorted(a), sorted(b));
    if sa.is_empty() || sb.is_empty() {
        return None;
    }
    Some(normalized_levenshtein(&sa, &sb))
}

/// 金额相似度: 1 - min(1, |A-B| / max(|A|, |B|, ε))
pub fn amount_similarity(a: f64, b: f64) -> Option<f64> {
    if !a.is_finite() || !b.is_finite() {
        return None;
    }
    let denom = a.abs().max(b.abs()).max(AMOUNT_EPSILON);
    let ratio = ((a - b).abs() / denom).min(1.0);
    Some(1.0 - ratio)
}

/// 日期相似度: 窗口内按天数线性衰减, 达到或超过窗口为 0
pub fn date_similarity(a: NaiveDate, b: NaiveDate, window_days: u32) -> f64 {
    let days = (a - b).num_days().unsigned_abs();
    let window = u64::from(window_days);
    if days >= window {
        return if days == 0 { 1.0 } else { 0.0 };
    }
    1.0 - days as f64 / window as f64
}

fn compare(field: Field, x: &RecordView<'_>, y: &RecordView<'_>, window_days: u32) -> Option<f64> {
    match field {
        Field::Reference => reference_similarity(x.reference?, y.reference?),
        Field::Contact => contact_similarity(x.contact?, y.contact?),
        Field::Amount => amount_similarity(x.amount?, y.amount?),
        Field::Date => Some(date_similarity(x.date?, y.date?, window_days)),
    }
}

/// 对一组记录 (工单、报价、发票) 逐字段打分
/// 字段分 = 各两两组合中可比较者的平均值; 没有可比较组合时为 None
pub fn score_records(records: &[RecordView<'_>], window_days: u32) -> [FieldScore; Field::COUNT] {
    Field::ALL.map(|field| {
        let mut sum = 0.0;
        let mut count = 0usize;
        for (i, x) in records.iter().enumerate() {
            for y in &records[i + 1..] {
                if let Some(score) = compare(field, x, y, window_days) {
                    sum += score.clamp(0.0, 1.0);
                    count += 1;
                }
            }
        }
        FieldScore {
            field,
            score: (count > 0).then(|| sum / count as f64),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn reference_uses_digit_core_across_prefixes() {
        assert_eq!(reference_similarity("INV-1001", "Q-1001"), Some(1.0));
        assert_eq!(reference_similarity("inv 1001", "INV-1001"), Some(1.0));
        let partial = reference_similarity("INV-1001", "Q-1002").unwrap();
        assert!(partial > 0.5 && partial < 1.0);
        assert_eq!(reference_similarity("---", "Q-1"), None);
    }

    #[test]
    fn contact_ignores_order_and_punctuation() {
        assert_eq!(contact_similarity("Ahmed Al-Mansouri", "Ahmed Al Mansouri"), Some(1.0));
        assert_eq!(contact_similarity("Mansouri, Ahmed Al", "ahmed al mansouri"), Some(1.0));
        let different = contact_similarity("Fatima Al Zaabi", "Ahmed Al Mansouri").unwrap();
        assert!(different < 0.6);
        assert_eq!(contact_similarity("", "Ahmed"), None);
    }

    #[test]
    fn amount_decay() {
        assert_eq!(amount_similarity(5000.0, 5000.0), Some(1.0));
        assert_eq!(amount_similarity(0.0, 0.0), Some(1.0));
        assert_eq!(amount_similarity(100.0, -100.0), Some(0.0));
        let near = amount_similarity(100.0, 101.0).unwrap();
        let far = amount_similarity(100.0, 1000.0).unwrap();
        assert!(far < near);
        assert!((far - 0.1).abs() < 1e-12);
        assert_eq!(amount_similarity(f64::NAN, 1.0), None);
    }

    #[test]
    fn date_window() {
        assert_eq!(date_similarity(date("2024-01-10"), date("2024-01-10"), 30), 1.0);
        let one_day = date_similarity(date("2024-01-10"), date("2024-01-09"), 30);
        assert!((one_day - (1.0 - 1.0 / 30.0)).abs() < 1e-12);
        assert_eq!(date_similarity(date("2024-01-10"), date("2024-02-09"), 30), 0.0);
        assert_eq!(date_similarity(date("2024-01-10"), date("2024-03-11"), 30), 0.0);
        assert_eq!(date_similarity(date("2024-01-10"), date("2024-01-10"), 0), 1.0);
        assert_eq!(date_similarity(date("2024-01-10"), date("2024-01-11"), 0), 0.0);
    }

    #[test]
    fn missing_fields_are_not_comparable() {
        let full = RecordView {
            reference: Some("INV-1001"),
            contact: Some("Ahmed"),
            amount: Some(10.0),
            date: Some(date("2024-01-10")),
        };
        let sparse = RecordView {
            reference: Some("Q-1001"),
            contact: None,
            amount: None,
            date: None,
        };
        let scores = score_records(&[full, sparse], 30);
        assert_eq!(scores[Field::Reference.index()].score, Some(1.0));
        assert_eq!(scores[Field::Contact.index()].score, None);
        assert_eq!(scores[Field::Amount.index()].score, None);
        assert_eq!(scores[Field::Date.index()].score, None);
    }

    #[test]
    fn triple_field_score_averages_pairs() {
        let view = |amount| RecordView {
            reference: None,
            contact: None,
            amount: Some(amount),
            date: None,
        };
        // 100-100 = 1.0, 100-50 = 0.5, 100-50 = 0.5
        let scores = score_records(&[view(100.0), view(100.0), view(50.0)], 30);
        let amount = scores[Field::Amount.index()].score.unwrap();
        assert!((amount - 2.0 / 3.0).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn identical_amounts_score_one(x in -1.0e9f64..1.0e9) {
            prop_assert_eq!(amount_similarity(x, x), Some(1.0));
        }

        #[test]
        fn tenfold_scores_below_one_percent(x in 0.01f64..1.0e9) {
            let tenfold = amount_similarity(x, 10.0 * x).unwrap();
            let close = amount_similarity(x, 1.01 * x).unwrap();
            prop_assert!(tenfold < close);
        }

        #[test]
        fn comparators_stay_in_unit_interval(
            a in "[A-Za-z0-9 -]{0,16}",
            b in "[A-Za-z0-9 -]{0,16}",
            x in -1.0e6f64..1.0e6,
            y in -1.0e6f64..1.0e6,
            days in 0i64..400,
            window in 0u32..90,
        ) {
            for s in [reference_similarity(&a, &b), contact_similarity(&a, &b), amount_similarity(x, y)]
                .into_iter()
                .flatten()
            {
                prop_assert!((0.0..=1.0).contains(&s));
            }
            let d0 = date("2024-01-01");
            let d = date_similarity(d0, d0 + chrono::Duration::days(days), window);
            prop_assert!((0.0..=1.0).contains(&d));
        }
    }
}
