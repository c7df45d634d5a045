use crate::error::ReconError;
use crate::models::MatchCandidate;
use std::io::Write;

/// 导出匹配列表为 CSV (带表头, 按传入顺序)
pub fn export_matches_csv<W: Write>(matches: &[MatchCandidate], out: W) -> Result<(), ReconError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record([
        "rank",
        "ticket_id",
        "ticket_ref",
        "quote_id",
        "quote_number",
        "invoice_id",
        "invoice_number",
        "match_score",
        "confidence",
        "match_reasons",
        "skipped_fields",
    ])?;

    for (idx, m) in matches.iter().enumerate() {
        writer.write_record(&[
            (idx + 1).to_string(),
            m.ticket_id.to_string(),
            m.ticket_ref.clone(),
            m.quote_id.to_string(),
            m.quote_number.clone(),
            m.invoice_id.to_string(),
            m.invoice_number.clone(),
            format!("{:.4}", m.match_score),
            m.confidence.to_string(),
            m.match_reasons.join(";"),
            m.skipped_fields.join(";"),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// 分数直方图: 10 个宽 0.1 的区间, 1.0 计入最后一档
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreHistogram {
    pub buckets: [usize; 10],
}

impl ScoreHistogram {
    pub fn from_matches(matches: &[MatchCandidate]) -> Self {
        let mut histogram = Self::default();
        for m in matches {
            let idx = ((m.match_score * 10.0).floor() as usize).min(9);
            histogram.buckets[idx] += 1;
        }
        histogram
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().sum()
    }

    /// 文本渲染, 每行一个区间, 条形宽度按最大区间缩放
    pub fn render(&self, width: usize) -> String {
        let max = self.buckets.iter().copied().max().unwrap_or(0).max(1);
        let mut out = String::new();
        for (idx, &count) in self.buckets.iter().enumerate().rev() {
            let bar = "#".repeat(count * width / max);
            out.push_str(&format!(
                "{:.1}-{:.1} | {:<w$} {}\n",
                idx as f64 / 10.0,
                (idx + 1) as f64 / 10.0,
                bar,
                count,
                w = width
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Confidence;

    fn candidate(score: f64, confidence: Confidence) -> MatchCandidate {
        MatchCandidate {
            ticket_id: 1,
            ticket_ref: "INV-1001".to_string(),
            quote_id: 10,
            quote_number: "Q-1001".to_string(),
            invoice_id: 20,
            invoice_number: "INV-1001".to_string(),
            match_score: score,
            confidence,
            match_reasons: vec!["reference".to_string(), "amount".to_string()],
            skipped_fields: vec!["date".to_string()],
        }
    }

    #[test]
    fn histogram_buckets() {
        let matches = vec![
            candidate(1.0, Confidence::High),
            candidate(0.95, Confidence::High),
            candidate(0.61, Confidence::Medium),
            candidate(0.0, Confidence::Low),
        ];
        let h = ScoreHistogram::from_matches(&matches);
        assert_eq!(h.buckets[9], 2);
        assert_eq!(h.buckets[6], 1);
        assert_eq!(h.buckets[0], 1);
        assert_eq!(h.total(), 4);

        let text = h.render(10);
        assert_eq!(text.lines().count(), 10);
        assert!(text.lines().next().unwrap().starts_with("0.9-1.0 | ##########"));
    }

    #[test]
    fn csv_export_has_header_and_rank() {
        let mut buf = Vec::new();
        export_matches_csv(&[candidate(0.9876, Confidence::High)], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("rank,ticket_id,ticket_ref"));
        assert_eq!(
            lines.next().unwrap(),
            "1,1,INV-1001,10,Q-1001,20,INV-1001,0.9876,high,reference;amount,date"
        );
        assert!(lines.next().is_none());
    }
}
