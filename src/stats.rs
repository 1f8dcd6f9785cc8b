//! Roll-up of per-file statistics across succeeded jobs.

use crate::convert::ConversionStats;

/// Summary over all succeeded jobs.
///
/// Store, box and quantity figures add up across files. SKU, PT and JAN
/// figures describe the most recent input file and are taken from the last
/// succeeded job only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SummaryStats {
    /// Succeeded jobs that reported statistics.
    pub count: usize,
    pub store_count: i64,
    pub box_count: i64,
    pub total_qty: i64,
    pub sku_count: Option<i64>,
    pub pt_count: Option<i64>,
    pub jan_map_count: Option<i64>,
    pub jan_match_success: Option<i64>,
    pub jan_match_fail: Option<i64>,
}

/// Fold stats records given in the order their jobs succeeded.
pub fn summarize<'a, I>(records: I) -> SummaryStats
where
    I: IntoIterator<Item = &'a ConversionStats>,
{
    let mut out = SummaryStats::default();
    let mut last: Option<&ConversionStats> = None;
    for s in records {
        out.count += 1;
        out.store_count = out.store_count.saturating_add(s.store_count.unwrap_or(0));
        out.box_count = out.box_count.saturating_add(s.box_count.unwrap_or(0));
        out.total_qty = out.total_qty.saturating_add(s.total_qty.unwrap_or(0));
        last = Some(s);
    }
    if let Some(s) = last {
        out.sku_count = s.sku_count;
        out.pt_count = s.pt_count;
        out.jan_map_count = s.jan_map_count;
        out.jan_match_success = s.jan_match_success;
        out.jan_match_fail = s.jan_match_fail;
    }
    out
}

/// Group digits by thousands (`12345` → `12,345`); absent → `-`.
pub fn format_count(n: Option<i64>) -> String {
    let Some(n) = n else {
        return "-".into();
    };
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(store: Option<i64>, sku: Option<i64>) -> ConversionStats {
        ConversionStats {
            store_count: store,
            sku_count: sku,
            ..Default::default()
        }
    }

    #[test]
    fn sums_counts_and_keeps_last_sku() {
        let a = stats(Some(3), Some(10));
        let b = stats(Some(5), Some(7));
        let s = summarize([&a, &b]);
        assert_eq!(s.count, 2);
        assert_eq!(s.store_count, 8);
        assert_eq!(s.sku_count, Some(7));
    }

    #[test]
    fn missing_sum_fields_count_as_zero() {
        let a = ConversionStats {
            box_count: Some(4),
            total_qty: Some(120),
            ..Default::default()
        };
        let b = ConversionStats {
            total_qty: Some(30),
            ..Default::default()
        };
        let s = summarize([&a, &b]);
        assert_eq!(s.box_count, 4);
        assert_eq!(s.total_qty, 150);
        assert_eq!(s.store_count, 0);
    }

    #[test]
    fn last_value_fields_stay_absent_until_supplied() {
        let s = summarize([&stats(Some(1), None)]);
        assert_eq!(s.sku_count, None);
        assert_eq!(s.pt_count, None);
        assert_eq!(s.jan_match_fail, None);

        let full = ConversionStats {
            pt_count: Some(2),
            jan_map_count: Some(900),
            jan_match_success: Some(880),
            jan_match_fail: Some(20),
            ..Default::default()
        };
        let s = summarize([&stats(None, Some(1)), &full]);
        assert_eq!(s.pt_count, Some(2));
        assert_eq!(s.jan_match_fail, Some(20));
        assert_eq!(s.sku_count, None);
    }

    #[test]
    fn sums_saturate_instead_of_overflowing() {
        let huge: ConversionStats = serde_json::from_str(r#"{"total_qty": 1e19}"#).unwrap();
        assert_eq!(huge.total_qty, Some(i64::MAX));
        let more = ConversionStats {
            total_qty: Some(5),
            store_count: Some(i64::MAX),
            ..Default::default()
        };
        let s = summarize([&huge, &more, &more]);
        assert_eq!(s.total_qty, i64::MAX);
        assert_eq!(s.store_count, i64::MAX);
        assert_eq!(s.count, 3);
    }

    #[test]
    fn empty_input_is_default() {
        assert_eq!(summarize(std::iter::empty()), SummaryStats::default());
    }

    #[test]
    fn formats_with_thousands_separators() {
        assert_eq!(format_count(None), "-");
        assert_eq!(format_count(Some(0)), "0");
        assert_eq!(format_count(Some(999)), "999");
        assert_eq!(format_count(Some(1000)), "1,000");
        assert_eq!(format_count(Some(1234567)), "1,234,567");
        assert_eq!(format_count(Some(-12345)), "-12,345");
    }
}
