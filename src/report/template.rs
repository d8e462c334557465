use crate::config::toml_config::GridConfig;
use crate::domain::model::MetricMap;
use crate::report::format::FormatKind;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("valid placeholder regex"));

/// 內建郵件本文 (績效週報)
pub const DEFAULT_TEMPLATE: &str = "Dear all,

至{{month}}績效數字統計及說明如下，謝謝。

(1) 數位戶客戶數: 年目標為1,564,000戶，月目標{{digital_month_target}}戶，目前實際數為{{digital_actual}}戶，
月目標達成率為{{digital_achievement_rate}}。
網行銀客戶數(具有網行銀會員身分之存戶+卡戶)

[TABLE1_PLACEHOLDER]

(2)數位平台收益: 年目標為4億元，月目標{{platform_month_target}}，目前實際數為{{platform_actual}}，月目標達成率為{{platform_achievement_rate}}。
     累積月目標數{{platform_cumulative_target}}，累積月實際數{{platform_cumulative_actual}}，累積月目標達成率為{{platform_cumulative_rate}}。
     榮譽累積月目標數1.63億元，榮譽累積月目標達成率為140.6%。
數位平台收益

[TABLE2_PLACEHOLDER]
";

fn format_for(grids: &[GridConfig], key: &str) -> Option<FormatKind> {
    grids
        .iter()
        .flat_map(|grid| grid.metrics.iter())
        .find(|metric| metric.key == key)
        .map(|metric| metric.format)
}

/// 以格式化後的指標取代 `{{key}}`；`{{month}}` 為兩位數月份。
///
/// Configured metrics that were not extracted render their format's zero text.
/// Keys no grid declares are left untouched.
pub fn render(template: &str, metrics: &MetricMap, grids: &[GridConfig], month: u32) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let key = &caps[1];
            if key == "month" {
                return format!("{:02}", month);
            }
            match format_for(grids, key) {
                Some(kind) => kind.format(metrics.get(key)),
                None => {
                    tracing::warn!("Template placeholder '{{{{{}}}}}' has no configured metric", key);
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}
