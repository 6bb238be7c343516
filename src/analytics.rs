// 统计上报 - 只发不收，失败直接忽略

use std::collections::BTreeMap;

/// 上报参数
pub type EventParams = BTreeMap<String, String>;

/// 上报接口
pub trait AnalyticsSink: Send + Sync {
    fn report(&self, event: &str, params: EventParams);
}

/// 写入日志的实现
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAnalytics;

impl AnalyticsSink for TracingAnalytics {
    fn report(&self, event: &str, params: EventParams) {
        tracing::debug!(target: "analytics", event, ?params, "上报事件");
    }
}

/// 主界面事件的参数：`screen` 与可选的 `item`
pub fn main_screen_params(item: Option<&str>) -> EventParams {
    let mut params = EventParams::new();
    params.insert("screen".to_string(), "Main".to_string());
    if let Some(item) = item {
        params.insert("item".to_string(), item.to_string());
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_screen_params() {
        let params = main_screen_params(Some("track"));
        assert_eq!(params.get("screen").map(String::as_str), Some("Main"));
        assert_eq!(params.get("item").map(String::as_str), Some("track"));
        assert!(!main_screen_params(None).contains_key("item"));

        TracingAnalytics.report("click", params);
    }
}
