pub mod quota_banner;
pub mod result_panel;
pub mod upload_zone;

use crate::analyzer::AnalyzerView;
use crate::store::LocalStorageStore;

/// The analyzer as the browser runs it, backed by `localStorage`.
pub type BrowserAnalyzer = AnalyzerView<LocalStorageStore>;

/// Wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    js_sys::Date::now() as i64
}
