use anyhow::Result;
use async_trait::async_trait;

use crate::defs::ThemeModel;
use crate::defs::ThemeReport;

pub struct EmptyThemeModel;

#[async_trait]
impl ThemeModel for EmptyThemeModel {
    fn model_name(&self) -> String {
        "empty".to_owned()
    }

    async fn summarize(&self, _text: &str) -> Result<ThemeReport> {
        // Nothing stands out, the ideal report is empty.
        Ok(ThemeReport::default())
    }
}
