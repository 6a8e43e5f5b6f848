//! Date/variable to raster URL templating.

use chrono::NaiveDate;

/// Daily Long Island Sound OLCI rasters.
pub const DEFAULT_URL_TEMPLATE: &str =
    "https://storage.googleapis.com/lis-olci-netcdfs/{path}/LIS_{compact}_{variable}.tif";

/// Maps a date and variable name to the raster for that day.
///
/// Placeholders: `{path}` (`YYYY/MM/DD`), `{compact}` (`YYYYMMDD`), `{date}`
/// (`YYYY-MM-DD`), `{year}`, `{month}`, `{day}` and `{variable}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterUrlTemplate {
    template: String,
}

impl Default for RasterUrlTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_URL_TEMPLATE)
    }
}

impl RasterUrlTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn format(&self, date: NaiveDate, variable: &str) -> String {
        self.template
            .replace("{path}", &date.format("%Y/%m/%d").to_string())
            .replace("{compact}", &date.format("%Y%m%d").to_string())
            .replace("{date}", &date.format("%Y-%m-%d").to_string())
            .replace("{year}", &date.format("%Y").to_string())
            .replace("{month}", &date.format("%m").to_string())
            .replace("{day}", &date.format("%d").to_string())
            .replace("{variable}", variable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(
            RasterUrlTemplate::default().format(date, "chl"),
            "https://storage.googleapis.com/lis-olci-netcdfs/2024/06/01/LIS_20240601_chl.tif"
        );
    }

    #[test]
    fn test_custom_placeholders() {
        let date = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let template = RasterUrlTemplate::new("/data/{year}/{month}/{day}/{variable}_{date}.tif");
        assert_eq!(template.format(date, "tsm"), "/data/2023/12/31/tsm_2023-12-31.tif");
    }
}
