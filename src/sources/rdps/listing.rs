//! Datamart directory listings
//!
//! The MSC datamart serves plain HTTP index pages. Each entry is an
//! `<a href=..>` followed by a last-modified stamp, either in a `<pre>` block
//! or in table cells.

use crate::ForecastError;
use chrono::NaiveDateTime;
use regex::Regex;

/// One entry of a directory index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    pub modified: Option<NaiveDateTime>,
}

impl ListingEntry {
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }
}

/// Parse an index page into its entries, skipping sort links and the parent directory
pub fn parse_listing(html: &str) -> Result<Vec<ListingEntry>, ForecastError> {
    let stamp = Regex::new(r"(\d{4}-\d{2}-\d{2} \d{2}:\d{2})|(\d{2}-[A-Za-z]{3}-\d{4} \d{2}:\d{2})")
        .map_err(|e| ForecastError::parse(e.to_string()))?;

    let mut entries = Vec::new();
    for chunk in html.split("href=\"").skip(1) {
        let Some((name, rest)) = chunk.split_once('"') else { continue };
        if name.is_empty() || name.starts_with('?') || name.starts_with('/') || name.starts_with("..") {
            continue;
        }
        if name.contains("://") {
            continue;
        }
        let modified = stamp.captures(rest).and_then(|caps| {
            if let Some(iso) = caps.get(1) {
                NaiveDateTime::parse_from_str(iso.as_str(), "%Y-%m-%d %H:%M").ok()
            } else {
                caps.get(2)
                    .and_then(|apache| NaiveDateTime::parse_from_str(apache.as_str(), "%d-%b-%Y %H:%M").ok())
            }
        });
        entries.push(ListingEntry {
            name: name.to_string(),
            modified,
        });
    }
    Ok(entries)
}

/// Most recently modified subdirectory, e.g. the latest model run
#[must_use]
pub fn latest_directory(entries: &[ListingEntry]) -> Option<&ListingEntry> {
    entries
        .iter()
        .filter(|e| e.is_dir() && e.modified.is_some())
        .max_by_key(|e| e.modified)
}

/// Names of the GRIB2 files in a listing
#[must_use]
pub fn grib_files(entries: &[ListingEntry]) -> Vec<String> {
    entries
        .iter()
        .filter(|e| e.name.ends_with(".grib2"))
        .map(|e| e.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const PRE_LISTING: &str = r#"<html><head><title>Index of /model_gem_regional/astronomy/grib2</title></head>
<body><h1>Index of /model_gem_regional/astronomy/grib2</h1>
<pre><img src="/icons/blank.gif" alt="Icon "> <a href="?C=N;O=D">Name</a>                    <a href="?C=M;O=A">Last modified</a>      <a href="?C=S;O=A">Size</a>  <a href="?C=D;O=A">Description</a><hr><img src="/icons/back.gif" alt="[PARENTDIR]"> <a href="/model_gem_regional/astronomy/">Parent Directory</a>                             -
<img src="/icons/folder.gif" alt="[DIR]"> <a href="00/">00/</a>                     2024-03-01 04:12    -
<img src="/icons/folder.gif" alt="[DIR]"> <a href="12/">12/</a>                     2024-02-29 16:05    -
<hr></pre>
</body></html>"#;

    const TABLE_LISTING: &str = r#"<table>
<tr><th><a href="?C=N;O=D">Name</a></th><th><a href="?C=M;O=A">Last modified</a></th></tr>
<tr><td><a href="../">Parent Directory</a></td><td>&nbsp;</td></tr>
<tr><td><a href="CMC_reg_SEEI_SFC_0_ps10km_2024030100_P001.grib2">CMC_reg_SEEI_SFC_0_ps10km_2024030100_P001.grib2</a></td><td align="right">01-Mar-2024 03:55  </td><td align="right">1.2M</td></tr>
<tr><td><a href="CMC_reg_TRSP_SFC_0_ps10km_2024030100_P001.grib2">CMC_reg_TRSP_SFC_0_ps10km_2024030100_P001.grib2</a></td><td align="right">01-Mar-2024 03:56  </td><td align="right">1.1M</td></tr>
<tr><td><a href="README.txt">README.txt</a></td><td align="right">01-Jan-2024 00:00  </td></tr>
</table>"#;

    #[test]
    fn test_parse_pre_listing() {
        let entries = parse_listing(PRE_LISTING).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "00/");
        assert!(entries[0].is_dir());
        assert_eq!(
            entries[0].modified,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(4, 12, 0)
        );
        assert_eq!(latest_directory(&entries).unwrap().name, "00/");
    }

    #[test]
    fn test_parse_table_listing() {
        let entries = parse_listing(TABLE_LISTING).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries[1].modified,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(3, 56, 0)
        );
        let files = grib_files(&entries);
        assert_eq!(files.len(), 2);
        assert!(files[0].contains("_SEEI_"));
        assert!(latest_directory(&entries).is_none());
    }

    #[test]
    fn test_empty_listing() {
        assert!(parse_listing("<html></html>").unwrap().is_empty());
    }
}
