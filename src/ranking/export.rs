use super::RankedRow;
use anyhow::{Context, Result};
use std::path::Path;

/// `<Venue><year>.csv`, the name the ranked table is saved under.
pub fn csv_file_name(venue: &str, year: i32) -> String {
    format!("{venue}{year}.csv")
}

/// Writes the ranked table as CSV; the `cit/month` column only appears when
/// a publication month was given.
pub fn write_csv(path: &Path, rows: &[RankedRow], include_month: bool) -> Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Unable to create {}", path.display()))?;

    let mut header = vec!["ID", "Author", "Title", "Citations", "Source", "cit/year"];
    if include_month {
        header.push("cit/month");
    }
    header.push("Etc");
    writer.write_record(&header)?;

    for row in rows {
        let mut record = vec![
            row.id.to_string(),
            row.authors.clone(),
            row.title.clone(),
            row.citations.to_string(),
            row.link.clone(),
            row.citations_per_year.to_string(),
        ];
        if include_month {
            record.push(row.citations_per_month.unwrap_or_default().to_string());
        }
        record.push(row.etc.clone());
        writer.write_record(&record)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

const TITLE_WIDTH: usize = 72;

/// Plain-text rendering of the top `limit` rows for the console.
pub fn format_table(rows: &[RankedRow], limit: usize) -> String {
    let with_month = rows.iter().any(|row| row.citations_per_month.is_some());
    let mut out = String::new();
    out.push_str(&format!("{:>5}  {:>9}  {:>8}", "ID", "Citations", "cit/year"));
    if with_month {
        out.push_str(&format!("  {:>9}", "cit/month"));
    }
    out.push_str("  Title\n");
    for row in rows.iter().take(limit) {
        out.push_str(&format!(
            "{:>5}  {:>9}  {:>8}",
            row.id, row.citations, row.citations_per_year
        ));
        if with_month {
            out.push_str(&format!("  {:>9}", row.citations_per_month.unwrap_or_default()));
        }
        out.push_str("  ");
        out.push_str(&truncate(&row.title, TITLE_WIDTH));
        out.push('\n');
    }
    if rows.len() > limit {
        out.push_str(&format!("... {} more\n", rows.len() - limit));
    }
    out
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}
