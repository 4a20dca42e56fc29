//! Categories commands
//!
//! Custom URL category management: listing, usage reconciliation against the
//! URL-filtering policies, and bulk URL upload from local files.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use colored::Colorize;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use super::policies::Policy;
use super::ApiClient;
use crate::error::{CliError, CliResult};
use crate::output::{self, OutputFormat};
use crate::reconcile::{self, PolicyLink};
use crate::CategoryCommands;

/// A URL category as the API reports it. Mutated only through explicit
/// update calls; never deleted by this tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub configured_name: String,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub custom_category: bool,
    #[serde(default)]
    pub super_category: Option<String>,
}

/// Update payload. The API requires the name and super category to be echoed
/// back on every update, even when unchanged.
#[derive(Debug, Serialize)]
struct CategoryUpdate {
    configured_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    super_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    urls: Vec<String>,
}

#[derive(Debug, Serialize, Tabled)]
struct CategoryRow {
    id: String,
    name: String,
    urls: usize,
}

impl CategoryRow {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id.clone(),
            name: category.configured_name.clone(),
            urls: category.urls.len(),
        }
    }
}

// ---------------------------------------------------------------------------
// Usage report
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct UsageReport {
    used: Vec<UsedCategory>,
    unused: Vec<UnusedCategory>,
}

#[derive(Debug, Serialize)]
struct UsedCategory {
    id: String,
    name: String,
    policies: Vec<LinkedPolicy>,
}

#[derive(Debug, Serialize)]
struct LinkedPolicy {
    id: String,
    name: String,
    action: String,
}

#[derive(Debug, Serialize)]
struct UnusedCategory {
    id: String,
    name: String,
}

/// One line of the flat CSV report: every custom category, used or not.
#[derive(Debug, Serialize)]
struct UsageCsvRow {
    category_id: String,
    name: String,
    used: bool,
    url_count: usize,
    policies: String,
}

pub async fn handle(
    action: CategoryCommands,
    client: &ApiClient,
    format: OutputFormat,
) -> CliResult<()> {
    match action {
        CategoryCommands::List => {
            let custom = fetch_custom_categories(client).await?;

            let rows: Vec<CategoryRow> = custom.iter().map(CategoryRow::from).collect();
            format.print_rows(&rows);

            if format.is_table() {
                let total_urls: usize = custom.iter().map(|c| c.urls.len()).sum();
                println!(
                    "{} custom categories, {} URLs across all of them",
                    custom.len(),
                    total_urls
                );
            }
        }
        CategoryCommands::Get { id } => {
            let category: Category = client.get(&format!("/url-categories/{}", id)).await?;
            format.print_rows(&[CategoryRow::from(&category)]);
            if format.is_table() {
                if let Some(description) = &category.description {
                    println!("description: {}", description);
                }
                for url in &category.urls {
                    println!("  {}", url);
                }
            }
        }
        CategoryCommands::Usage { outfile } => {
            usage(client, format, outfile.as_deref()).await?;
        }
        CategoryCommands::AddUrls { id, file } => {
            add_urls(client, &id, &file).await?;
        }
        CategoryCommands::Update { id, csv } => {
            update_from_csv(client, &id, &csv).await?;
        }
    }
    Ok(())
}

async fn fetch_custom_categories(client: &ApiClient) -> CliResult<Vec<Category>> {
    tracing::info!("Fetching URL categories");
    let categories: Vec<Category> = client.get("/url-categories").await?;
    let custom: Vec<Category> = categories
        .into_iter()
        .filter(|c| c.custom_category)
        .collect();
    tracing::info!("Found {} custom categories", custom.len());
    Ok(custom)
}

// ---------------------------------------------------------------------------
// usage
// ---------------------------------------------------------------------------

async fn usage(
    client: &ApiClient,
    format: OutputFormat,
    outfile: Option<&Path>,
) -> CliResult<()> {
    let custom = fetch_custom_categories(client).await?;

    tracing::info!("Fetching URL filtering policies");
    let policies: Vec<Policy> = client.get("/url-filtering-policies").await?;
    tracing::info!("Found {} URL filtering policies", policies.len());

    let category_ids: BTreeSet<String> = custom.iter().map(|c| c.id.clone()).collect();
    let links: Vec<PolicyLink> = policies
        .iter()
        .map(|p| PolicyLink {
            policy_id: p.id.clone(),
            category_ids: p.url_categories.clone(),
        })
        .collect();

    let usage = reconcile::reconcile(&category_ids, &links);

    let name_by_id: HashMap<&str, &str> = custom
        .iter()
        .map(|c| (c.id.as_str(), c.configured_name.as_str()))
        .collect();
    let policy_by_id: HashMap<&str, &Policy> =
        policies.iter().map(|p| (p.id.as_str(), p)).collect();

    let report = UsageReport {
        used: usage
            .used
            .iter()
            .map(|(category_id, policy_ids)| UsedCategory {
                id: category_id.clone(),
                name: name_by_id.get(category_id.as_str()).unwrap_or(&"").to_string(),
                policies: policy_ids
                    .iter()
                    .map(|policy_id| {
                        let policy = policy_by_id.get(policy_id.as_str());
                        LinkedPolicy {
                            id: policy_id.clone(),
                            name: policy.map(|p| p.name.clone()).unwrap_or_default(),
                            action: policy
                                .map(|p| p.action_label().to_string())
                                .unwrap_or_else(|| "-".to_string()),
                        }
                    })
                    .collect(),
            })
            .collect(),
        unused: usage
            .unused
            .iter()
            .map(|category_id| UnusedCategory {
                id: category_id.clone(),
                name: name_by_id.get(category_id.as_str()).unwrap_or(&"").to_string(),
            })
            .collect(),
    };

    if format.is_table() {
        println!("{}", "Custom categories used in policies".bold());
        if report.used.is_empty() {
            println!("(none)");
        }
        for category in &report.used {
            println!("- {} | {}", category.id, category.name);
            for policy in &category.policies {
                println!("    -> {} | action: {}", policy.name, policy.action);
            }
        }
        println!();
        println!("{}", "Custom categories not used in any policy".bold());
        if report.unused.is_empty() {
            println!("(none)");
        }
        for category in &report.unused {
            println!("- {} | {}", category.id, category.name);
        }
        println!();
        println!(
            "{} used, {} unused of {} custom categories",
            report.used.len(),
            report.unused.len(),
            custom.len()
        );
    } else {
        format.print_value(&report);
    }

    if let Some(path) = outfile {
        let rows: Vec<UsageCsvRow> = custom
            .iter()
            .map(|category| {
                let referencing = usage.used.get(&category.id);
                UsageCsvRow {
                    category_id: category.id.clone(),
                    name: category.configured_name.clone(),
                    used: referencing.is_some(),
                    url_count: category.urls.len(),
                    policies: referencing
                        .map(|ids| ids.iter().cloned().collect::<Vec<_>>().join(";"))
                        .unwrap_or_default(),
                }
            })
            .collect();
        output::write_csv(path, &rows)?;
        tracing::info!("Wrote usage report to {}", path.display());
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// add-urls / update
// ---------------------------------------------------------------------------

async fn add_urls(client: &ApiClient, id: &str, file: &Path) -> CliResult<()> {
    let category: Category = client.get(&format!("/url-categories/{}", id)).await?;
    tracing::info!(
        "Found {} existing URLs in '{}'",
        category.urls.len(),
        category.configured_name
    );

    let incoming = read_url_lines(file)?;
    tracing::info!("Found {} URLs in {}", incoming.len(), file.display());

    let merged = reconcile::merge_urls(&category.urls, &incoming);
    let added = new_url_count(&category.urls, &incoming);
    if added == 0 {
        println!("No new URLs to add; every URL in the file is already present.");
        return Ok(());
    }
    tracing::info!("Adding {} new URLs", added);

    let updated = push_urls(client, &category, merged, category.description.clone()).await?;
    println!(
        "{} updated '{}', now {} URLs",
        "ok:".green().bold(),
        updated.configured_name,
        updated.urls.len()
    );
    Ok(())
}

async fn update_from_csv(client: &ApiClient, id: &str, csv_path: &Path) -> CliResult<()> {
    let category: Category = client.get(&format!("/url-categories/{}", id)).await?;
    tracing::info!(
        "Found {} existing URLs in '{}'",
        category.urls.len(),
        category.configured_name
    );

    let parsed = read_url_csv(csv_path)?;
    tracing::info!(
        "Found {} URLs in {} ({} rows skipped)",
        parsed.urls.len(),
        csv_path.display(),
        parsed.skipped
    );
    let ticket = parsed.ticket.unwrap_or_else(|| "UNKNOWN_TICKET".to_string());
    tracing::info!("Change ticket: {}", ticket);

    let merged = reconcile::merge_urls(&category.urls, &parsed.urls);
    let added = new_url_count(&category.urls, &parsed.urls);
    if added == 0 {
        println!("No new URLs to add; every URL in the file is already present.");
        return Ok(());
    }
    tracing::info!("Adding {} new URLs", added);

    let description = match category.description.as_deref() {
        Some(existing) if !existing.is_empty() => {
            Some(format!("{} | ticket {}", existing, ticket))
        }
        _ => Some(format!("ticket {}", ticket)),
    };

    let updated = push_urls(client, &category, merged, description).await?;
    println!(
        "{} updated '{}' under ticket {}, now {} URLs",
        "ok:".green().bold(),
        updated.configured_name,
        ticket,
        updated.urls.len()
    );
    Ok(())
}

/// Sends the merged URL list back and activates the pending change.
async fn push_urls(
    client: &ApiClient,
    category: &Category,
    urls: Vec<String>,
    description: Option<String>,
) -> CliResult<Category> {
    let payload = CategoryUpdate {
        configured_name: category.configured_name.clone(),
        super_category: category.super_category.clone(),
        description,
        urls,
    };
    let updated: Category = client
        .put(&format!("/url-categories/{}", category.id), &payload)
        .await?;
    activate(client).await?;
    Ok(updated)
}

#[derive(Debug, Deserialize)]
struct ActivationStatus {
    status: String,
}

/// Commits pending configuration changes. Category updates stay staged until
/// activated.
async fn activate(client: &ApiClient) -> CliResult<()> {
    tracing::info!("Activating configuration changes");
    let activation: ActivationStatus = client.post("/activation", &()).await?;
    tracing::info!("Activation status: {}", activation.status);
    Ok(())
}

// ---------------------------------------------------------------------------
// local input files
// ---------------------------------------------------------------------------

/// How many distinct incoming URLs are not already in the category.
fn new_url_count(existing: &[String], incoming: &[String]) -> usize {
    let existing: BTreeSet<&str> = existing.iter().map(String::as_str).collect();
    incoming
        .iter()
        .map(String::as_str)
        .filter(|url| !existing.contains(url))
        .collect::<BTreeSet<&str>>()
        .len()
}

/// Reads one URL per line, trimming whitespace and skipping blank lines.
fn read_url_lines(path: &Path) -> CliResult<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

#[derive(Debug)]
struct UrlCsv {
    ticket: Option<String>,
    urls: Vec<String>,
    skipped: usize,
}

/// Reads a change CSV: a `URL` column, plus an optional `TicketID` column
/// whose first non-empty value names the change ticket. Rows with a missing
/// or empty URL are reported and skipped; the rest of the file is still
/// processed.
fn read_url_csv(path: &Path) -> CliResult<UrlCsv> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let url_idx = headers
        .iter()
        .position(|h| h == "URL")
        .ok_or_else(|| CliError::Input(format!("{}: no URL column", path.display())))?;
    let ticket_idx = headers.iter().position(|h| h == "TicketID");

    let mut ticket = None;
    let mut urls = Vec::new();
    let mut skipped = 0;

    for (index, record) in reader.records().enumerate() {
        // Header is line 1, first record line 2.
        let line = index + 2;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("{} line {}: {}", path.display(), line, e);
                skipped += 1;
                continue;
            }
        };

        if ticket.is_none() {
            if let Some(value) = ticket_idx.and_then(|i| record.get(i)) {
                let value = value.trim();
                if !value.is_empty() {
                    ticket = Some(value.to_string());
                }
            }
        }

        match record.get(url_idx).map(str::trim) {
            Some(url) if !url.is_empty() => urls.push(url.to_string()),
            _ => {
                tracing::warn!("{} line {}: missing URL field, skipping", path.display(), line);
                skipped += 1;
            }
        }
    }

    Ok(UrlCsv { ticket, urls, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn urls(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_new_url_count_ignores_known_and_duplicate_urls() {
        let existing = urls(&["a.com", "b.com", "b.com"]);
        let incoming = urls(&["b.com", "c.com", "c.com", "d.com"]);
        assert_eq!(new_url_count(&existing, &incoming), 2);
        assert_eq!(new_url_count(&existing, &urls(&["a.com"])), 0);
    }

    #[test]
    fn test_read_url_lines_skips_blanks_and_trims() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        fs::write(&path, "a.com\n\n  b.com  \n\t\nc.com\n").unwrap();

        let urls = read_url_lines(&path).unwrap();
        assert_eq!(urls, vec!["a.com", "b.com", "c.com"]);
    }

    #[test]
    fn test_read_url_csv_extracts_ticket_and_urls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("changes.csv");
        fs::write(
            &path,
            "URL,TicketID\nhttp://a.com,CHG-1001\nhttp://b.com,\n,\nhttp://c.com,\n",
        )
        .unwrap();

        let parsed = read_url_csv(&path).unwrap();
        assert_eq!(parsed.ticket.as_deref(), Some("CHG-1001"));
        assert_eq!(parsed.urls, vec!["http://a.com", "http://b.com", "http://c.com"]);
        assert_eq!(parsed.skipped, 1);
    }

    #[test]
    fn test_read_url_csv_without_ticket_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("changes.csv");
        fs::write(&path, "URL\nhttp://a.com\n").unwrap();

        let parsed = read_url_csv(&path).unwrap();
        assert!(parsed.ticket.is_none());
        assert_eq!(parsed.urls, vec!["http://a.com"]);
        assert_eq!(parsed.skipped, 0);
    }

    #[test]
    fn test_read_url_csv_requires_url_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("changes.csv");
        fs::write(&path, "Address,TicketID\nhttp://a.com,CHG-1\n").unwrap();

        let err = read_url_csv(&path).unwrap_err();
        assert!(matches!(err, CliError::Input(_)));
    }
}
