//! Segments commands
//!
//! Bulk CSV export and import of application segments. Export resolves group
//! ids to names and tags each segment with its access-type memberships;
//! import validates rows against the tenant's groups before creating
//! anything, skipping bad rows rather than aborting the run.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use colored::Colorize;
use serde::{Deserialize, Serialize};

use super::ApiClient;
use crate::error::{CliError, CliResult};
use crate::output;
use crate::SegmentCommands;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedGroup {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub segment_group_id: String,
    #[serde(default)]
    pub server_groups: Vec<GroupRef>,
    #[serde(default)]
    pub domain_names: Vec<String>,
    #[serde(default)]
    pub tcp_port_range: Vec<PortRange>,
    #[serde(default)]
    pub udp_port_range: Vec<PortRange>,
    #[serde(default)]
    pub double_encrypt: bool,
}

/// Creation payload; group references travel as ids.
#[derive(Debug, PartialEq, Serialize)]
struct SegmentCreate {
    name: String,
    description: String,
    enabled: bool,
    segment_group_id: String,
    server_group_ids: Vec<String>,
    domain_names: Vec<String>,
    tcp_port_range: Vec<PortRange>,
    udp_port_range: Vec<PortRange>,
    double_encrypt: bool,
}

#[derive(Debug, Serialize)]
struct ExportRow {
    #[serde(rename = "NAME")]
    name: String,
    #[serde(rename = "DESCRIPTION")]
    description: String,
    #[serde(rename = "ENABLED")]
    enabled: bool,
    #[serde(rename = "SEGMENT_GROUP")]
    segment_group: String,
    #[serde(rename = "SERVER_GROUPS")]
    server_groups: String,
    #[serde(rename = "DOMAINS")]
    domains: String,
    #[serde(rename = "TCP_PORTS")]
    tcp_ports: String,
    #[serde(rename = "UDP_PORTS")]
    udp_ports: String,
    #[serde(rename = "DOUBLE_ENCRYPT")]
    double_encrypt: bool,
    #[serde(rename = "IS_BROWSER_ACCESS")]
    is_browser_access: bool,
    #[serde(rename = "IS_PRA")]
    is_pra: bool,
    #[serde(rename = "IS_INSPECTION")]
    is_inspection: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ImportRow {
    #[serde(rename = "NAME", default)]
    name: String,
    #[serde(rename = "DESCRIPTION", default)]
    description: String,
    #[serde(rename = "ENABLED", default)]
    enabled: String,
    #[serde(rename = "SEGMENT_GROUP", default)]
    segment_group: String,
    #[serde(rename = "SERVER_GROUPS", default)]
    server_groups: String,
    #[serde(rename = "DOMAINS", default)]
    domains: String,
    #[serde(rename = "TCP_PORTS", default)]
    tcp_ports: String,
    #[serde(rename = "UDP_PORTS", default)]
    udp_ports: String,
    #[serde(rename = "DOUBLE_ENCRYPT", default)]
    double_encrypt: String,
}

pub async fn handle(action: SegmentCommands, client: &ApiClient) -> CliResult<()> {
    match action {
        SegmentCommands::Export { outfile } => export(client, &outfile).await,
        SegmentCommands::Import { csv, force } => import(client, &csv, force).await,
    }
}

// ---------------------------------------------------------------------------
// export
// ---------------------------------------------------------------------------

async fn export(client: &ApiClient, outfile: &Path) -> CliResult<()> {
    let server_groups = group_names_by_id(client, "/server-groups").await?;
    let segment_groups = group_names_by_id(client, "/segment-groups").await?;

    let browser_access = segment_ids_by_type(client, "BROWSER_ACCESS").await?;
    let privileged = segment_ids_by_type(client, "SECURE_REMOTE_ACCESS").await?;
    let inspection = segment_ids_by_type(client, "INSPECT").await?;

    tracing::info!("Fetching application segments");
    let segments: Vec<Segment> = client.get("/app-segments").await?;
    tracing::info!("Found {} application segments", segments.len());

    if segments.is_empty() {
        println!("No application segments found to export.");
        return Ok(());
    }

    let rows: Vec<ExportRow> = segments
        .iter()
        .map(|segment| ExportRow {
            name: segment.name.clone(),
            description: segment.description.clone().unwrap_or_default(),
            enabled: segment.enabled,
            segment_group: resolve_name(&segment_groups, &segment.segment_group_id),
            server_groups: segment
                .server_groups
                .iter()
                .map(|group| resolve_name(&server_groups, &group.id))
                .collect::<Vec<_>>()
                .join(","),
            domains: segment.domain_names.join(","),
            tcp_ports: format_ports(&segment.tcp_port_range),
            udp_ports: format_ports(&segment.udp_port_range),
            double_encrypt: segment.double_encrypt,
            is_browser_access: browser_access.contains(&segment.id),
            is_pra: privileged.contains(&segment.id),
            is_inspection: inspection.contains(&segment.id),
        })
        .collect();

    output::write_csv(outfile, &rows)?;
    println!(
        "{} exported {} segments to {}",
        "ok:".green().bold(),
        rows.len(),
        outfile.display()
    );
    Ok(())
}

async fn group_names_by_id(
    client: &ApiClient,
    path: &str,
) -> CliResult<HashMap<String, String>> {
    tracing::info!("Fetching {}", path.trim_start_matches('/'));
    let groups: Vec<NamedGroup> = client.get(path).await?;
    tracing::info!("Found {} {}", groups.len(), path.trim_start_matches('/'));
    Ok(groups.into_iter().map(|g| (g.id, g.name)).collect())
}

async fn segment_ids_by_type(
    client: &ApiClient,
    segment_type: &str,
) -> CliResult<BTreeSet<String>> {
    let segments: Vec<Segment> = client
        .get(&format!("/app-segments/by-type?type={}", segment_type))
        .await?;
    tracing::info!("Found {} '{}' segments", segments.len(), segment_type);
    Ok(segments.into_iter().map(|s| s.id).collect())
}

fn resolve_name(names_by_id: &HashMap<String, String>, id: &str) -> String {
    names_by_id
        .get(id)
        .cloned()
        .unwrap_or_else(|| format!("UNKNOWN_{}", id))
}

fn format_ports(ranges: &[PortRange]) -> String {
    ranges
        .iter()
        .map(|range| {
            if range.from == range.to {
                range.from.clone()
            } else {
                format!("{}-{}", range.from, range.to)
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

// ---------------------------------------------------------------------------
// import
// ---------------------------------------------------------------------------

async fn import(client: &ApiClient, csv_path: &Path, force: bool) -> CliResult<()> {
    let server_groups = group_ids_by_name(client, "/server-groups").await?;
    let segment_groups = group_ids_by_name(client, "/segment-groups").await?;
    if server_groups.is_empty() {
        return Err(CliError::Input("no server groups found in tenant".into()));
    }
    if segment_groups.is_empty() {
        return Err(CliError::Input("no segment groups found in tenant".into()));
    }

    let existing_names: BTreeSet<String> = match client.get::<Vec<Segment>>("/app-segments").await
    {
        Ok(segments) => segments.into_iter().map(|s| s.name).collect(),
        Err(e) => {
            tracing::warn!(
                "Could not fetch existing segments: {}; duplicates will not be skipped",
                e
            );
            BTreeSet::new()
        }
    };

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut payloads = Vec::new();
    let mut invalid = 0;

    for (index, row) in reader.deserialize::<ImportRow>().enumerate() {
        let line = index + 2;
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!("{} line {}: {}", csv_path.display(), line, e);
                invalid += 1;
                continue;
            }
        };
        match validate_row(&row, &server_groups, &segment_groups) {
            Ok(payload) => payloads.push(payload),
            Err(problems) => {
                tracing::warn!(
                    "{} line {} ('{}'): {}",
                    csv_path.display(),
                    line,
                    if row.name.is_empty() { "unnamed" } else { &row.name },
                    problems.join("; ")
                );
                invalid += 1;
            }
        }
    }

    if payloads.is_empty() {
        println!("No valid rows found in {}.", csv_path.display());
        return Ok(());
    }

    let applications: usize = payloads
        .iter()
        .map(|p| p.domain_names.len() * (p.tcp_port_range.len() + p.udp_port_range.len()))
        .sum();
    tracing::info!(
        "Found {} applications across {} segments to create",
        applications,
        payloads.len()
    );

    let mut created = 0;
    let mut skipped = 0;
    let mut failed = 0;

    for payload in &payloads {
        if !force && existing_names.contains(&payload.name) {
            println!("  ~ skipping existing app segment '{}'", payload.name);
            skipped += 1;
            continue;
        }
        match client.post::<Segment, _>("/app-segments", payload).await {
            Ok(segment) => {
                println!("  {} created app segment '{}' ({})", "✓".green(), segment.name, segment.id);
                created += 1;
            }
            Err(e) => {
                tracing::warn!("Failed to create app segment '{}': {}", payload.name, e);
                failed += 1;
            }
        }
    }

    println!(
        "{} created, {} skipped, {} invalid rows, {} failed",
        created, skipped, invalid, failed
    );
    Ok(())
}

async fn group_ids_by_name(
    client: &ApiClient,
    path: &str,
) -> CliResult<HashMap<String, String>> {
    let groups: Vec<NamedGroup> = client.get(path).await?;
    Ok(groups.into_iter().map(|g| (g.name, g.id)).collect())
}

/// Checks required fields and resolves group names to ids. Returns every
/// problem found, not just the first, so one pass over the log is enough to
/// fix a row.
fn validate_row(
    row: &ImportRow,
    server_groups: &HashMap<String, String>,
    segment_groups: &HashMap<String, String>,
) -> Result<SegmentCreate, Vec<String>> {
    let mut problems = Vec::new();

    let name = row.name.trim();
    if name.is_empty() {
        problems.push("NAME is required".to_string());
    }

    let domains = split_list(&row.domains);
    if domains.is_empty() {
        problems.push("DOMAINS is required".to_string());
    }

    let segment_group = row.segment_group.trim();
    let segment_group_id = match segment_groups.get(segment_group) {
        Some(id) => id.clone(),
        None => {
            problems.push(format!("SEGMENT_GROUP '{}' not found in tenant", segment_group));
            String::new()
        }
    };

    let server_group_names = split_list(&row.server_groups);
    if server_group_names.is_empty() {
        problems.push("SERVER_GROUPS is required".to_string());
    }
    let mut server_group_ids = Vec::new();
    for group_name in &server_group_names {
        match server_groups.get(group_name) {
            Some(id) => server_group_ids.push(id.clone()),
            None => problems.push(format!("server group '{}' not found in tenant", group_name)),
        }
    }

    if !problems.is_empty() {
        return Err(problems);
    }

    Ok(SegmentCreate {
        name: name.to_string(),
        description: row.description.trim().to_string(),
        enabled: str2bool_or(&row.enabled, true),
        segment_group_id,
        server_group_ids,
        domain_names: domains,
        tcp_port_range: parse_ports(&row.tcp_ports),
        udp_port_range: parse_ports(&row.udp_ports),
        double_encrypt: str2bool_or(&row.double_encrypt, false),
    })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

fn str2bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "y")
}

fn str2bool_or(value: &str, default: bool) -> bool {
    if value.trim().is_empty() {
        default
    } else {
        str2bool(value)
    }
}

/// Parses `"443,8000-8100"` into port ranges; a bare port becomes a
/// single-port range.
fn parse_ports(value: &str) -> Vec<PortRange> {
    split_list(value)
        .into_iter()
        .map(|item| match item.split_once('-') {
            Some((from, to)) => PortRange {
                from: from.trim().to_string(),
                to: to.trim().to_string(),
            },
            None => PortRange {
                from: item.clone(),
                to: item,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(name, id)| (name.to_string(), id.to_string()))
            .collect()
    }

    fn row(name: &str, segment_group: &str, server_groups: &str, domains: &str) -> ImportRow {
        ImportRow {
            name: name.to_string(),
            segment_group: segment_group.to_string(),
            server_groups: server_groups.to_string(),
            domains: domains.to_string(),
            tcp_ports: "443".to_string(),
            ..ImportRow::default()
        }
    }

    #[test]
    fn test_str2bool_accepts_common_truthy_values() {
        for value in ["1", "true", "TRUE", "yes", "Y", " y "] {
            assert!(str2bool(value), "expected truthy: {:?}", value);
        }
        for value in ["0", "false", "no", "", "maybe"] {
            assert!(!str2bool(value), "expected falsy: {:?}", value);
        }
    }

    #[test]
    fn test_parse_ports_handles_singles_and_ranges() {
        assert_eq!(
            parse_ports("443, 8000-8100"),
            vec![
                PortRange { from: "443".into(), to: "443".into() },
                PortRange { from: "8000".into(), to: "8100".into() },
            ]
        );
        assert!(parse_ports("").is_empty());
    }

    #[test]
    fn test_format_ports_round_trips() {
        let ranges = parse_ports("443,8000-8100");
        assert_eq!(format_ports(&ranges), "443,8000-8100");
    }

    #[test]
    fn test_validate_row_maps_group_names_to_ids() {
        let payload = validate_row(
            &row("intranet", "corp", "dc-east,dc-west", "intra.example.com"),
            &groups(&[("dc-east", "sg-1"), ("dc-west", "sg-2")]),
            &groups(&[("corp", "gg-1")]),
        )
        .unwrap();

        assert_eq!(payload.segment_group_id, "gg-1");
        assert_eq!(payload.server_group_ids, vec!["sg-1", "sg-2"]);
        assert_eq!(payload.domain_names, vec!["intra.example.com"]);
        assert!(payload.enabled);
        assert!(!payload.double_encrypt);
    }

    #[test]
    fn test_validate_row_collects_every_problem() {
        let err = validate_row(
            &row("", "nowhere", "ghost", ""),
            &groups(&[("dc-east", "sg-1")]),
            &groups(&[("corp", "gg-1")]),
        )
        .unwrap_err();

        assert!(err.iter().any(|p| p.contains("NAME")));
        assert!(err.iter().any(|p| p.contains("DOMAINS")));
        assert!(err.iter().any(|p| p.contains("SEGMENT_GROUP")));
        assert!(err.iter().any(|p| p.contains("ghost")));
    }

    #[test]
    fn test_split_list_trims_and_drops_empties() {
        assert_eq!(split_list(" a , ,b,"), vec!["a", "b"]);
    }
}
