//! Policies commands

use colored::Colorize;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use super::ApiClient;
use crate::{error::CliResult, output::OutputFormat, PolicyCommands};

/// A URL-filtering policy. References categories by identifier; a policy with
/// no `url_categories` field on the wire references nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub url_categories: Vec<String>,
}

impl Policy {
    pub fn action_label(&self) -> &str {
        self.action.as_deref().unwrap_or("-")
    }
}

#[derive(Debug, Serialize, Tabled)]
struct PolicyRow {
    id: String,
    name: String,
    action: String,
    categories: usize,
}

impl PolicyRow {
    fn from(policy: &Policy) -> Self {
        Self {
            id: policy.id.clone(),
            name: policy.name.clone(),
            action: policy.action_label().to_string(),
            categories: policy.url_categories.len(),
        }
    }
}

/// One policy's references into the custom category space, ids resolved to
/// display names where the category still exists.
#[derive(Debug, Serialize)]
struct CustomRefsEntry {
    policy: String,
    action: String,
    references: Vec<CategoryRef>,
}

#[derive(Debug, Serialize)]
struct CategoryRef {
    id: String,
    name: String,
}

pub async fn handle(
    action: PolicyCommands,
    client: &ApiClient,
    format: OutputFormat,
) -> CliResult<()> {
    match action {
        PolicyCommands::List => {
            tracing::info!("Fetching URL filtering policies");
            let policies: Vec<Policy> = client.get("/url-filtering-policies").await?;
            tracing::info!("Found {} URL filtering policies", policies.len());

            let rows: Vec<PolicyRow> = policies.iter().map(PolicyRow::from).collect();
            format.print_rows(&rows);
        }
        PolicyCommands::Get { id } => {
            let policy: Policy = client
                .get(&format!("/url-filtering-policies/{}", id))
                .await?;
            format.print_rows(&[PolicyRow::from(&policy)]);
            if format.is_table() && !policy.url_categories.is_empty() {
                println!("referenced categories:");
                for category_id in &policy.url_categories {
                    println!("  {}", category_id);
                }
            }
        }
        PolicyCommands::CustomRefs => {
            tracing::info!("Fetching URL filtering policies");
            let policies: Vec<Policy> = client.get("/url-filtering-policies").await?;
            tracing::info!("Found {} URL filtering policies", policies.len());

            tracing::info!("Fetching URL categories");
            let categories: Vec<super::categories::Category> =
                client.get("/url-categories").await?;
            tracing::info!("Found {} URL categories", categories.len());

            let name_by_id: std::collections::HashMap<&str, &str> = categories
                .iter()
                .map(|c| (c.id.as_str(), c.configured_name.as_str()))
                .collect();

            let entries: Vec<CustomRefsEntry> = policies
                .iter()
                .filter_map(|policy| {
                    let references: Vec<CategoryRef> = policy
                        .url_categories
                        .iter()
                        .filter(|id| id.starts_with("CUSTOM_"))
                        .map(|id| CategoryRef {
                            id: id.clone(),
                            name: name_by_id.get(id.as_str()).unwrap_or(&"Unknown").to_string(),
                        })
                        .collect();
                    if references.is_empty() {
                        None
                    } else {
                        Some(CustomRefsEntry {
                            policy: policy.name.clone(),
                            action: policy.action_label().to_string(),
                            references,
                        })
                    }
                })
                .collect();

            tracing::info!("Found {} policies referencing custom categories", entries.len());

            if format.is_table() {
                println!("{}", "Policies referencing custom categories".bold());
                if entries.is_empty() {
                    println!("(none)");
                }
                for entry in &entries {
                    println!("- {} | action: {}", entry.policy, entry.action);
                    for reference in &entry.references {
                        println!("    -> {} | {}", reference.id, reference.name);
                    }
                }
            } else {
                format.print_value(&entries);
            }
        }
    }
    Ok(())
}
