use std::path::Path;

use anyhow::Context;
use argus_core::{Catalog, SourceDescriptor};
use serde::Serialize;

use crate::cli::subcommands::SourceCommands;
use crate::cli::{GlobalFlags, OutputFormat};
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct SourceRow<'a> {
    id: &'a str,
    name: &'a str,
    category: String,
    method: &'static str,
    secret: &'a str,
    priority: i32,
}

impl<'a> From<&'a SourceDescriptor> for SourceRow<'a> {
    fn from(source: &'a SourceDescriptor) -> Self {
        Self {
            id: &source.id,
            name: &source.name,
            category: format!(
                "{}/{}/{}",
                source.category.data_type, source.category.entity_type, source.category.attribute
            ),
            method: source.http_method.as_str(),
            secret: source.auth.secret_name().unwrap_or("-"),
            priority: source.priority,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChangeResponse {
    action: &'static str,
    ids: Vec<String>,
    catalog_size: usize,
}

/// Parse a TOML file of `[[source]]` tables. Ids must be unique within it.
fn read_sources_file(path: &Path) -> anyhow::Result<Vec<SourceDescriptor>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let catalog: Catalog =
        toml::from_str(&text).with_context(|| format!("invalid source file {}", path.display()))?;
    Ok(catalog.sources().to_vec())
}

/// Handle `argus sources`.
pub fn handle(action: &SourceCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match action {
        SourceCommands::List => {
            let catalog = ctx.store.list_sources()?;
            if flags.format == OutputFormat::Table {
                let rows: Vec<SourceRow<'_>> = catalog.iter().map(SourceRow::from).collect();
                output(&rows, flags.format)
            } else {
                output(&catalog.sources(), flags.format)
            }
        }
        SourceCommands::Get { id } => output(&ctx.store.get_source(id)?, flags.format),
        SourceCommands::Add { file } => {
            let sources = read_sources_file(file)?;
            if sources.is_empty() {
                anyhow::bail!("{} contains no [[source]] tables", file.display());
            }
            let mut ids = Vec::with_capacity(sources.len());
            for source in sources {
                let id = source.id.clone();
                ctx.store
                    .upsert_source(source)
                    .with_context(|| format!("failed to save source '{id}'"))?;
                ids.push(id);
            }
            tracing::info!(count = ids.len(), "sources saved");
            output(
                &ChangeResponse {
                    action: "upserted",
                    ids,
                    catalog_size: ctx.store.list_sources()?.len(),
                },
                flags.format,
            )
        }
        SourceCommands::Remove { id } => {
            let removed = ctx.store.remove_source(id)?;
            output(
                &ChangeResponse {
                    action: "removed",
                    ids: vec![removed.id],
                    catalog_size: ctx.store.list_sources()?.len(),
                },
                flags.format,
            )
        }
        SourceCommands::Seed => {
            let before = ctx.store.list_sources()?;
            let added = ctx.store.seed_builtin_sources()?;
            let after = ctx.store.list_sources()?;
            let ids = after
                .iter()
                .filter(|s| before.get(&s.id).is_none())
                .map(|s| s.id.clone())
                .collect::<Vec<_>>();
            tracing::debug!(added, "built-in sources installed");
            output(
                &ChangeResponse {
                    action: "seeded",
                    ids,
                    catalog_size: after.len(),
                },
                flags.format,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{SourceRow, read_sources_file};

    const SOURCE_FILE: &str = r#"
[[source]]
id = "ipinfo"
name = "IPinfo"
category = { data_type = "NETWORK", entity_type = "DEVICE", attribute = "IP" }
endpoint_template = "https://ipinfo.io/{ip}/json"
auth = { type = "bearer", secret = "IPINFO_TOKEN" }
param_mapping = [{ param = "ip", signal = "free_text" }]
"#;

    #[test]
    fn source_file_parses_and_summarizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extra.toml");
        std::fs::write(&path, SOURCE_FILE).unwrap();

        let sources = read_sources_file(&path).unwrap();
        assert_eq!(sources.len(), 1);

        let row = SourceRow::from(&sources[0]);
        assert_eq!(row.category, "NETWORK/DEVICE/IP");
        assert_eq!(row.method, "GET");
        assert_eq!(row.secret, "IPINFO_TOKEN");
    }

    #[test]
    fn invalid_source_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(
            &path,
            SOURCE_FILE.replace("https://ipinfo.io/{ip}/json", "https://ipinfo.io/{address}"),
        )
        .unwrap();

        let err = read_sources_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("invalid source file"));
    }
}
