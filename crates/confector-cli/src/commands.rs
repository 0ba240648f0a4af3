use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use confector_core::{ArchiveSummary, Node, Session};
use confector_pack::{InMemoryArchive, PackReader};
use confector_schema::Schema;
use serde_json::{json, Value};
use tracing::debug;

use crate::cli::*;
use crate::manifest::{BuildManifest, Record};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Check(args) => cmd_check(args, cli.format),
        Command::Build(args) => cmd_build(args, cli.format),
        Command::Inspect(args) => cmd_inspect(args, cli.format),
    }
}

fn collection_name(path: &Path) -> anyhow::Result<String> {
    match path.file_stem().and_then(|s| s.to_str()) {
        Some(stem) if !stem.is_empty() => Ok(stem.to_string()),
        _ => bail!("cannot derive a collection name from {}", path.display()),
    }
}

fn cmd_check(args: CheckArgs, format: OutputFormat) -> anyhow::Result<()> {
    let mut session = Session::new(InMemoryArchive::new());
    let mut names = Vec::with_capacity(args.schemata.len());
    for path in &args.schemata {
        let name = collection_name(path)?;
        let schema = Schema::from_path(path)
            .with_context(|| format!("loading schema {}", path.display()))?;
        session
            .register_schema(&name, schema)
            .with_context(|| format!("registering collection {name}"))?;
        names.push(name);
    }
    session.check_schemata().context("checking schemata")?;

    match format {
        OutputFormat::Json => {
            let report = json!({
                "collections": names,
                "links": session.link_graph()?,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!(
                "{} {} schemata checked",
                "✓".green().bold(),
                names.len().to_string().bold()
            );
            println!("\n{}", session.outline()?);
        }
    }
    Ok(())
}

fn cmd_build(args: BuildArgs, format: OutputFormat) -> anyhow::Result<()> {
    let manifest = BuildManifest::load(&args.manifest)?;
    let archive_path = args.output.unwrap_or_else(|| manifest.archive.clone());
    let mut session = Session::create(&archive_path, manifest.pack_config())
        .with_context(|| format!("creating archive {}", archive_path.display()))?;

    for collection in &manifest.collections {
        let schema = Schema::from_path(&collection.schema)
            .with_context(|| format!("loading schema {}", collection.schema.display()))?;
        session
            .register_schema(&collection.name, schema)
            .with_context(|| format!("registering collection {}", collection.name))?;
    }
    session.check_schemata().context("checking schemata")?;

    for collection in &manifest.collections {
        let Some(records) = &collection.records else {
            continue;
        };
        let file = std::fs::File::open(records)
            .with_context(|| format!("opening records {}", records.display()))?;
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let at = || format!("{}:{}", records.display(), index + 1);
            let record: Record = serde_json::from_str(&line).with_context(at)?;
            let mut node = Node::new(record.title).with_cover_images(record.cover_images);
            session
                .add_properties(&collection.name, &mut node, record.properties, manifest.reject_null)
                .with_context(at)?;
            session.add_node(&collection.name, &node).with_context(at)?;
        }
        debug!(collection = %collection.name, "records added");
    }

    let summary = session.finalize(&manifest.meta).context("finalizing archive")?;
    print_summary(&archive_path, &summary, format)
}

fn print_summary(path: &Path, summary: &ArchiveSummary, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let report = json!({
                "archive": path.display().to_string(),
                "node_counts": summary.node_counts,
                "entries": summary.entries,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            let mut counts: Vec<_> = summary.node_counts.iter().collect();
            counts.sort_by(|a, b| b.1.cmp(a.1));
            for (collection, count) in counts {
                println!("{:<40} -> wrote {} nodes", collection, count.to_string().bold());
            }
            println!("\nArchive contents:");
            for entry in &summary.entries {
                println!("  {}", entry);
            }
            println!(
                "\n{} Archive at {}",
                "✓".green().bold(),
                path.display().to_string().bold()
            );
        }
    }
    Ok(())
}

fn cmd_inspect(args: InspectArgs, format: OutputFormat) -> anyhow::Result<()> {
    let reader = PackReader::open(&args.archive)
        .with_context(|| format!("opening archive {}", args.archive.display()))?;

    let mut entries = Vec::with_capacity(reader.entry_count());
    for path in reader.paths() {
        let data = reader
            .read_entry(path)?
            .with_context(|| format!("entry {path} vanished"))?;
        let nodes = path
            .starts_with("data/")
            .then(|| data.split(|b| *b == b'\n').filter(|l| !l.is_empty()).count());
        entries.push((path.to_string(), data.len(), nodes));
    }
    let meta: Value = match reader.read_entry("meta.json")? {
        Some(data) => serde_json::from_slice(&data).context("parsing meta.json")?,
        None => Value::Null,
    };
    let checksum = hex::encode(reader.checksum());

    match format {
        OutputFormat::Json => {
            let report = json!({
                "archive": args.archive.display().to_string(),
                "checksum": checksum,
                "entries": entries.iter().map(|(path, size, nodes)| json!({
                    "path": path,
                    "size": size,
                    "nodes": nodes,
                })).collect::<Vec<_>>(),
                "meta": meta,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!("Archive {}", args.archive.display().to_string().bold());
            println!("  Checksum: {}", checksum.dimmed());
            println!("  Entries: {}", entries.len().to_string().bold());
            for (path, size, nodes) in &entries {
                match nodes {
                    Some(n) => println!("    {:<40} {:>10} bytes  {} nodes", path, size, n.to_string().cyan()),
                    None => println!("    {:<40} {:>10} bytes", path, size),
                }
            }
            println!("  Meta: {}", serde_json::to_string_pretty(&meta)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const LEGS: &str = "bc1e7372-3c89-44e1-853b-6c97b24fb8a4";
    const CLASS_LINK: &str = "6b7df71e-c21d-4162-8e9f-2eec39010362";
    const CLASS_NUMBER: &str = "d96e6334-0736-4010-bf3a-3c4bd142f41d";

    fn write_zoo(dir: &Path) -> PathBuf {
        let animal = json!({
            "main": {"title": "", "type": "KubunBox", "value": [
                {"title": "Legs", "ident": LEGS, "prop_type": "KubunInt"},
                {"title": "Class", "ident": CLASS_LINK, "prop_type": "KubunLink",
                 "config": {"target": {"target_tag": "animalclass", "target_ident": CLASS_NUMBER}}},
            ]},
            "mini": {"title": "", "type": "KubunBox", "value": []},
        });
        let animalclass = json!({
            "main": {"title": "", "type": "KubunBox", "value": [
                {"title": "Number", "ident": CLASS_NUMBER, "prop_type": "KubunInt"},
            ]},
            "mini": {"title": "", "type": "KubunBox", "value": []},
        });
        std::fs::create_dir_all(dir.join("schemata")).unwrap();
        std::fs::write(dir.join("schemata/animal.json"), animal.to_string()).unwrap();
        std::fs::write(dir.join("schemata/animalclass.json"), animalclass.to_string()).unwrap();

        let records = [
            json!({"title": "Aardvark", "properties": {LEGS: "4", CLASS_LINK: 1}}),
            json!({"title": "Bass", "coverImages": ["https://img/bass.png"], "properties": {LEGS: 0, CLASS_LINK: [4]}}),
        ]
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join("\n");
        std::fs::write(dir.join("animal.ndjson"), records + "\n\n").unwrap();
        std::fs::write(
            dir.join("animalclass.ndjson"),
            json!({"title": "Mammal", "properties": {CLASS_NUMBER: 1}}).to_string(),
        )
        .unwrap();

        let manifest = dir.join("zoo.toml");
        std::fs::write(
            &manifest,
            r#"
archive = "out/animals.kbn"

[meta]
kubun_ident = "animals"
default_tag = "animal"

[[collection]]
name = "animal"
schema = "schemata/animal.json"
records = "animal.ndjson"

[[collection]]
name = "animalclass"
schema = "schemata/animalclass.json"
records = "animalclass.ndjson"
"#,
        )
        .unwrap();
        manifest
    }

    #[test]
    fn build_then_inspect() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_zoo(dir.path());
        cmd_build(
            BuildArgs {
                manifest,
                output: None,
            },
            OutputFormat::Text,
        )
        .unwrap();

        let archive = dir.path().join("out/animals.kbn");
        let reader = PackReader::open(&archive).unwrap();
        let data = String::from_utf8(reader.read_entry("data/animal.json").unwrap().unwrap()).unwrap();
        let lines: Vec<Value> = data.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0][LEGS], json!(4));
        assert_eq!(lines[1][CLASS_LINK], json!([{"type": "KubunInt", "value": 4}]));
        assert_eq!(lines[1]["coverImages"], json!(["https://img/bass.png"]));

        cmd_inspect(InspectArgs { archive }, OutputFormat::Json).unwrap();
    }

    #[test]
    fn build_reports_bad_record_location() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_zoo(dir.path());
        std::fs::write(
            dir.path().join("animal.ndjson"),
            format!("{}\n{}\n", json!({"title": "A"}), json!({"title": "B", "properties": {LEGS: "many"}})),
        )
        .unwrap();
        let err = cmd_build(
            BuildArgs {
                manifest,
                output: None,
            },
            OutputFormat::Text,
        )
        .unwrap_err();
        assert!(format!("{err}").ends_with("animal.ndjson:2"), "{err:#}");
    }

    #[test]
    fn build_assigns_properties_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_zoo(dir.path());
        // LEGS sorts after CLASS_LINK, so the first failure shows which order was used.
        std::fs::write(
            dir.path().join("animal.ndjson"),
            format!(r#"{{"title": "A", "properties": {{"{LEGS}": "many", "{CLASS_LINK}": "one"}}}}"#),
        )
        .unwrap();
        let err = cmd_build(
            BuildArgs {
                manifest,
                output: None,
            },
            OutputFormat::Text,
        )
        .unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains(LEGS), "{chain}");
        assert!(!chain.contains(CLASS_LINK), "{chain}");
    }

    #[test]
    fn check_reports_unresolved_links() {
        let dir = tempfile::tempdir().unwrap();
        write_zoo(dir.path());
        let err = cmd_check(
            CheckArgs {
                schemata: vec![dir.path().join("schemata/animal.json")],
            },
            OutputFormat::Text,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("animalclass"));

        cmd_check(
            CheckArgs {
                schemata: vec![
                    dir.path().join("schemata/animal.json"),
                    dir.path().join("schemata/animalclass.json"),
                ],
            },
            OutputFormat::Json,
        )
        .unwrap();
    }

    #[test]
    fn collection_names_come_from_file_stems() {
        assert_eq!(
            collection_name(Path::new("schemata/animal.json")).unwrap(),
            "animal"
        );
        assert!(collection_name(Path::new("/")).is_err());
    }
}
