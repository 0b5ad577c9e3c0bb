//! impress-groups CLI
//!
//! Inspect persisted group trees: draw them, validate them, or count how many
//! entries each group holds.

use std::collections::BTreeMap;
use std::fs;
use std::process::ExitCode;

use impress_groups::{
    parse_tree_lines, parse_tree_with, Entry, GroupTree, GroupsConfig, IndexPath,
};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: impress-groups <tree|check> <groups-file>
       impress-groups count <groups-file> <entries.json>

Set IMPRESS_GROUPS_CONFIG to a TOML file to override the defaults.";

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> CliResult<()> {
    let config = load_config()?;
    match args {
        [command, file] if command == "tree" => {
            let tree = load_tree(file, &config)?;
            print!("{}", tree.format_tree());
        }
        [command, file] if command == "check" => {
            let tree = load_tree(file, &config)?;
            println!("{}: {} groups, ok", file, tree.len() - 1);
        }
        [command, file, entries_file] if command == "count" => {
            let tree = load_tree(file, &config)?;
            let entries: Vec<Entry> = serde_json::from_str(&fs::read_to_string(entries_file)?)?;
            print_counts(&tree, &entries);
        }
        _ => return Err(USAGE.into()),
    }
    Ok(())
}

fn load_config() -> CliResult<GroupsConfig> {
    match std::env::var("IMPRESS_GROUPS_CONFIG") {
        Ok(path) => Ok(GroupsConfig::load(path)?),
        Err(_) => Ok(GroupsConfig::default()),
    }
}

/// Accepts both the nested format and the `<level> <group>` line format.
fn load_tree(file: &str, config: &GroupsConfig) -> CliResult<GroupTree> {
    let text = fs::read_to_string(file)?;
    let tree = if text.trim_start().starts_with(|c: char| c.is_ascii_digit()) {
        parse_tree_lines(&text, config)?
    } else {
        parse_tree_with(&text, config)?
    };
    tracing::debug!("Loaded {} groups from {}", tree.len(), file);
    Ok(tree)
}

fn print_counts(tree: &GroupTree, entries: &[Entry]) {
    let mut counts: BTreeMap<IndexPath, usize> = BTreeMap::new();
    for entry in entries {
        for path in tree.groups_containing(entry) {
            *counts.entry(path).or_default() += 1;
        }
    }
    for (path, node) in tree.root().walk() {
        let count = counts.get(&path).copied().unwrap_or(0);
        println!(
            "{}{} ({})",
            "  ".repeat(path.depth()),
            node.group().name(),
            count
        );
    }
}
