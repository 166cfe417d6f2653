//! `inspecta standards` - edit the acceptance standards file.

use std::path::Path;

use clap::Subcommand;

use inspecta_compare::numeric::format_number;
use inspecta_config::{
    AcceptanceStandard, ConfigError, SharedStandardStore, StandardStore, DEFAULT_STANDARD,
};

use crate::exit_codes::EXIT_ERROR;
use crate::CliError;

#[derive(Subcommand)]
pub enum StandardsCommands {
    /// List standards and scope bindings
    List {
        /// Output JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show one standard in full
    Show {
        name: String,

        /// Output JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Create a standard or change its defaults and allowances
    #[command(after_help = "\
Examples:
  inspecta standards set strict --abs 0.01
  inspecta standards set line-3 --abs 0.1 --ratio 0.02 --allow-ok-ng 1
  inspecta standards set default --allow-extent 2")]
    Set {
        name: String,

        /// Default absolute tolerance
        #[arg(long)]
        abs: Option<f64>,

        /// Default proportional tolerance (fraction of the reference value)
        #[arg(long)]
        ratio: Option<f64>,

        /// Allowed OK/NG mismatches
        #[arg(long)]
        allow_ok_ng: Option<u32>,

        /// Allowed defect-type mismatches
        #[arg(long)]
        allow_defect: Option<u32>,

        /// Allowed extent mismatches
        #[arg(long)]
        allow_extent: Option<u32>,
    },

    /// Set a per-item tolerance override
    #[command(after_help = "\
Examples:
  inspecta standards override strict temp --abs 0.5
  inspecta standards override strict width --ratio 0.05")]
    Override {
        name: String,
        item: String,

        #[arg(long, default_value_t = 0.0)]
        abs: f64,

        #[arg(long, default_value_t = 0.0)]
        ratio: f64,
    },

    /// Remove a per-item tolerance override
    Unoverride { name: String, item: String },

    /// Rename a standard; bound scopes follow it
    Rename { old: String, new: String },

    /// Delete a standard; bound scopes fall back to `default`
    Delete { name: String },

    /// Make a standard the active one for a scope
    Bind { scope: String, name: String },

    /// Remove a scope binding (the scope falls back to `default`)
    Unbind { scope: String },
}

pub fn cmd_standards(path: &Path, cmd: StandardsCommands) -> Result<(), CliError> {
    let shared = SharedStandardStore::new(StandardStore::load(path)?);

    match cmd {
        StandardsCommands::List { json } => return print_list(&shared.store(), json),
        StandardsCommands::Show { name, json } => return print_show(&shared.store(), &name, json),
        StandardsCommands::Set {
            name,
            abs,
            ratio,
            allow_ok_ng,
            allow_defect,
            allow_extent,
        } => shared.update(|store| {
            let mut standard = store
                .get(&name)
                .cloned()
                .unwrap_or_else(|| AcceptanceStandard::new(name.trim()));
            if let Some(v) = abs {
                standard.default_abs_tolerance = v;
            }
            if let Some(v) = ratio {
                standard.default_ratio_tolerance = v;
            }
            if let Some(v) = allow_ok_ng {
                standard.allowed_ok_ng_mismatch = v;
            }
            if let Some(v) = allow_defect {
                standard.allowed_defect_mismatch = v;
            }
            if let Some(v) = allow_extent {
                standard.allowed_extent_mismatch = v;
            }
            store.upsert(standard)
        })?,
        StandardsCommands::Override { name, item, abs, ratio } => shared.update(|store| {
            let mut standard = existing(store, &name)?;
            if item.trim().is_empty() {
                return Err(ConfigError::InvalidStandardMutation("item name must not be blank".into()));
            }
            standard.set_override(&item, abs, ratio);
            store.upsert(standard)
        })?,
        StandardsCommands::Unoverride { name, item } => shared.update(|store| {
            let mut standard = existing(store, &name)?;
            if !standard.remove_override(&item) {
                return Err(ConfigError::InvalidStandardMutation(format!(
                    "standard '{}' has no override for '{item}'",
                    standard.name
                )));
            }
            store.upsert(standard)
        })?,
        StandardsCommands::Rename { old, new } => shared.update(|store| store.rename(&old, &new))?,
        StandardsCommands::Delete { name } => shared.update(|store| store.delete(&name).map(|_| ()))?,
        StandardsCommands::Bind { scope, name } => shared.update(|store| store.bind(&scope, &name))?,
        StandardsCommands::Unbind { scope } => {
            let removed = shared.update(|store| Ok(store.unbind(&scope)))?;
            if !removed {
                return Err(CliError::new(EXIT_ERROR, format!("scope '{scope}' is not bound")));
            }
        }
    }

    shared.store().save(path)?;
    eprintln!("saved {}", path.display());
    Ok(())
}

fn existing(store: &StandardStore, name: &str) -> Result<AcceptanceStandard, ConfigError> {
    store
        .get(name)
        .cloned()
        .ok_or_else(|| ConfigError::UnknownStandard(name.to_string()))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))
}

fn print_list(store: &StandardStore, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", to_json(store)?);
        return Ok(());
    }

    for standard in store.list_standards() {
        let scopes: Vec<&str> = store
            .bindings()
            .iter()
            .filter(|(_, bound)| bound.eq_ignore_ascii_case(&standard.name))
            .map(|(scope, _)| scope.as_str())
            .collect();
        let marker = if standard.is_default() { " (default)" } else { "" };
        if scopes.is_empty() {
            println!("{}{marker}", standard.name);
        } else {
            println!("{}{marker}  <- {}", standard.name, scopes.join(", "));
        }
    }
    if !store.ignored_items.is_empty() {
        println!();
        println!("ignored items: {}", store.ignored_items.join(", "));
    }
    Ok(())
}

fn print_show(store: &StandardStore, name: &str, json: bool) -> Result<(), CliError> {
    let standard = existing(store, name)?;
    if json {
        println!("{}", to_json(&standard)?);
        return Ok(());
    }

    println!("name:       {}", standard.name);
    println!(
        "tolerance:  abs {}, ratio {}",
        format_number(standard.default_abs_tolerance),
        format_number(standard.default_ratio_tolerance)
    );
    println!(
        "allowances: OK/NG {}, defect {}, extent {}",
        standard.allowed_ok_ng_mismatch, standard.allowed_defect_mismatch, standard.allowed_extent_mismatch
    );
    if standard.overrides().is_empty() {
        println!("overrides:  (none)");
    } else {
        println!("overrides:");
        for o in standard.overrides() {
            println!(
                "  {}: abs {}, ratio {}",
                o.item,
                format_number(o.abs_tolerance),
                format_number(o.ratio_tolerance)
            );
        }
    }
    let scopes: Vec<&str> = store
        .bindings()
        .iter()
        .filter(|(_, bound)| bound.eq_ignore_ascii_case(&standard.name))
        .map(|(scope, _)| scope.as_str())
        .collect();
    if !scopes.is_empty() {
        println!("bound to:   {}", scopes.join(", "));
    } else if standard.name == DEFAULT_STANDARD {
        println!("bound to:   (every unbound scope)");
    }
    Ok(())
}
