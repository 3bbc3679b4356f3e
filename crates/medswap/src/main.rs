//! `medswap` - CLI for the medicine donor/recipient registry
//!
//! This binary registers donors and recipients in the local store and
//! renders, filters and summarizes what has been registered.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::debug;

use medswap::cli::{
    Cli, Command, ConfigCommand, ListCommand, OutputFormat, RegisterCommand, RenderCommand,
    SuggestCommand,
};
use medswap::{
    form, init_logging, render, Config, Record, RecordStore, Role, SqliteBackend, UsersPage,
};

type Store = RecordStore<SqliteBackend>;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Execute the command. Config commands never open the store, so a broken
    // configuration can still be inspected.
    let config_path = cli.config;
    match cli.command {
        Command::Config(cmd) => handle_config(config_path, cmd),
        Command::Register(cmd) => {
            let (_, store) = setup(config_path)?;
            handle_register(&store, &cmd)
        }
        Command::List(cmd) => {
            let (config, store) = setup(config_path)?;
            handle_list(&config, &store, &cmd)
        }
        Command::Render(cmd) => {
            let (config, store) = setup(config_path)?;
            handle_render(&config, &store, &cmd)
        }
        Command::Suggest(cmd) => {
            let (config, store) = setup(config_path)?;
            handle_suggest(&config, &store, &cmd)
        }
        Command::Stats(cmd) => {
            let (_, store) = setup(config_path)?;
            handle_stats(&store, cmd.json)
        }
    }
}

fn setup(config_path: Option<PathBuf>) -> Result<(Config, Store)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    let store = open_store(&config)?;
    Ok((config, store))
}

fn open_store(config: &Config) -> Result<Store> {
    let path = config.database_path();
    debug!(path = %path.display(), "Opening store");
    let backend = SqliteBackend::open(&path)
        .with_context(|| format!("failed to open store at {}", path.display()))?;
    Ok(RecordStore::new(backend, config.storage.slot_key.as_str())
        .with_max_attempts(config.storage.max_append_retries))
}

fn handle_register(store: &Store, cmd: &RegisterCommand) -> Result<()> {
    let submission = form::submit(store, &cmd.to_form()).context("registration failed")?;
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&submission.record)?);
    } else {
        println!("{}", submission.message);
    }
    Ok(())
}

fn handle_list(config: &Config, store: &Store, cmd: &ListCommand) -> Result<()> {
    let mut records = store.load()?;
    if let Some(role) = cmd.role {
        let role = Role::from(role);
        records.retain(|r: &Record| r.role == role);
    }

    let mut page = UsersPage::new(&records, config.render.coordinate_precision);
    if let Some(query) = &cmd.search {
        page.search_medicines(query);
    }

    let out = match cmd.format {
        OutputFormat::Plain => render::plain(&page),
        OutputFormat::Table => render::table(&page),
        OutputFormat::Json => render::json(&records, &page)?,
    };
    print!("{out}");
    if cmd.format == OutputFormat::Json {
        println!();
    }
    Ok(())
}

fn handle_render(config: &Config, store: &Store, cmd: &RenderCommand) -> Result<()> {
    let records = store.load()?;
    let mut page = UsersPage::new(&records, config.render.coordinate_precision);

    let tab = cmd.tab.as_deref().unwrap_or(&config.render.default_tab);
    if !page.activate(tab) {
        bail!("unknown tab: {tab}");
    }
    if let Some(query) = &cmd.search {
        page.search_users(query);
    }

    let html = render::html(&page)?;
    match &cmd.output {
        Some(path) => {
            std::fs::write(path, html)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => println!("{html}"),
    }
    Ok(())
}

fn handle_suggest(config: &Config, store: &Store, cmd: &SuggestCommand) -> Result<()> {
    let mut catalog = config.catalog();
    if config.catalog.include_stored {
        catalog.learn_from(&store.load()?);
    }

    let names = if cmd.prefix {
        catalog.complete_prefix(&cmd.query)
    } else {
        catalog.suggest(&cmd.query)
    };

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&names)?);
    } else {
        for name in names {
            println!("{name}");
        }
    }
    Ok(())
}

fn handle_stats(store: &Store, json: bool) -> Result<()> {
    let stats = store.stats()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("medswap stats");
        println!("-------------");
        println!("Total users:         {}", stats.total);
        println!("Donors:              {}", stats.donors);
        println!("Recipients:          {}", stats.recipients);
        println!("Pending donors:      {}", stats.pending_donors);
        println!("Pending recipients:  {}", stats.pending_recipients);
        println!("Units offered:       {}", stats.units_offered);
        println!("Units requested:     {}", stats.units_requested);
    }
    Ok(())
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path).context("failed to load configuration")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Slot key:           {}", config.storage.slot_key);
                println!("  Append retries:     {}", config.storage.max_append_retries);
                println!();
                println!("[Catalog]");
                println!("  Max suggestions:    {}", config.catalog.max_suggestions);
                println!(
                    "  Extra medicines:    {}",
                    config.catalog.extra_medicines.len()
                );
                println!("  Include stored:     {}", config.catalog.include_stored);
                println!();
                println!("[Render]");
                println!(
                    "  Coordinate digits:  {}",
                    config.render.coordinate_precision
                );
                println!("  Default tab:        {}", config.render.default_tab);
            }
        }
        ConfigCommand::Path => {
            let path = config_path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
