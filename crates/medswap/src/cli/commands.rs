//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::form::{fields, FormData};
use crate::record::Role;

/// Register command arguments.
///
/// Every value is taken as typed and coerced the same way a submitted form
/// is, so `--quantity abc` stores 0 instead of failing.
#[derive(Debug, Default, Args)]
pub struct RegisterCommand {
    /// Register as donor or recipient (recipient when omitted)
    #[arg(short, long, value_enum)]
    pub role: Option<RoleArg>,

    /// Full name
    #[arg(short, long, default_value = "")]
    pub name: String,

    /// Phone number or email
    #[arg(long, default_value = "")]
    pub contact: String,

    /// Medicine name
    #[arg(short, long, default_value = "")]
    pub medicine: String,

    /// Number of units offered or needed
    #[arg(long)]
    pub quantity: Option<String>,

    /// Expiry date, YYYY-MM-DD (donors)
    #[arg(long)]
    pub expiry: Option<String>,

    /// Urgency from 1 to 5 (recipients)
    #[arg(long)]
    pub urgency: Option<String>,

    /// Latitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub latitude: Option<String>,

    /// Longitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub longitude: Option<String>,

    /// Additional field stored verbatim (repeatable)
    #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,

    /// Print the stored record as JSON
    #[arg(short, long)]
    pub json: bool,
}

impl RegisterCommand {
    /// Build the field list a form submission would produce.
    #[must_use]
    pub fn to_form(&self) -> FormData {
        let mut form = FormData::new();
        if let Some(role) = self.role {
            form.push(fields::ROLE, Role::from(role).to_string());
        }
        form.push(fields::NAME, self.name.as_str());
        form.push(fields::CONTACT, self.contact.as_str());
        form.push(fields::MEDICINE, self.medicine.as_str());

        let optional = [
            (fields::QUANTITY, &self.quantity),
            (fields::EXPIRY, &self.expiry),
            (fields::URGENCY, &self.urgency),
            (fields::LATITUDE, &self.latitude),
            (fields::LONGITUDE, &self.longitude),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                form.push(name, value.as_str());
            }
        }

        for (key, value) in &self.fields {
            form.push(key.as_str(), value.as_str());
        }
        form
    }
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err("field name must not be empty".to_string());
    }
    Ok((key.to_string(), value.to_string()))
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Only show one role
    #[arg(short, long, value_enum)]
    pub role: Option<RoleArg>,

    /// Only show rows containing this text
    #[arg(short, long)]
    pub search: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Render command arguments.
#[derive(Debug, Args)]
pub struct RenderCommand {
    /// Tab to open (donors or recipients)
    #[arg(short, long)]
    pub tab: Option<String>,

    /// Filter the rows of the open tab
    #[arg(short, long)]
    pub search: Option<String>,

    /// Write the page to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Suggest command arguments.
#[derive(Debug, Args)]
pub struct SuggestCommand {
    /// Text typed into the medicine field
    pub query: String,

    /// Complete names starting with the query instead of containing it
    #[arg(short, long)]
    pub prefix: bool,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Stats command arguments.
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Role argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    /// Offers medicine
    Donor,
    /// Needs medicine
    Recipient,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Donor => Self::Donor,
            RoleArg::Recipient => Self::Recipient,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}
