use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::ValueParser};
use color_eyre::{Result, eyre::eyre};

use crate::{browser::FieldFilter, utils::TagExpr};

/// A keyboard-driven terminal dashboard for browsing cloud resources
///
/// Runs the interactive browser when no command is given:
/// - `/` filters the list, `:` types a command (like `:sort desc age` or `:vpc`)
/// - `enter` opens the detail of a resource, `space` marks it and `ctrl-d` compares it with another one
/// - any other letter triggers the actions of the selected resource, listed on the bottom line
#[derive(Parser)]
#[cfg_attr(debug_assertions, derive(Debug))]
#[command(author, version, verbatim_doc_comment, infer_subcommands = true)]
pub struct Cli {
    /// Path of the config file to use, instead of the one on the platform config directory
    #[arg(short = 'c', long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Start on read-only mode, blocking any action that could modify a resource
    #[arg(long, global = true)]
    pub read_only: bool,

    /// Profile to browse
    ///
    /// This argument can be specified multiple times to merge the resources of several profiles
    #[arg(short = 'p', long = "profile", global = true, value_name = "PROFILE")]
    pub profiles: Vec<String>,

    /// Region to browse
    #[arg(short = 'r', long, global = true)]
    pub region: Option<String>,

    /// Command to be executed
    #[command(subcommand)]
    pub process: Option<CliProcess>,
}

#[derive(Subcommand)]
#[cfg_attr(debug_assertions, derive(Debug))]
pub enum CliProcess {
    /// Browses resources on the full-screen interface (default)
    Browse(BrowseProcess),

    /// Prints the resources of a kind as a table
    #[command(alias = "ls")]
    List(ListProcess),

    /// Lists the registered resource kinds along with their aliases
    Kinds(KindsProcess),
}

/// Browses resources on the full-screen interface
#[derive(Args, Debug, Default)]
pub struct BrowseProcess {
    /// Resource kind to open, like `ec2/instances` or any of its aliases (defaults to the first registered kind)
    pub resource: Option<String>,

    /// Only show resources whose field equals the value, like `VpcId=vpc-0abc`
    #[arg(short = 'f', long, value_name = "FIELD=VALUE", value_parser = ValueParser::new(parse_field_filter))]
    pub filter: Option<FieldFilter>,
}

/// Prints the resources of a kind as a table
#[derive(Args, Debug)]
pub struct ListProcess {
    /// Resource kind to list, like `ec2/instances` or any of its aliases
    pub resource: String,

    /// Only show resources whose identifier, name or columns fuzzy-match the text
    #[arg(short = 'q', long)]
    pub query: Option<String>,

    /// Only show resources whose field equals the value, like `VpcId=vpc-0abc`
    #[arg(short = 'f', long, value_name = "FIELD=VALUE", value_parser = ValueParser::new(parse_field_filter))]
    pub filter: Option<FieldFilter>,

    /// Only show resources with a matching tag, like `env`, `env=prod` or `team~core`
    #[arg(short = 't', long, value_name = "EXPR", value_parser = ValueParser::new(parse_tag_expr))]
    pub tag: Option<TagExpr>,

    /// Sort by a column, identified by (part of) its name
    #[arg(short = 's', long, value_name = "COLUMN")]
    pub sort: Option<String>,

    /// Sort in descending order
    #[arg(long, requires = "sort")]
    pub desc: bool,

    /// Fetch every page, instead of just the first one
    #[arg(short = 'a', long)]
    pub all: bool,
}

/// Lists the registered resource kinds along with their aliases
#[derive(Args, Debug)]
pub struct KindsProcess {}

impl Cli {
    /// Parses the command line, defaulting to the interactive browser
    pub fn parse_process() -> (Self, CliProcess) {
        let mut cli = Self::parse();
        let process = cli
            .process
            .take()
            .unwrap_or_else(|| CliProcess::Browse(BrowseProcess::default()));
        (cli, process)
    }
}

fn parse_field_filter(raw: &str) -> Result<FieldFilter> {
    match raw.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => Ok(FieldFilter::new(field.trim(), value.trim())),
        _ => Err(eyre!("expected FIELD=VALUE")),
    }
}

fn parse_tag_expr(raw: &str) -> Result<TagExpr> {
    TagExpr::parse(raw).ok_or_else(|| eyre!("expected a tag key, optionally followed by =VALUE or ~VALUE"))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_cli_asserts() {
        Cli::command().debug_assert()
    }

    #[test]
    fn test_parse_field_filter() {
        assert_eq!(
            parse_field_filter("VpcId = vpc-1").unwrap(),
            FieldFilter::new("VpcId", "vpc-1")
        );
        assert_eq!(parse_field_filter("Name=").unwrap(), FieldFilter::new("Name", ""));
        assert!(parse_field_filter("VpcId").is_err());
        assert!(parse_field_filter("=vpc-1").is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["cloudscope", "list", "vm", "-p", "dev", "-p", "prod", "--read-only"]).unwrap();
        assert_eq!(cli.profiles, vec![String::from("dev"), String::from("prod")]);
        assert!(cli.read_only);
        assert!(matches!(cli.process, Some(CliProcess::List(ListProcess { ref resource, .. })) if resource == "vm"));
    }

    #[test]
    fn test_desc_requires_sort() {
        assert!(Cli::try_parse_from(["cloudscope", "list", "vm", "--desc"]).is_err());
    }
}
