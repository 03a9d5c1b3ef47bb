//! CLI parse tests.

use super::{Cli, CliCommand};
use clap::Parser;

pub(crate) fn parse(args: &[&str]) -> CliCommand {
    let cli = Cli::try_parse_from(args).unwrap();
    cli.command
}

mod rest;
