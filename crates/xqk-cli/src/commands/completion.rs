use std::io::Write;

use anyhow::Context;
use clap::CommandFactory;
use clap_complete::Shell;

use crate::cli::Cli;

const BIN_NAME: &str = "xfs-quota-kit";

/// Handle `xfs-quota-kit completion <shell>`.
pub fn handle(shell: Shell) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    write_script(shell, &mut stdout);
    stdout.flush().context("failed to write completion script")
}

fn write_script(shell: Shell, out: &mut dyn Write) {
    clap_complete::generate(shell, &mut Cli::command(), BIN_NAME, out);
}
