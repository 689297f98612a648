use clap::Args;
use clap_complete::Shell;

#[derive(Args, Debug, PartialEq, Eq)]
pub struct CompletionsArgs {
    /// bash, zsh, fish, elvish or powershell.
    pub shell: Shell,
}

/// Print a completion script for `dk` on stdout.
pub fn run_completions(shell: Shell, command: &mut clap::Command) -> anyhow::Result<()> {
    clap_complete::generate(shell, command, "dk", &mut std::io::stdout());
    Ok(())
}
