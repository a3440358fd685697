use robocorp_vault::cli;

fn main() -> anyhow::Result<()> {
    cli::run_cli()
}
