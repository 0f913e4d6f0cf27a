use anyhow::Result;

fn main() -> Result<()> {
    execbox::cli::run()
}
