//! trl: fine-tune and chat with transformer models from the command line

use anyhow::Result;

fn main() -> Result<()> {
    trl_cli::cli::run()
}
