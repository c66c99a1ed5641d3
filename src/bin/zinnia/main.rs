#![deny(unsafe_code)]

mod cli;

use clap::Parser as _;

use zinnia::{CssParser, CssomBuilder};

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();

    if let Some(path) = args.css {
        let mut parser = CssParser::new(CssomBuilder::new());
        println!("{:#?}", parser.parse_file(path)?);
    }

    if let Some(style) = args.inline {
        let mut parser = CssParser::new(CssomBuilder::new());
        println!("{:#?}", parser.parse_inline(&style)?);
    }

    Ok(())
}
