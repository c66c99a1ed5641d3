use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(long, value_name = "CSS", help = "The CSS file to parse")]
    pub css: Option<String>,

    #[arg(
        long,
        value_name = "STYLE",
        conflicts_with = "css",
        help = "An inline declaration list to parse"
    )]
    pub inline: Option<String>,
}
