use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

/// Axon Bedrock adapter
#[derive(Debug, Parser)]
#[command(name = "axon", about = "Invoke AWS Bedrock models through one canonical interface")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "axon.toml", env = "AXON_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the request body that would be sent, without calling Bedrock
    Render {
        #[command(flatten)]
        input: InputArgs,

        /// Render the streaming variant of the request
        #[arg(long)]
        stream: bool,
    },
    /// Invoke the model and print the complete response
    Invoke {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Stream the model response to stdout
    Stream {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Decode a recorded stream, one JSON event payload per line
    Decode {
        /// File of recorded event payloads
        events: PathBuf,

        /// Decode as messages protocol events
        #[arg(long)]
        messages: bool,

        /// Keep structured content blocks instead of plain text
        #[arg(long)]
        structured: bool,
    },
}

/// Generation input shared by the calling subcommands
#[derive(Debug, ClapArgs)]
pub struct InputArgs {
    /// Text prompt
    #[arg(short, long, conflicts_with = "messages", required_unless_present = "messages")]
    pub prompt: Option<String>,

    /// JSON file holding a list of chat messages
    #[arg(short, long)]
    pub messages: Option<PathBuf>,

    /// System prompt
    #[arg(short, long)]
    pub system: Option<String>,

    /// Stop sequence; may be repeated
    #[arg(long = "stop")]
    pub stop: Vec<String>,

    /// Extra request fields as a JSON object
    #[arg(long)]
    pub kwargs: Option<String>,
}
