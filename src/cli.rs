/// CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

// Build timestamp injected at compile time
pub const BUILD_TIMESTAMP: &str = env!("BUILD_TIMESTAMP");
pub const VERSION_WITH_BUILD: &str = concat!(env!("CARGO_PKG_VERSION"), " (built: ", env!("BUILD_TIMESTAMP"), ")");

#[derive(Parser)]
#[command(name = "vps-panel")]
#[command(author, version = VERSION_WITH_BUILD, about = "Single-host Docker, disk, port and PostgreSQL panel", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show disk usage and all containers
    Status,

    /// Show disk usage of the configured filesystem
    Disk,

    /// Show host LISTEN sockets and published container ports
    Ports,

    /// List PostgreSQL databases
    Databases,

    /// Show images, uptime and creation times
    Images {
        /// Only list dangling images
        #[arg(short, long)]
        dangling: bool,
    },

    /// Stop one or more containers
    Stop {
        /// Container names
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Remove one or more containers
    Rm {
        /// Remove running containers too
        #[arg(short, long)]
        force: bool,

        /// Container names
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Remove an image by id
    Rmi {
        /// Image id (full or short)
        id: String,
    },

    /// Compose descriptor management
    Compose {
        #[command(subcommand)]
        command: ComposeCommands,
    },

    /// Print the operator documentation
    Docs,

    /// Run HTTP API server mode
    #[cfg(feature = "server")]
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Enable CORS for cross-origin requests
        #[arg(long)]
        cors: bool,
    },
}

#[derive(Subcommand)]
pub enum ComposeCommands {
    /// List applications
    List,

    /// Print an application's descriptor
    Show { app: String },

    /// Overwrite an application's descriptor and bring it up
    Apply {
        app: String,

        /// File with the new descriptor (stdin when omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Create a new application directory and bring it up
    Create {
        app: String,

        /// File with the descriptor (stdin when omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
