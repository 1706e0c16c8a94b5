//! Clap derive structures for the `sitefinder` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// sitefinder -- nearby sites, walking routes, and synced favorites
#[derive(Debug, Parser)]
#[command(
    name = "sitefinder",
    version,
    about = "Find nearby sites and walk to them from the command line",
    long_about = "Searches a site catalog around a position, asks a directions service\n\
        for walking routes, and keeps favorites in sync with a remote backend.\n\n\
        `sitefinder track` drives the full map engine headless: positions in on\n\
        stdin, renderer messages out as JSON lines on stdout.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "SITEFINDER_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Favorites API base URL (overrides profile)
    #[arg(long, env = "SITEFINDER_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Favorites API bearer token
    #[arg(long, env = "SITEFINDER_API_TOKEN", global = true, hide_env = true)]
    pub api_token: Option<String>,

    /// Directions service base URL (overrides profile)
    #[arg(long, env = "SITEFINDER_DIRECTIONS_URL", global = true)]
    pub directions_url: Option<String>,

    /// Directions service access token
    #[arg(long, env = "SITEFINDER_DIRECTIONS_TOKEN", global = true, hide_env = true)]
    pub directions_token: Option<String>,

    /// Site catalog JSON file (overrides profile)
    #[arg(long, env = "SITEFINDER_CATALOG", global = true)]
    pub catalog: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SITEFINDER_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "SITEFINDER_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List catalog sites within the search radius of a position
    #[command(alias = "n")]
    Nearby(NearbyArgs),

    /// Show the selectable search radii
    Radius,

    /// Compute a walking route to a catalog site
    #[command(alias = "r")]
    Route(RouteArgs),

    /// List and change synced favorites
    #[command(alias = "fav")]
    Favorites(FavoritesArgs),

    /// Print the canonical identity key of a site
    Key(KeyArgs),

    /// Drive the map engine from positions on stdin
    Track(TrackArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Arguments ─────────────────────────────────────────────────

/// A position given as latitude and longitude in degrees.
#[derive(Debug, Clone, Args)]
pub struct PositionArgs {
    /// Latitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lng: f64,
}

// ── Nearby ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct NearbyArgs {
    #[command(flatten)]
    pub position: PositionArgs,

    /// Index into the radius options (see `sitefinder radius`)
    #[arg(long, short = 'r')]
    pub radius_index: Option<usize>,
}

// ── Route ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RouteArgs {
    /// Destination site, by name or identity key
    pub site: String,

    #[command(flatten)]
    pub from: PositionArgs,
}

// ── Favorites ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct FavoritesArgs {
    #[command(subcommand)]
    pub command: FavoritesCommand,
}

#[derive(Debug, Subcommand)]
pub enum FavoritesCommand {
    /// List favorites stored on the backend
    #[command(alias = "ls")]
    List,

    /// Mark a catalog site as favorite
    Add {
        /// Site name or identity key
        site: String,
    },

    /// Remove a site from favorites
    #[command(alias = "rm")]
    Remove {
        /// Site name or identity key
        site: String,
    },

    /// Flip a site's favorite state
    Toggle {
        /// Site name or identity key
        site: String,
    },
}

// ── Key ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct KeyArgs {
    /// Site name
    #[arg(long)]
    pub name: String,

    #[command(flatten)]
    pub position: PositionArgs,
}

// ── Track ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TrackArgs {
    /// File or FIFO carrying renderer messages, one JSON object per line
    #[arg(long, short = 'i')]
    pub inbound: Option<PathBuf>,

    /// Fetch favorites from the backend before reading input
    #[arg(long)]
    pub sync: bool,

    /// On exit, print the map state the emitted messages leave behind
    #[arg(long)]
    pub print_state: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration
    Show,

    /// Print the config file location
    Path,

    /// Set a value on the active profile
    Set {
        /// Profile key (e.g. "api_url", "catalog", "radius_index")
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a token in the system keyring
    SetToken {
        /// Which token to store
        kind: TokenKindArg,

        /// Token value (prompted when omitted)
        #[arg(long)]
        token: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TokenKindArg {
    /// Favorites API bearer token
    Api,
    /// Directions service access token
    Directions,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
