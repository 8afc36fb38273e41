use crate::export::ExportFormat;
use clap::{Parser, Subcommand};

/// Command-line interface definition for shiftclock
/// Shift attendance engine: sessions, role time limits and weekly rollover
#[derive(Parser)]
#[command(
    name = "shiftclock",
    version = env!("CARGO_PKG_VERSION"),
    about = "Shift attendance tracking: clock-in/out, role time limits and weekly export rollover using SQLite",
    long_about = None
)]
pub struct Cli {
    /// Override database path (useful for tests or custom DB)
    #[arg(global = true, long = "db")]
    pub db: Option<String>,

    /// Use this configuration file instead of ~/.shiftclock/shiftclock.conf
    #[arg(global = true, long = "config")]
    pub config: Option<String>,

    /// Run in test mode (no config file update)
    #[arg(global = true, long = "test", hide = true)]
    pub test: bool,

    /// Pretend the current instant is this RFC3339 timestamp
    #[arg(global = true, long = "at", hide = true)]
    pub at: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and configuration
    Init,

    /// Show the active configuration
    Config {
        #[arg(long = "print", help = "Print the current configuration")]
        print_config: bool,
    },

    /// Manage the database (migrations, integrity checks, etc.)
    Db {
        #[arg(long = "migrate", help = "Run pending database migrations")]
        migrate: bool,

        #[arg(long = "check", help = "Check database integrity")]
        check: bool,

        #[arg(long = "info", help = "Show database information")]
        info: bool,
    },

    /// Manage the singleton clock channel configuration
    Channels {
        #[arg(
            long = "set",
            num_args = 1..,
            value_name = "KEY=VALUE",
            help = "Store the channel ids (category, clock_in_channel, clock_in_interface, clock_out_channel, clock_out_interface, admin_channel, clock_in_role)"
        )]
        set: Vec<String>,

        #[arg(long = "print", help = "Print the stored channel ids")]
        print: bool,

        #[arg(long = "clear", help = "Remove the stored channel ids")]
        clear: bool,
    },

    /// Open a session for a member
    ClockIn {
        /// Member id
        member: String,
    },

    /// Close the member's open session and credit the elapsed time
    ClockOut {
        /// Member id
        member: String,
    },

    /// Show a member's accrued hours for the current cycle
    Hours {
        /// Member id
        member: String,
    },

    /// List every record with its session state
    Status,

    /// Run one expiration sweep now
    Sweep,

    /// Export the accrued totals
    Export {
        #[arg(long, value_enum, default_value = "csv")]
        format: ExportFormat,

        #[arg(
            long,
            value_name = "FILE",
            help = "Output file (default: clock_records_<date>.csv in the export directory)"
        )]
        file: Option<String>,

        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Inspect or trigger the weekly rollover
    Rollover {
        #[arg(long = "next", help = "Show the next scheduled rollover")]
        next: bool,

        #[arg(long = "now", help = "Export and reset immediately")]
        now: bool,
    },

    /// Print or manage the internal log table
    Log {
        #[arg(long = "print", help = "Print rows from the internal log table")]
        print: bool,
    },

    /// Run the expiration monitor and the rollover scheduler until Ctrl-C
    Serve,
}
