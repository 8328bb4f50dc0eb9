use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "pkgmux",
    about = "Inspect and configure every JavaScript package manager on this machine",
    version
)]
pub struct Cli {
    /// Settings file to use instead of the platform default
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Deadline for the whole command, in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Log debug output to stderr and the log file
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List registered managers and whether each is available
    Managers,

    /// Cache locations, sizes, and clearing
    #[command(subcommand)]
    Cache(CacheCommand),

    /// Project and global packages
    #[command(subcommand)]
    Packages(PackagesCommand),

    /// Registry and proxy settings
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Project discovery and analysis
    #[command(subcommand)]
    Projects(ProjectsCommand),
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Cache of every available manager
    List,
    /// Cache of one manager
    Show { manager: String },
    /// Clear one manager's cache, or every cache when none is named
    Clear { manager: Option<String> },
    /// Combined size of all caches in bytes
    Size,
    Summary,
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum PackagesCommand {
    /// Packages of a project
    List {
        #[arg(long, default_value = ".")]
        path: PathBuf,
        #[arg(long)]
        manager: Option<String>,
    },
    /// Globally installed packages
    Global {
        #[arg(long)]
        manager: Option<String>,
    },
    /// Global packages whose name or description matches
    Search { query: String },
    /// First global package with this exact name
    Info { name: String },
    Stats {
        #[arg(long, default_value = ".", conflicts_with = "global")]
        path: PathBuf,
        #[arg(long)]
        global: bool,
    },
    Install(PackageTarget),
    Uninstall(PackageTarget),
}

#[derive(Args, Debug)]
pub struct PackageTarget {
    pub name: String,
    #[arg(long)]
    pub manager: String,
    #[arg(long)]
    pub global: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Configuration of every available manager
    List,
    Show { manager: String },
    Summary,
    /// Set the registry of one manager, or of all of them
    SetRegistry {
        url: String,
        #[arg(long)]
        manager: Option<String>,
    },
    /// Set the proxy; omit the URL to remove it
    SetProxy {
        #[arg(default_value = "")]
        url: String,
        #[arg(long)]
        manager: Option<String>,
    },
    /// Check a registry URL without changing anything
    TestRegistry {
        url: String,
        #[arg(long)]
        manager: String,
    },
    /// Check a proxy URL without changing anything
    TestProxy {
        url: String,
        #[arg(long)]
        manager: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProjectsCommand {
    /// Find projects below a directory
    Scan { root: Option<String> },
    Analyze { path: PathBuf },
    /// Declared dependencies from the project's package.json
    Deps { path: PathBuf },
    Stats { root: Option<String> },
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{CacheCommand, Cli, Command, ConfigCommand, PackagesCommand};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_are_accepted_after_subcommands() {
        let cli = Cli::try_parse_from([
            "pkgmux", "cache", "clear", "npm", "--timeout", "10", "--debug",
        ])
        .expect("arguments parse");

        assert_eq!(cli.timeout, Some(10));
        assert!(cli.debug);
        assert!(matches!(
            cli.command,
            Command::Cache(CacheCommand::Clear { manager: Some(ref m) }) if m == "npm"
        ));
    }

    #[test]
    fn set_proxy_without_url_removes_it() {
        let cli = Cli::try_parse_from(["pkgmux", "config", "set-proxy"]).expect("arguments parse");

        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::SetProxy { ref url, manager: None }) if url.is_empty()
        ));
    }

    #[test]
    fn install_requires_a_manager() {
        assert!(Cli::try_parse_from(["pkgmux", "packages", "install", "left-pad"]).is_err());

        let cli = Cli::try_parse_from([
            "pkgmux", "packages", "install", "left-pad", "--manager", "pnpm", "--global",
        ])
        .expect("arguments parse");
        assert!(matches!(
            cli.command,
            Command::Packages(PackagesCommand::Install(ref target))
                if target.name == "left-pad" && target.manager == "pnpm" && target.global
        ));
    }
}
